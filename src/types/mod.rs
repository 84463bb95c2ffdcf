//! Core types for forgescan

pub mod repo;

use serde::{Deserialize, Serialize};

pub use repo::{RawRepo, Repo};

/// Transport used to clone a discovered repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneProtocol {
    /// HTTPS with the access token embedded in the clone URL
    Https,
    /// SSH with external key-based auth
    #[default]
    Ssh,
}

impl std::fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneProtocol::Https => write!(f, "https"),
            CloneProtocol::Ssh => write!(f, "ssh"),
        }
    }
}

impl std::str::FromStr for CloneProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "https" => Ok(CloneProtocol::Https),
            "ssh" => Ok(CloneProtocol::Ssh),
            _ => Err(format!("Unknown clone protocol: {}", s)),
        }
    }
}

/// Whether a repository is owned by a user account or an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerType {
    User,
    Organization,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_protocol_parse() {
        assert_eq!("https".parse::<CloneProtocol>().unwrap(), CloneProtocol::Https);
        assert_eq!(" SSH ".parse::<CloneProtocol>().unwrap(), CloneProtocol::Ssh);
        assert!("git".parse::<CloneProtocol>().is_err());
    }

    #[test]
    fn test_clone_protocol_default_is_ssh() {
        assert_eq!(CloneProtocol::default(), CloneProtocol::Ssh);
        assert_eq!(CloneProtocol::Https.to_string(), "https");
    }
}
