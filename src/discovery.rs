//! End-to-end discovery: list, filter, normalize.

use std::fmt;
use std::str::FromStr;

use crate::adapters::ForgePort;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::filter::FilterPolicy;
use crate::normalize::Normalizer;
use crate::types::{RawRepo, Repo};

/// What to enumerate: an organization or a user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Org(String),
    User(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Org(name) => write!(f, "org:{}", name),
            Target::User(name) => write!(f, "user:{}", name),
        }
    }
}

impl FromStr for Target {
    type Err = DiscoveryError;

    /// Parses `org:<name>` or `user:<name>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .map(|(kind, name)| (kind.trim().to_lowercase(), name.trim()))
            .ok_or_else(|| {
                DiscoveryError::Config(format!("target '{}' must be org:<name> or user:<name>", s))
            })?;
        if name.is_empty() {
            return Err(DiscoveryError::Config(format!("target '{}' has no name", s)));
        }

        match kind.as_str() {
            "org" => Ok(Target::Org(name.to_string())),
            "user" => Ok(Target::User(name.to_string())),
            other => Err(DiscoveryError::Config(format!(
                "unknown target kind '{}', expected org or user",
                other
            ))),
        }
    }
}

/// Runs one forge client through a filter policy and a normalizer
pub struct Discovery<'a> {
    client: &'a dyn ForgePort,
    filter: FilterPolicy,
    normalizer: Normalizer,
}

impl<'a> Discovery<'a> {
    pub fn new(client: &'a dyn ForgePort, filter: FilterPolicy, normalizer: Normalizer) -> Self {
        Self {
            client,
            filter,
            normalizer,
        }
    }

    /// Clone targets for every kept repository of `org`
    pub async fn org_targets(&self, org: &str) -> DiscoveryResult<Vec<Repo>> {
        let raws = self.client.get_org_repos(org).await?;
        self.finish(&Target::Org(org.to_string()), &raws)
    }

    /// Clone targets for every kept repository of `user`
    pub async fn user_targets(&self, user: &str) -> DiscoveryResult<Vec<Repo>> {
        let raws = self.client.get_user_repos(user).await?;
        self.finish(&Target::User(user.to_string()), &raws)
    }

    pub async fn run(&self, target: &Target) -> DiscoveryResult<Vec<Repo>> {
        match target {
            Target::Org(org) => self.org_targets(org).await,
            Target::User(user) => self.user_targets(user).await,
        }
    }

    fn finish(&self, target: &Target, raws: &[RawRepo]) -> DiscoveryResult<Vec<Repo>> {
        let kept = self.filter.apply(raws);
        let kept_count = kept.len();
        let repos = self.normalizer.normalize_all(kept)?;

        tracing::debug!(
            provider = self.client.kind(),
            %target,
            fetched = raws.len(),
            kept = kept_count,
            targets = repos.len(),
            "discovery finished"
        );
        Ok(repos)
    }
}
