//! Forgescan - multi-forge repository discovery
//!
//! Forgescan enumerates the repositories of an organization or user on
//! GitHub, GitLab, Gitea or Bitbucket, filters them, and turns each into a
//! clone target (URL, credential-bearing clone URL, branch).

pub mod adapters;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod progress;
pub mod registry;
pub mod types;

// Re-exports for convenience
pub use adapters::{ClientConfig, ForgePort, FromClientConfig};
pub use config::DiscoveryConfig;
pub use discovery::{Discovery, Target};
pub use error::{DiscoveryError, DiscoveryResult, UpstreamError};
pub use filter::FilterPolicy;
pub use normalize::Normalizer;
pub use progress::{ProgressReporter, TracingProgress};
pub use registry::{ClientConstructor, ClientRegistry};
pub use types::*;
