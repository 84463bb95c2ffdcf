//! Forge adapters implementing ForgePort trait

pub mod bitbucket;
pub mod forge_port;
pub mod gitea;
pub mod github;
pub mod gitlab;
pub(crate) mod http;
pub(crate) mod pagination;

pub use bitbucket::BitbucketAdapter;
pub use forge_port::{ClientConfig, ForgePort, FromClientConfig, DEFAULT_PAGE_SIZE};
pub use gitea::GiteaAdapter;
pub use github::GitHubAdapter;
pub use gitlab::GitLabAdapter;
