//! ForgePort trait - unified interface for repository discovery
//!
//! Every supported forge (GitHub, GitLab, Gitea, Bitbucket) implements this
//! trait so callers can enumerate repositories without forge-specific code.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DiscoveryResult;
use crate::progress::{ProgressReporter, TracingProgress};
use crate::types::RawRepo;

/// Page size requested when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Settings needed to build an authenticated forge client
#[derive(Clone)]
pub struct ClientConfig {
    /// Self-hosted instance URL; `None` targets the public SaaS endpoint
    pub base_url: Option<String>,

    /// Access token used for API calls
    pub token: String,

    /// Items per page; 0 or anything above the forge's cap uses the cap
    pub page_size: u32,

    /// Per-request timeout
    pub request_timeout: Option<Duration>,

    /// Receives long-enumeration notices
    pub progress: Arc<dyn ProgressReporter>,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: None,
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Unified interface for listing repositories on a forge
///
/// Implemented by:
/// - GitHubAdapter: GitHub / GitHub Enterprise REST API v3
/// - GitLabAdapter: GitLab REST API v4
/// - GiteaAdapter: Gitea / Forgejo API v1
/// - BitbucketAdapter: Bitbucket Cloud API 2.0
///
/// Both listing operations page through the forge until it reports no
/// further page. The first failed request aborts the listing; records
/// fetched before it are dropped.
#[async_trait]
pub trait ForgePort: Send + Sync {
    /// Stable provider identifier, used as the registry key
    fn kind(&self) -> &'static str;

    /// List every repository of an organization (all visibilities)
    async fn get_org_repos(&self, org: &str) -> DiscoveryResult<Vec<RawRepo>>;

    /// List the repositories of a user.
    ///
    /// When `user` is the authenticated account, private repositories are
    /// included and repositories owned by organizations are dropped.
    async fn get_user_repos(&self, user: &str) -> DiscoveryResult<Vec<RawRepo>>;
}

/// Construction of a forge adapter from a [`ClientConfig`]
pub trait FromClientConfig: ForgePort + Sized + 'static {
    /// Registry key for this adapter
    const KIND: &'static str;

    /// Build an authenticated client.
    ///
    /// Fails with `AuthConfiguration` for a missing or malformed token and
    /// `EndpointConfiguration` for an unusable base URL.
    fn from_config(config: &ClientConfig) -> DiscoveryResult<Self>;
}
