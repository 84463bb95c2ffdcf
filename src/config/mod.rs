//! Configuration for forgescan
//!
//! Settings come from `config.yaml` (see [`DiscoveryConfig::default_path`])
//! with `FORGESCAN_*` environment variables layered on top.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::{ClientConfig, DEFAULT_PAGE_SIZE};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::filter::FilterPolicy;
use crate::normalize::Normalizer;
use crate::progress::ProgressReporter;
use crate::types::CloneProtocol;

const ENV_PREFIX: &str = "FORGESCAN_";

fn default_provider_kind() -> String {
    "github".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Root config.yaml structure
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Registry key of the forge to talk to
    #[serde(default = "default_provider_kind")]
    pub provider_kind: String,

    pub access_token: String,

    /// Self-hosted instance URL
    pub base_url: Option<String>,

    pub clone_protocol: CloneProtocol,

    /// Branch to check out instead of each repository's default
    pub branch_override: Option<String>,

    pub skip_archived: bool,

    pub skip_forks: bool,

    /// Keep only repositories carrying at least one of these topics
    pub topic_allow_list: Vec<String>,

    pub clone_wiki: bool,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    pub request_timeout_secs: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            provider_kind: default_provider_kind(),
            access_token: String::new(),
            base_url: None,
            clone_protocol: CloneProtocol::default(),
            branch_override: None,
            skip_archived: false,
            skip_forks: false,
            topic_allow_list: Vec::new(),
            clone_wiki: false,
            page_size: default_page_size(),
            request_timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for DiscoveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryConfig")
            .field("provider_kind", &self.provider_kind)
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("clone_protocol", &self.clone_protocol)
            .field("branch_override", &self.branch_override)
            .field("skip_archived", &self.skip_archived)
            .field("skip_forks", &self.skip_forks)
            .field("topic_allow_list", &self.topic_allow_list)
            .field("clone_wiki", &self.clone_wiki)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl DiscoveryConfig {
    /// `<config dir>/forgescan/config.yaml`, e.g. `~/.config/forgescan/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("forgescan").join("config.yaml"))
    }

    /// Load the config from disk
    pub async fn load(path: &Path) -> DiscoveryResult<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when the file does not exist
    pub async fn load_or_default(path: &Path) -> DiscoveryResult<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    /// Load the file named on the command line, or the default location.
    /// Only the default location may be absent.
    pub async fn load_from(explicit: Option<&Path>) -> DiscoveryResult<Self> {
        Self::load_with_fallback(explicit, Self::default_path().as_deref()).await
    }

    async fn load_with_fallback(
        explicit: Option<&Path>,
        fallback: Option<&Path>,
    ) -> DiscoveryResult<Self> {
        match (explicit, fallback) {
            (Some(path), _) => Self::load(path).await,
            (None, Some(path)) => Self::load_or_default(path).await,
            (None, None) => Ok(Self::default()),
        }
    }

    /// Overlay `FORGESCAN_*` variables from the process environment
    pub fn apply_env(&mut self) -> DiscoveryResult<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay `FORGESCAN_*` variables read through `lookup`.
    ///
    /// Unset variables leave the current value alone. Unparseable values
    /// fail with [`DiscoveryError::Config`].
    pub fn apply_env_with<F>(&mut self, lookup: F) -> DiscoveryResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("PROVIDER") {
            self.provider_kind = value.trim().to_lowercase();
        }
        if let Some((_, value)) = var("TOKEN") {
            self.access_token = value;
        }
        if let Some((_, value)) = var("BASE_URL") {
            self.base_url = non_blank(value);
        }
        if let Some((key, value)) = var("CLONE_PROTOCOL") {
            self.clone_protocol = value
                .parse()
                .map_err(|e: String| DiscoveryError::Config(format!("{}: {}", key, e)))?;
        }
        if let Some((_, value)) = var("BRANCH") {
            self.branch_override = non_blank(value);
        }
        if let Some((key, value)) = var("SKIP_ARCHIVED") {
            self.skip_archived = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("SKIP_FORKS") {
            self.skip_forks = parse_bool(&key, &value)?;
        }
        if let Some((_, value)) = var("TOPICS") {
            self.topic_allow_list = value
                .split(',')
                .map(str::trim)
                .filter(|topic| !topic.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some((key, value)) = var("CLONE_WIKI") {
            self.clone_wiki = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("PAGE_SIZE") {
            self.page_size = value.trim().parse().map_err(|_| {
                DiscoveryError::Config(format!("{}: expected a number, got '{}'", key, value))
            })?;
        }

        Ok(())
    }

    /// Client settings for the registry
    pub fn client_config(&self, progress: Arc<dyn ProgressReporter>) -> ClientConfig {
        let mut config = ClientConfig::new(self.access_token.clone())
            .with_page_size(self.page_size)
            .with_progress(progress);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::new()
            .with_skip_archived(self.skip_archived)
            .with_skip_forks(self.skip_forks)
            .with_topics(&self.topic_allow_list)
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.clone_protocol, self.access_token.clone())
            .with_branch_override(self.branch_override.clone())
            .with_wiki(self.clone_wiki)
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_bool(key: &str, value: &str) -> DiscoveryResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DiscoveryError::Config(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}
