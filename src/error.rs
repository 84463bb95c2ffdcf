use thiserror::Error;

/// Failure of a single upstream API exchange
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, TLS, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status (includes rate limiting)
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{provider} credentials rejected: {message}")]
    AuthConfiguration { provider: String, message: String },

    #[error("invalid base URL '{url}': {message}")]
    EndpointConfiguration { url: String, message: String },

    #[error("{provider} API request failed: {source}")]
    UpstreamApi {
        provider: String,
        #[source]
        source: UpstreamError,
    },

    #[error("unknown provider kind: {0}")]
    UnknownProviderKind(String),

    #[error("repository '{repo}' has a malformed clone URL: '{url}'")]
    MalformedUpstreamUrl { repo: String, url: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DiscoveryError {
    pub(crate) fn upstream(provider: &str, source: impl Into<UpstreamError>) -> Self {
        Self::UpstreamApi {
            provider: provider.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn auth(provider: &str, message: impl Into<String>) -> Self {
        Self::AuthConfiguration {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;
