//! Authenticated HTTP handle shared by the forge adapters

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::{DiscoveryError, DiscoveryResult, UpstreamError};

use super::ClientConfig;

const USER_AGENT: &str = concat!("forgescan/", env!("CARGO_PKG_VERSION"));

/// How a forge expects the access token to be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: token <token>` (Gitea/Forgejo)
    Token,
    /// `PRIVATE-TOKEN: <token>` (GitLab)
    PrivateToken,
}

/// Build the auth header for `token`, rejecting empty or malformed tokens
pub(crate) fn auth_headers(
    provider: &str,
    token: &str,
    scheme: AuthScheme,
) -> DiscoveryResult<HeaderMap> {
    if token.trim().is_empty() {
        return Err(DiscoveryError::auth(provider, "no access token configured"));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DiscoveryError::auth(
            provider,
            "access token contains whitespace or control characters",
        ));
    }

    let (name, value) = match scheme {
        AuthScheme::Bearer => (header::AUTHORIZATION, format!("Bearer {}", token)),
        AuthScheme::Token => (header::AUTHORIZATION, format!("token {}", token)),
        AuthScheme::PrivateToken => (HeaderName::from_static("private-token"), token.to_string()),
    };
    let mut value = HeaderValue::from_str(&value)
        .map_err(|e| DiscoveryError::auth(provider, e.to_string()))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Resolve the API root for a forge.
///
/// Without a base URL the public endpoint is used. With one, `api_prefix`
/// (e.g. `api/v3`) is appended unless the base URL already ends with it.
pub(crate) fn resolve_api_url(
    base_url: Option<&str>,
    default_api_url: &str,
    api_prefix: &str,
) -> DiscoveryResult<String> {
    let base = match base_url.map(str::trim) {
        Some(base) if !base.is_empty() => base,
        _ => return Ok(default_api_url.to_string()),
    };

    let invalid = |message: String| DiscoveryError::EndpointConfiguration {
        url: base.to_string(),
        message,
    };
    let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    let trimmed = base.trim_end_matches('/');
    if api_prefix.is_empty() || trimmed.ends_with(api_prefix) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/{}", trimmed, api_prefix))
    }
}

/// Absolute URL of the `rel="next"` entry of a `Link` header, resolved
/// against `current_url` (the URL of the request that produced `headers`).
///
/// GitHub and Gitea use: `<https://host/path?page=3>; rel="next", <...>; rel="last"`.
/// No header or no `next` entry means the listing is complete. A `next`
/// entry that cannot be turned into a URL is a decode failure, never an
/// early end of the listing.
pub(crate) fn next_link(
    provider: &str,
    headers: &HeaderMap,
    current_url: &str,
) -> DiscoveryResult<Option<String>> {
    let Some(link_header) = headers.get(header::LINK) else {
        return Ok(None);
    };
    let unusable = |message: String| {
        DiscoveryError::upstream(
            provider,
            UpstreamError::Decode(format!("unusable Link header: {}", message)),
        )
    };
    let link_header = link_header.to_str().map_err(|e| unusable(e.to_string()))?;

    for part in link_header.split(',') {
        let mut fields = part.split(';');
        let target = fields
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        if !fields.any(|field| field.trim() == "rel=\"next\"") {
            continue;
        }
        if target.is_empty() {
            return Err(unusable("empty next target".to_string()));
        }
        let next = Url::parse(current_url)
            .and_then(|base| base.join(target))
            .map_err(|e| unusable(format!("'{}': {}", target, e)))?;
        return Ok(Some(next.to_string()));
    }
    Ok(None)
}

/// `url` with `query` appended, for the first request of a listing
pub(crate) fn url_with_query(url: &str, query: &[(&str, String)]) -> DiscoveryResult<String> {
    let parsed = Url::parse_with_params(url, query.iter().map(|(key, value)| (*key, value.as_str())))
        .map_err(|e| DiscoveryError::EndpointConfiguration {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    Ok(parsed.to_string())
}

/// An authenticated `reqwest` client bound to one forge's API root
pub(crate) struct ApiHandle {
    provider: &'static str,
    client: Client,
    api_url: String,
    headers: HeaderMap,
}

impl ApiHandle {
    pub(crate) fn new(
        provider: &'static str,
        config: &ClientConfig,
        api_url: String,
        headers: HeaderMap,
    ) -> DiscoveryResult<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DiscoveryError::upstream(provider, e))?;

        Ok(Self {
            provider,
            client,
            api_url,
            headers,
        })
    }

    pub(crate) fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Absolute URL for an API path such as `/orgs/rust-lang/repos`
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// GET `url` and decode the JSON body. Non-success statuses, transport
    /// failures and undecodable bodies all become `UpstreamApi` errors.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> DiscoveryResult<(T, HeaderMap)> {
        tracing::debug!(provider = self.provider, url, ?query, "GET");

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| DiscoveryError::upstream(self.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::upstream(
                self.provider,
                UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                },
            ));
        }

        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::upstream(self.provider, e))?;
        let body = serde_json::from_slice(&bytes).map_err(|e| {
            DiscoveryError::upstream(self.provider, UpstreamError::Decode(e.to_string()))
        })?;

        Ok((body, headers))
    }
}
