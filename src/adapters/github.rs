//! GitHub adapter implementing ForgePort trait
//!
//! Uses the GitHub REST API v3. A base URL selects a GitHub Enterprise
//! Server instance, whose API lives under `api/v3`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use serde::Deserialize;

use super::http::{self, ApiHandle, AuthScheme};
use super::pagination::{collect_pages, effective_page_size, Page};
use super::{ClientConfig, ForgePort, FromClientConfig};
use crate::error::DiscoveryResult;
use crate::progress::{ProgressReporter, SELF_CLONE_NOTICE};
use crate::types::{OwnerType, RawRepo};

/// GitHub API base URL
const GITHUB_API_URL: &str = "https://api.github.com";

const GITHUB_UPLOAD_URL: &str = "https://uploads.github.com";

const ENTERPRISE_API_PREFIX: &str = "api/v3";

const MAX_PAGE_SIZE: u32 = 100;

/// GitHub repository response from API
#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    clone_url: String,
    ssh_url: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    has_wiki: bool,
    #[serde(default)]
    owner: Option<GitHubOwner>,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// GitHub user response
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// GitHub adapter for ForgePort trait
pub struct GitHubAdapter {
    api: ApiHandle,
    upload_url: String,
    page_size: u32,
    progress: Arc<dyn ProgressReporter>,
}

impl GitHubAdapter {
    /// Root of the REST API this adapter talks to
    pub fn api_url(&self) -> &str {
        self.api.api_url()
    }

    /// Upload endpoint matching the API root
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Convert GitHub API response to a raw record
    fn to_raw(gh_repo: GitHubRepo) -> RawRepo {
        let owner_type = gh_repo
            .owner
            .and_then(|owner| owner.kind)
            .and_then(|kind| match kind.as_str() {
                "User" => Some(OwnerType::User),
                "Organization" => Some(OwnerType::Organization),
                _ => None,
            });

        RawRepo {
            name: gh_repo.name,
            https_clone_url: gh_repo.clone_url,
            ssh_url: gh_repo.ssh_url,
            default_branch: gh_repo.default_branch,
            archived: gh_repo.archived,
            fork: gh_repo.fork,
            topics: gh_repo.topics,
            has_wiki: gh_repo.has_wiki,
            owner_type,
        }
    }

    /// URL of the first page of a listing
    fn first_page(&self, path: &str, extra: &[(&str, &str)]) -> DiscoveryResult<String> {
        let mut query: Vec<(&str, String)> = extra
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();
        query.push(("per_page", self.page_size.to_string()));
        query.push(("page", "1".to_string()));
        http::url_with_query(&self.api.url(path), &query)
    }

    /// Fetch one page of a repository listing; the cursor is the page URL
    async fn list_page(&self, url: String) -> DiscoveryResult<Page<RawRepo, String>> {
        let (repos, headers): (Vec<GitHubRepo>, _) = self.api.get_json(&url, &[]).await?;

        Ok(Page::new(
            repos.into_iter().map(Self::to_raw).collect(),
            http::next_link(Self::KIND, &headers, &url)?,
        ))
    }

    /// Login of the account the token belongs to
    async fn authenticated_login(&self) -> DiscoveryResult<String> {
        let (user, _): (GitHubUser, _) = self.api.get_json(&self.api.url("/user"), &[]).await?;
        Ok(user.login)
    }
}

impl FromClientConfig for GitHubAdapter {
    const KIND: &'static str = "github";

    fn from_config(config: &ClientConfig) -> DiscoveryResult<Self> {
        let mut headers = http::auth_headers(Self::KIND, &config.token, AuthScheme::Bearer)?;
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );

        let api_url = http::resolve_api_url(
            config.base_url.as_deref(),
            GITHUB_API_URL,
            ENTERPRISE_API_PREFIX,
        )?;
        // Enterprise servers serve uploads next to the API: <base>/api/uploads
        let upload_url = if api_url == GITHUB_API_URL {
            GITHUB_UPLOAD_URL.to_string()
        } else {
            let root = api_url
                .strip_suffix(ENTERPRISE_API_PREFIX)
                .unwrap_or(&api_url)
                .trim_end_matches('/');
            format!("{}/api/uploads", root)
        };

        Ok(Self {
            api: ApiHandle::new(Self::KIND, config, api_url, headers)?,
            upload_url,
            page_size: effective_page_size(config.page_size, MAX_PAGE_SIZE),
            progress: config.progress.clone(),
        })
    }
}

#[async_trait]
impl ForgePort for GitHubAdapter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn get_org_repos(&self, org: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let first = self.first_page(
            &format!("/orgs/{}/repos", urlencoding::encode(org)),
            &[("type", "all")],
        )?;

        collect_pages(
            first,
            move |url| self.list_page(url),
            Some(self.progress.as_ref()),
        )
        .await
    }

    async fn get_user_repos(&self, user: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let login = self.authenticated_login().await?;

        // GitHub logins are case-insensitive
        if user.eq_ignore_ascii_case(&login) {
            self.progress.notice(SELF_CLONE_NOTICE);
            let first = self.first_page("/user/repos", &[("visibility", "all")])?;
            let repos = collect_pages(first, move |url| self.list_page(url), None).await?;
            // the authenticated listing includes repos of the user's orgs
            return Ok(repos.into_iter().filter(RawRepo::is_user_owned).collect());
        }

        let first = self.first_page(&format!("/users/{}/repos", urlencoding::encode(user)), &[])?;
        collect_pages(first, move |url| self.list_page(url), None).await
    }
}
