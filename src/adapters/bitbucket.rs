//! Bitbucket Cloud adapter implementing ForgePort trait
//!
//! Uses the Bitbucket API 2.0. Organizations and users are both workspaces;
//! pagination follows the `next` URL carried in each response body.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::http::{self, ApiHandle, AuthScheme};
use super::pagination::{collect_pages, effective_page_size, Page};
use super::{ClientConfig, ForgePort, FromClientConfig};
use crate::error::{DiscoveryError, DiscoveryResult, UpstreamError};
use crate::progress::{ProgressReporter, SELF_CLONE_NOTICE};
use crate::types::{OwnerType, RawRepo};

/// Bitbucket API base URL
const BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";

const API_PREFIX: &str = "2.0";

const MAX_PAGE_SIZE: u32 = 100;

/// Paginated response envelope
#[derive(Debug, Deserialize)]
struct BitbucketPage {
    #[serde(default)]
    values: Vec<BitbucketRepo>,
    #[serde(default)]
    next: Option<String>,
}

/// Bitbucket repository response from API
#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    slug: String,
    #[serde(default)]
    links: BitbucketLinks,
    #[serde(default)]
    mainbranch: Option<BitbucketBranch>,
    #[serde(default)]
    parent: Option<serde_json::Value>,
    #[serde(default)]
    has_wiki: bool,
    #[serde(default)]
    owner: Option<BitbucketOwner>,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<BitbucketCloneLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCloneLink {
    name: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketOwner {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Bitbucket user response; accounts created after the GDPR changes may
/// only expose `nickname`
#[derive(Debug, Deserialize)]
struct BitbucketUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
}

/// Bitbucket adapter for ForgePort trait
pub struct BitbucketAdapter {
    api: ApiHandle,
    page_size: u32,
    progress: Arc<dyn ProgressReporter>,
}

impl BitbucketAdapter {
    pub fn api_url(&self) -> &str {
        self.api.api_url()
    }

    /// Clone link hrefs embed the requesting account (`https://jdoe@bitbucket.org/...`)
    fn strip_userinfo(href: &str) -> String {
        match Url::parse(href) {
            Ok(mut url) if url.scheme() == "https" || url.scheme() == "http" => {
                // only fails for cannot-be-a-base URLs, which http(s) never are
                let _ = url.set_username("");
                let _ = url.set_password(None);
                url.to_string()
            }
            _ => href.to_string(),
        }
    }

    fn clone_link(repo: &BitbucketRepo, name: &str) -> Result<String, UpstreamError> {
        repo.links
            .clone
            .iter()
            .find(|link| link.name == name)
            .map(|link| link.href.clone())
            .ok_or_else(|| {
                UpstreamError::Decode(format!(
                    "repository '{}' has no {} clone link",
                    repo.slug, name
                ))
            })
    }

    /// Convert Bitbucket API response to a raw record. Both clone links are
    /// required.
    fn to_raw(bb_repo: BitbucketRepo) -> Result<RawRepo, UpstreamError> {
        let https_clone_url = Self::strip_userinfo(&Self::clone_link(&bb_repo, "https")?);
        let ssh_url = Self::clone_link(&bb_repo, "ssh")?;
        let owner_type = bb_repo
            .owner
            .and_then(|owner| owner.kind)
            .and_then(|kind| match kind.as_str() {
                "user" => Some(OwnerType::User),
                "team" | "workspace" => Some(OwnerType::Organization),
                _ => None,
            });

        Ok(RawRepo {
            name: bb_repo.slug,
            https_clone_url,
            ssh_url,
            default_branch: bb_repo.mainbranch.map(|branch| branch.name),
            // Bitbucket Cloud has no archive flag
            archived: false,
            fork: bb_repo.parent.is_some(),
            topics: Vec::new(),
            has_wiki: bb_repo.has_wiki,
            owner_type,
        })
    }

    /// Fetch the page at `url`; continuation URLs already carry their query
    async fn list_page(&self, url: String) -> DiscoveryResult<Page<RawRepo, String>> {
        let (page, _): (BitbucketPage, _) = self.api.get_json(&url, &[]).await?;

        let repos = page
            .values
            .into_iter()
            .map(Self::to_raw)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DiscoveryError::upstream(Self::KIND, e))?;

        Ok(Page::new(repos, page.next.filter(|next| !next.is_empty())))
    }

    fn first_page_url(&self, path: &str, extra_query: &str) -> String {
        format!(
            "{}?{}pagelen={}",
            self.api.url(path),
            extra_query,
            self.page_size
        )
    }

    async fn authenticated_username(&self) -> DiscoveryResult<String> {
        let (user, _): (BitbucketUser, _) = self.api.get_json(&self.api.url("/user"), &[]).await?;
        user.username.or(user.nickname).ok_or_else(|| {
            DiscoveryError::upstream(
                Self::KIND,
                UpstreamError::Decode("user response has neither username nor nickname".into()),
            )
        })
    }

    async fn workspace_repos(
        &self,
        workspace: &str,
        progress: Option<&dyn ProgressReporter>,
    ) -> DiscoveryResult<Vec<RawRepo>> {
        let first = self.first_page_url(
            &format!("/repositories/{}", urlencoding::encode(workspace)),
            "",
        );
        collect_pages(first, move |url| self.list_page(url), progress).await
    }
}

impl FromClientConfig for BitbucketAdapter {
    const KIND: &'static str = "bitbucket";

    fn from_config(config: &ClientConfig) -> DiscoveryResult<Self> {
        let headers = http::auth_headers(Self::KIND, &config.token, AuthScheme::Bearer)?;
        let api_url =
            http::resolve_api_url(config.base_url.as_deref(), BITBUCKET_API_URL, API_PREFIX)?;

        Ok(Self {
            api: ApiHandle::new(Self::KIND, config, api_url, headers)?,
            page_size: effective_page_size(config.page_size, MAX_PAGE_SIZE),
            progress: config.progress.clone(),
        })
    }
}

#[async_trait]
impl ForgePort for BitbucketAdapter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn get_org_repos(&self, org: &str) -> DiscoveryResult<Vec<RawRepo>> {
        self.workspace_repos(org, Some(self.progress.as_ref())).await
    }

    async fn get_user_repos(&self, user: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let username = self.authenticated_username().await?;

        if user.eq_ignore_ascii_case(&username) {
            self.progress.notice(SELF_CLONE_NOTICE);
            let first = self.first_page_url("/repositories", "role=member&");
            let repos = collect_pages(first, move |url| self.list_page(url), None).await?;
            return Ok(repos.into_iter().filter(RawRepo::is_user_owned).collect());
        }

        self.workspace_repos(user, None).await
    }
}
