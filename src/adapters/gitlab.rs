//! GitLab adapter implementing ForgePort trait
//!
//! Uses the GitLab REST API v4. Organizations map to groups (subgroups
//! included); pagination follows the `X-Next-Page` header.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::http::{self, ApiHandle, AuthScheme};
use super::pagination::{collect_pages, effective_page_size, Page};
use super::{ClientConfig, ForgePort, FromClientConfig};
use crate::error::DiscoveryResult;
use crate::progress::{ProgressReporter, SELF_CLONE_NOTICE};
use crate::types::{OwnerType, RawRepo};

/// GitLab API base URL
const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

const API_PREFIX: &str = "api/v4";

const MAX_PAGE_SIZE: u32 = 100;

/// GitLab project response from API
#[derive(Debug, Deserialize)]
struct GitLabProject {
    path: String,
    http_url_to_repo: String,
    ssh_url_to_repo: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    forked_from_project: Option<serde_json::Value>,
    #[serde(default)]
    topics: Vec<String>,
    /// Pre-14.5 name of `topics`
    #[serde(default)]
    tag_list: Vec<String>,
    #[serde(default)]
    wiki_enabled: bool,
    #[serde(default)]
    namespace: Option<GitLabNamespace>,
}

#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    #[serde(default)]
    kind: Option<String>, // "user" or "group"
}

/// GitLab user response
#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
}

/// GitLab adapter for ForgePort trait
pub struct GitLabAdapter {
    api: ApiHandle,
    page_size: u32,
    progress: Arc<dyn ProgressReporter>,
}

impl GitLabAdapter {
    pub fn api_url(&self) -> &str {
        self.api.api_url()
    }

    /// Convert GitLab API response to a raw record
    fn to_raw(gl_project: GitLabProject) -> RawRepo {
        let owner_type = gl_project
            .namespace
            .and_then(|ns| ns.kind)
            .and_then(|kind| match kind.as_str() {
                "user" => Some(OwnerType::User),
                "group" => Some(OwnerType::Organization),
                _ => None,
            });
        let topics = if gl_project.topics.is_empty() {
            gl_project.tag_list
        } else {
            gl_project.topics
        };

        RawRepo {
            name: gl_project.path,
            https_clone_url: gl_project.http_url_to_repo,
            ssh_url: gl_project.ssh_url_to_repo,
            default_branch: gl_project.default_branch,
            archived: gl_project.archived,
            fork: gl_project.forked_from_project.is_some(),
            topics,
            has_wiki: gl_project.wiki_enabled,
            owner_type,
        }
    }

    /// `X-Next-Page` carries the next page number; it is empty on the last page
    fn next_page(headers: &HeaderMap) -> Option<u32> {
        headers
            .get("x-next-page")?
            .to_str()
            .ok()?
            .trim()
            .parse::<u32>()
            .ok()
    }

    async fn list_page(
        &self,
        url: &str,
        extra: &[(&'static str, &'static str)],
        page: u32,
    ) -> DiscoveryResult<Page<RawRepo, u32>> {
        let mut query: Vec<(&str, String)> = extra
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();
        query.push(("per_page", self.page_size.to_string()));
        query.push(("page", page.to_string()));

        let (projects, headers): (Vec<GitLabProject>, _) = self.api.get_json(url, &query).await?;

        Ok(Page::new(
            projects.into_iter().map(Self::to_raw).collect(),
            Self::next_page(&headers),
        ))
    }

    async fn authenticated_username(&self) -> DiscoveryResult<String> {
        let (user, _): (GitLabUser, _) = self.api.get_json(&self.api.url("/user"), &[]).await?;
        Ok(user.username)
    }
}

impl FromClientConfig for GitLabAdapter {
    const KIND: &'static str = "gitlab";

    fn from_config(config: &ClientConfig) -> DiscoveryResult<Self> {
        let headers = http::auth_headers(Self::KIND, &config.token, AuthScheme::PrivateToken)?;
        let api_url =
            http::resolve_api_url(config.base_url.as_deref(), GITLAB_API_URL, API_PREFIX)?;

        Ok(Self {
            api: ApiHandle::new(Self::KIND, config, api_url, headers)?,
            page_size: effective_page_size(config.page_size, MAX_PAGE_SIZE),
            progress: config.progress.clone(),
        })
    }
}

#[async_trait]
impl ForgePort for GitLabAdapter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn get_org_repos(&self, org: &str) -> DiscoveryResult<Vec<RawRepo>> {
        // GitLab uses the URL-encoded full group path as group ID
        let url = self
            .api
            .url(&format!("/groups/{}/projects", urlencoding::encode(org)));
        let url = url.as_str();

        collect_pages(
            1,
            move |page| self.list_page(url, &[("include_subgroups", "true")], page),
            Some(self.progress.as_ref()),
        )
        .await
    }

    async fn get_user_repos(&self, user: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let username = self.authenticated_username().await?;

        if user.eq_ignore_ascii_case(&username) {
            self.progress.notice(SELF_CLONE_NOTICE);
            let url = self.api.url("/projects");
            let url = url.as_str();
            let repos = collect_pages(
                1,
                move |page| self.list_page(url, &[("owned", "true")], page),
                None,
            )
            .await?;
            return Ok(repos.into_iter().filter(RawRepo::is_user_owned).collect());
        }

        let url = self
            .api
            .url(&format!("/users/{}/projects", urlencoding::encode(user)));
        let url = url.as_str();
        collect_pages(1, move |page| self.list_page(url, &[], page), None).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::error::DiscoveryError;
    use crate::progress::testing::RecordingProgress;

    fn project_json(path: &str, namespace_kind: &str) -> serde_json::Value {
        json!({
            "id": 1,
            "path": path,
            "name": path.to_uppercase(),
            "http_url_to_repo": format!("https://gitlab.example.com/group/{path}.git"),
            "ssh_url_to_repo": format!("git@gitlab.example.com:group/{path}.git"),
            "default_branch": "main",
            "archived": false,
            "topics": [],
            "tag_list": ["legacy"],
            "wiki_enabled": true,
            "namespace": { "kind": namespace_kind }
        })
    }

    fn adapter(server: &MockServer, progress: Arc<dyn ProgressReporter>) -> GitLabAdapter {
        let config = ClientConfig::new("glpat-test")
            .with_base_url(server.base_url())
            .with_page_size(2)
            .with_progress(progress);
        GitLabAdapter::from_config(&config).unwrap()
    }

    #[test]
    fn test_to_raw() {
        let project: GitLabProject =
            serde_json::from_value(project_json("svc", "group")).unwrap();

        let raw = GitLabAdapter::to_raw(project);
        assert_eq!(raw.name, "svc");
        assert_eq!(raw.https_clone_url, "https://gitlab.example.com/group/svc.git");
        assert_eq!(raw.topics, vec!["legacy".to_string()]);
        assert!(raw.has_wiki);
        assert!(!raw.fork);
        assert_eq!(raw.owner_type, Some(OwnerType::Organization));
    }

    #[test]
    fn test_fork_detection() {
        let mut value = project_json("copy", "user");
        value["forked_from_project"] = json!({ "id": 7 });
        let raw = GitLabAdapter::to_raw(serde_json::from_value(value).unwrap());
        assert!(raw.fork);
        assert_eq!(raw.owner_type, Some(OwnerType::User));
    }

    #[test]
    fn test_base_url_gets_api_prefix() {
        let config = ClientConfig::new("glpat-test").with_base_url("https://gitlab.example.com");
        let adapter = GitLabAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.api_url(), "https://gitlab.example.com/api/v4");
        assert_eq!(adapter.kind(), "gitlab");
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let result = GitLabAdapter::from_config(&ClientConfig::new("glpat test"));
        assert!(matches!(result, Err(DiscoveryError::AuthConfiguration { .. })));
    }

    #[tokio::test]
    async fn test_get_org_repos_follows_next_page_header() {
        let server = MockServer::start_async().await;
        let path = "/api/v4/groups/acme/projects";
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(path)
                    .query_param("include_subgroups", "true")
                    .query_param("page", "1")
                    .header("private-token", "glpat-test");
                then.status(200)
                    .header("x-next-page", "2")
                    .json_body(json!([project_json("a", "group"), project_json("b", "group")]));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET).path(path).query_param("page", "2");
                then.status(200)
                    .header("x-next-page", "")
                    .json_body(json!([project_json("c", "group")]));
            })
            .await;

        let repos = adapter(&server, Arc::new(RecordingProgress::default()))
            .get_org_repos("acme")
            .await
            .unwrap();

        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_user_repos_for_self_drops_group_projects() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v4/user");
                then.status(200).json_body(json!({ "id": 3, "username": "jdoe" }));
            })
            .await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects")
                    .query_param("owned", "true")
                    .query_param("page", "1");
                then.status(200).json_body(json!([
                    project_json("dotfiles", "user"),
                    project_json("group-owned", "group"),
                ]));
            })
            .await;
        let progress = Arc::new(RecordingProgress::default());

        let repos = adapter(&server, progress.clone())
            .get_user_repos("jdoe")
            .await
            .unwrap();

        listing.assert_async().await;
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "dotfiles");
        assert_eq!(progress.notices(), vec![SELF_CLONE_NOTICE]);
    }

    #[tokio::test]
    async fn test_identity_lookup_failure_is_upstream_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v4/user");
                then.status(401).json_body(json!({ "message": "401 Unauthorized" }));
            })
            .await;

        let result = adapter(&server, Arc::new(RecordingProgress::default()))
            .get_user_repos("jdoe")
            .await;

        assert!(matches!(result, Err(DiscoveryError::UpstreamApi { .. })));
    }
}
