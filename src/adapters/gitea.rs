//! Gitea adapter implementing ForgePort trait
//!
//! Uses the Gitea/Forgejo API v1, so it also covers Codeberg and other
//! Forgejo instances.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::http::{self, ApiHandle, AuthScheme};
use super::pagination::{collect_pages, effective_page_size, Page};
use super::{ClientConfig, ForgePort, FromClientConfig};
use crate::error::DiscoveryResult;
use crate::progress::{ProgressReporter, SELF_CLONE_NOTICE};
use crate::types::{OwnerType, RawRepo};

/// Gitea API base URL
const GITEA_API_URL: &str = "https://gitea.com/api/v1";

const API_PREFIX: &str = "api/v1";

/// Gitea's default `MAX_RESPONSE_ITEMS`
const MAX_PAGE_SIZE: u32 = 50;

/// Gitea repository response from API
#[derive(Debug, Deserialize)]
struct GiteaRepo {
    name: String,
    clone_url: String,
    ssh_url: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
    /// `null` on repositories without topics
    #[serde(default)]
    topics: Option<Vec<String>>,
    #[serde(default)]
    has_wiki: bool,
    owner: GiteaUser,
}

/// Gitea user (also used for repository owners)
#[derive(Debug, Deserialize)]
struct GiteaUser {
    login: String,
}

/// Gitea adapter for ForgePort trait
pub struct GiteaAdapter {
    api: ApiHandle,
    page_size: u32,
    progress: Arc<dyn ProgressReporter>,
}

impl GiteaAdapter {
    pub fn api_url(&self) -> &str {
        self.api.api_url()
    }

    /// Convert Gitea API response to a raw record.
    ///
    /// Gitea does not say whether an owner is a user or an organization, so
    /// the owner type is only known when listing for the authenticated
    /// account (`self_login`).
    fn to_raw(gt_repo: GiteaRepo, self_login: Option<&str>) -> RawRepo {
        let owner_type = self_login.map(|login| {
            if gt_repo.owner.login.eq_ignore_ascii_case(login) {
                OwnerType::User
            } else {
                OwnerType::Organization
            }
        });

        RawRepo {
            name: gt_repo.name,
            https_clone_url: gt_repo.clone_url,
            ssh_url: gt_repo.ssh_url,
            default_branch: gt_repo.default_branch,
            archived: gt_repo.archived,
            fork: gt_repo.fork,
            topics: gt_repo.topics.unwrap_or_default(),
            has_wiki: gt_repo.has_wiki,
            owner_type,
        }
    }

    fn first_page(&self, path: &str) -> DiscoveryResult<String> {
        let query = [
            ("limit", self.page_size.to_string()),
            ("page", "1".to_string()),
        ];
        http::url_with_query(&self.api.url(path), &query)
    }

    async fn list_page(
        &self,
        url: String,
        self_login: Option<&str>,
    ) -> DiscoveryResult<Page<RawRepo, String>> {
        let (repos, headers): (Vec<GiteaRepo>, _) = self.api.get_json(&url, &[]).await?;

        Ok(Page::new(
            repos
                .into_iter()
                .map(|repo| Self::to_raw(repo, self_login))
                .collect(),
            http::next_link(Self::KIND, &headers, &url)?,
        ))
    }

    async fn authenticated_login(&self) -> DiscoveryResult<String> {
        let (user, _): (GiteaUser, _) = self.api.get_json(&self.api.url("/user"), &[]).await?;
        Ok(user.login)
    }
}

impl FromClientConfig for GiteaAdapter {
    const KIND: &'static str = "gitea";

    fn from_config(config: &ClientConfig) -> DiscoveryResult<Self> {
        let headers = http::auth_headers(Self::KIND, &config.token, AuthScheme::Token)?;
        let api_url = http::resolve_api_url(config.base_url.as_deref(), GITEA_API_URL, API_PREFIX)?;

        Ok(Self {
            api: ApiHandle::new(Self::KIND, config, api_url, headers)?,
            page_size: effective_page_size(config.page_size, MAX_PAGE_SIZE),
            progress: config.progress.clone(),
        })
    }
}

#[async_trait]
impl ForgePort for GiteaAdapter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn get_org_repos(&self, org: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let first = self.first_page(&format!("/orgs/{}/repos", urlencoding::encode(org)))?;

        collect_pages(
            first,
            move |url| self.list_page(url, None),
            Some(self.progress.as_ref()),
        )
        .await
    }

    async fn get_user_repos(&self, user: &str) -> DiscoveryResult<Vec<RawRepo>> {
        let login = self.authenticated_login().await?;

        // Gitea logins are case-insensitive
        if user.eq_ignore_ascii_case(&login) {
            self.progress.notice(SELF_CLONE_NOTICE);
            let first = self.first_page("/user/repos")?;
            let login = login.as_str();
            let repos =
                collect_pages(first, move |url| self.list_page(url, Some(login)), None).await?;
            return Ok(repos.into_iter().filter(RawRepo::is_user_owned).collect());
        }

        let first = self.first_page(&format!("/users/{}/repos", urlencoding::encode(user)))?;
        collect_pages(first, move |url| self.list_page(url, None), None).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::error::DiscoveryError;
    use crate::progress::testing::RecordingProgress;

    fn repo_json(name: &str, owner: &str) -> serde_json::Value {
        json!({
            "id": 10,
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "clone_url": format!("https://gitea.example.com/{owner}/{name}.git"),
            "ssh_url": format!("git@gitea.example.com:{owner}/{name}.git"),
            "default_branch": "main",
            "archived": false,
            "fork": false,
            "topics": null,
            "has_wiki": true,
            "owner": { "id": 1, "login": owner }
        })
    }

    fn adapter(server: &MockServer, progress: Arc<dyn ProgressReporter>) -> GiteaAdapter {
        let config = ClientConfig::new("gitea-token")
            .with_base_url(server.base_url())
            .with_page_size(2)
            .with_progress(progress);
        GiteaAdapter::from_config(&config).unwrap()
    }

    #[test]
    fn test_to_raw_without_identity() {
        let repo: GiteaRepo = serde_json::from_value(repo_json("infra", "acme")).unwrap();

        let raw = GiteaAdapter::to_raw(repo, None);
        assert_eq!(raw.name, "infra");
        assert_eq!(raw.ssh_url, "git@gitea.example.com:acme/infra.git");
        assert!(raw.topics.is_empty());
        assert_eq!(raw.owner_type, None);
    }

    #[test]
    fn test_to_raw_with_identity() {
        let mine: GiteaRepo = serde_json::from_value(repo_json("notes", "jdoe")).unwrap();
        let theirs: GiteaRepo = serde_json::from_value(repo_json("infra", "acme")).unwrap();

        assert_eq!(
            GiteaAdapter::to_raw(mine, Some("jdoe")).owner_type,
            Some(OwnerType::User)
        );
        assert_eq!(
            GiteaAdapter::to_raw(theirs, Some("jdoe")).owner_type,
            Some(OwnerType::Organization)
        );
    }

    #[test]
    fn test_page_size_is_capped() {
        let config = ClientConfig::new("gitea-token")
            .with_base_url("https://codeberg.org")
            .with_page_size(100);
        let adapter = GiteaAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.page_size, MAX_PAGE_SIZE);
        assert_eq!(adapter.api_url(), "https://codeberg.org/api/v1");
    }

    #[test]
    fn test_default_endpoint() {
        let adapter = GiteaAdapter::from_config(&ClientConfig::new("gitea-token")).unwrap();
        assert_eq!(adapter.api_url(), GITEA_API_URL);
    }

    #[test]
    fn test_missing_token() {
        let result = GiteaAdapter::from_config(&ClientConfig::new(""));
        assert!(matches!(result, Err(DiscoveryError::AuthConfiguration { .. })));
    }

    #[tokio::test]
    async fn test_get_org_repos_paginates() {
        let server = MockServer::start_async().await;
        let path = "/api/v1/orgs/acme/repos";
        let next = format!("<{}?limit=2&page=2>; rel=\"next\"", server.url(path));
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(path)
                    .query_param("limit", "2")
                    .query_param("page", "1")
                    .header("authorization", "token gitea-token");
                then.status(200)
                    .header("link", next.as_str())
                    .json_body(json!([repo_json("a", "acme"), repo_json("b", "acme")]));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET).path(path).query_param("page", "2");
                then.status(200).json_body(json!([repo_json("c", "acme")]));
            })
            .await;

        let repos = adapter(&server, Arc::new(RecordingProgress::default()))
            .get_org_repos("acme")
            .await
            .unwrap();

        assert_eq!(repos.len(), 3);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_user_repos_for_self_keeps_own_repos() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/user");
                then.status(200).json_body(json!({ "id": 1, "login": "jdoe" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/user/repos");
                then.status(200)
                    .json_body(json!([repo_json("notes", "jdoe"), repo_json("infra", "acme")]));
            })
            .await;
        let progress = Arc::new(RecordingProgress::default());

        let repos = adapter(&server, progress.clone())
            .get_user_repos("jdoe")
            .await
            .unwrap();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "notes");
        assert_eq!(progress.notices(), vec![SELF_CLONE_NOTICE]);
    }

    #[tokio::test]
    async fn test_get_user_repos_for_other_user() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/user");
                then.status(200).json_body(json!({ "id": 1, "login": "jdoe" }));
            })
            .await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/users/octo/repos");
                then.status(200).json_body(json!([repo_json("site", "octo")]));
            })
            .await;
        let progress = Arc::new(RecordingProgress::default());

        let repos = adapter(&server, progress.clone())
            .get_user_repos("octo")
            .await
            .unwrap();

        listing.assert_async().await;
        assert_eq!(repos.len(), 1);
        assert!(progress.notices().is_empty());
    }

    #[tokio::test]
    async fn test_get_org_repos_follows_relative_next_link() {
        let server = MockServer::start_async().await;
        let path = "/api/v1/orgs/acme/repos";
        server
            .mock_async(|when, then| {
                when.method(GET).path(path).query_param("page", "1");
                then.status(200)
                    .header("link", "</api/v1/orgs/acme/repos?limit=2&page=2>; rel=\"next\"")
                    .json_body(json!([repo_json("a", "acme"), repo_json("b", "acme")]));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET).path(path).query_param("page", "2");
                then.status(200).json_body(json!([repo_json("c", "acme")]));
            })
            .await;

        let repos = adapter(&server, Arc::new(RecordingProgress::default()))
            .get_org_repos("acme")
            .await
            .unwrap();

        page2.assert_async().await;
        assert_eq!(repos.len(), 3);
    }

    #[tokio::test]
    async fn test_self_user_match_ignores_case() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/user");
                then.status(200).json_body(json!({ "id": 1, "login": "jdoe" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/user/repos");
                then.status(200)
                    .json_body(json!([repo_json("notes", "JDoe"), repo_json("infra", "acme")]));
            })
            .await;

        let repos = adapter(&server, Arc::new(RecordingProgress::default()))
            .get_user_repos("JDOE")
            .await
            .unwrap();

        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["notes"]);
    }
}
