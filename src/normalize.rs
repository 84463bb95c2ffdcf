//! Conversion of filtered raw records into clone targets.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::types::{CloneProtocol, RawRepo, Repo};

/// Branch used when neither an override nor a forge default is available,
/// and always for wikis.
pub const FALLBACK_BRANCH: &str = "master";

const HTTPS_PREFIX: &str = "https://";
const GIT_SUFFIX: &str = ".git";
const WIKI_SUFFIX: &str = ".wiki.git";

/// Builds [`Repo`] clone targets from raw records
#[derive(Clone, PartialEq, Eq)]
pub struct Normalizer {
    protocol: CloneProtocol,
    token: String,
    branch_override: Option<String>,
    clone_wiki: bool,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("protocol", &self.protocol)
            .field("branch_override", &self.branch_override)
            .field("clone_wiki", &self.clone_wiki)
            .finish_non_exhaustive()
    }
}

impl Normalizer {
    pub fn new(protocol: CloneProtocol, token: impl Into<String>) -> Self {
        Self {
            protocol,
            token: token.into(),
            branch_override: None,
            clone_wiki: false,
        }
    }

    /// Check out `branch` instead of each repository's default branch.
    /// Blank values are ignored.
    pub fn with_branch_override(mut self, branch: Option<String>) -> Self {
        self.branch_override = branch.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn with_wiki(mut self, clone_wiki: bool) -> Self {
        self.clone_wiki = clone_wiki;
        self
    }

    /// Clone targets for one record: the repository itself, followed by its
    /// wiki when wiki cloning is on and the forge reports one.
    pub fn normalize(&self, raw: &RawRepo) -> DiscoveryResult<Vec<Repo>> {
        let branch = self.resolve_branch(raw);

        let repo = match self.protocol {
            CloneProtocol::Https => {
                let clone_url = splice_token(&raw.name, &raw.https_clone_url, &self.token)?;
                Repo::new(&raw.name, &raw.https_clone_url, clone_url, branch)
            }
            CloneProtocol::Ssh => {
                if raw.ssh_url.trim().is_empty() {
                    return Err(malformed(&raw.name, &raw.ssh_url));
                }
                Repo::new(&raw.name, &raw.ssh_url, &raw.ssh_url, branch)
            }
        };

        if !(self.clone_wiki && raw.has_wiki) {
            return Ok(vec![repo]);
        }

        let wiki = Repo::wiki(
            wiki_url(&raw.name, repo.url())?,
            wiki_url(&raw.name, repo.clone_url())?,
            FALLBACK_BRANCH,
        );
        Ok(vec![repo, wiki])
    }

    /// Normalize every record in order; the first malformed record aborts.
    pub fn normalize_all<'a, I>(&self, raws: I) -> DiscoveryResult<Vec<Repo>>
    where
        I: IntoIterator<Item = &'a RawRepo>,
    {
        let mut repos = Vec::new();
        for raw in raws {
            repos.extend(self.normalize(raw)?);
        }
        Ok(repos)
    }

    fn resolve_branch(&self, raw: &RawRepo) -> String {
        if let Some(branch) = &self.branch_override {
            return branch.clone();
        }
        match raw.default_branch.as_deref() {
            Some(branch) if !branch.is_empty() => branch.to_string(),
            _ => FALLBACK_BRANCH.to_string(),
        }
    }
}

fn malformed(repo: &str, url: &str) -> DiscoveryError {
    DiscoveryError::MalformedUpstreamUrl {
        repo: repo.to_string(),
        url: url.to_string(),
    }
}

/// `https://host/path` -> `https://<token>@host/path`
fn splice_token(repo: &str, url: &str, token: &str) -> DiscoveryResult<String> {
    let rest = url
        .strip_prefix(HTTPS_PREFIX)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| malformed(repo, url))?;
    Ok(format!("{HTTPS_PREFIX}{token}@{rest}"))
}

fn wiki_url(repo: &str, url: &str) -> DiscoveryResult<String> {
    url.strip_suffix(GIT_SUFFIX)
        .map(|base| format!("{base}{WIKI_SUFFIX}"))
        .ok_or_else(|| malformed(repo, url))
}
