//! Repository records: the uniform raw record every adapter produces, and
//! the clone target handed to the cloning subsystem.

use serde::{Deserialize, Serialize};

use super::OwnerType;

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

/// A repository as listed by a forge, decoded into one shape for all forges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRepo {
    /// Repository name (without owner prefix)
    pub name: String,

    /// HTTPS clone URL, without credentials
    pub https_clone_url: String,

    /// SSH clone URL
    pub ssh_url: String,

    /// Default branch as reported by the forge (may be missing on empty repos)
    pub default_branch: Option<String>,

    pub archived: bool,

    pub fork: bool,

    pub topics: Vec<String>,

    pub has_wiki: bool,

    /// Account type of the owner, when the forge reports it
    pub owner_type: Option<OwnerType>,
}

impl RawRepo {
    /// Create a record with the required identity fields
    pub fn new(
        name: impl Into<String>,
        https_clone_url: impl Into<String>,
        ssh_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            https_clone_url: https_clone_url.into(),
            ssh_url: ssh_url.into(),
            default_branch: None,
            archived: false,
            fork: false,
            topics: Vec::new(),
            has_wiki: false,
            owner_type: None,
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    pub fn with_fork(mut self, fork: bool) -> Self {
        self.fork = fork;
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wiki(mut self, has_wiki: bool) -> Self {
        self.has_wiki = has_wiki;
        self
    }

    pub fn with_owner_type(mut self, owner_type: OwnerType) -> Self {
        self.owner_type = Some(owner_type);
        self
    }

    /// Whether the forge reported this repository as owned by a user account
    pub fn is_user_owned(&self) -> bool {
        self.owner_type == Some(OwnerType::User)
    }
}

/// A clone target: where to clone from and which branch to check out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    name: String,
    url: String,
    clone_url: String,
    clone_branch: String,
    #[serde(default, skip_serializing_if = "is_false")]
    is_wiki: bool,
}

impl Repo {
    pub(crate) fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        clone_url: impl Into<String>,
        clone_branch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            clone_url: clone_url.into(),
            clone_branch: clone_branch.into(),
            is_wiki: false,
        }
    }

    pub(crate) fn wiki(
        url: impl Into<String>,
        clone_url: impl Into<String>,
        clone_branch: impl Into<String>,
    ) -> Self {
        Self {
            name: String::new(),
            url: url.into(),
            clone_url: clone_url.into(),
            clone_branch: clone_branch.into(),
            is_wiki: true,
        }
    }

    /// Repository name (empty for wiki entries)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical URL without credentials
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL used for cloning; carries the access token for HTTPS
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    pub fn clone_branch(&self) -> &str {
        &self.clone_branch
    }

    pub fn is_wiki(&self) -> bool {
        self.is_wiki
    }
}
