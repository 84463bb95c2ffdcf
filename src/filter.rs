//! Filter policy applied to raw records before normalization.

use std::collections::BTreeSet;

use crate::types::RawRepo;

/// Exclusion rules for raw records. A record is kept only if it passes
/// every active rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    skip_archived: bool,
    skip_forks: bool,
    /// Lowercased; empty disables topic filtering
    topic_allow_list: BTreeSet<String>,
}

impl FilterPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_archived(mut self, skip: bool) -> Self {
        self.skip_archived = skip;
        self
    }

    pub fn with_skip_forks(mut self, skip: bool) -> Self {
        self.skip_forks = skip;
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.topic_allow_list = topics
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Whether `repo` passes every active rule
    pub fn accepts(&self, repo: &RawRepo) -> bool {
        if self.skip_archived && repo.archived {
            return false;
        }
        if self.skip_forks && repo.fork {
            return false;
        }
        self.has_matching_topic(repo)
    }

    fn has_matching_topic(&self, repo: &RawRepo) -> bool {
        if self.topic_allow_list.is_empty() {
            return true;
        }
        repo.topics
            .iter()
            .any(|topic| self.topic_allow_list.contains(&topic.to_lowercase()))
    }

    /// Keep the accepted records, in input order
    pub fn apply<'a>(&self, repos: &'a [RawRepo]) -> Vec<&'a RawRepo> {
        repos.iter().filter(|repo| self.accepts(repo)).collect()
    }
}
