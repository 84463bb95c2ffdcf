//! Provider registry: maps a provider kind to a client constructor.
//!
//! The registry is an ordinary value owned by the caller. Build one with
//! [`ClientRegistry::with_builtin_providers`] and register extra kinds as
//! needed before handing it to whatever resolves providers from config.

use std::collections::HashMap;

use crate::adapters::{
    BitbucketAdapter, ClientConfig, ForgePort, FromClientConfig, GitHubAdapter, GitLabAdapter,
    GiteaAdapter,
};
use crate::error::{DiscoveryError, DiscoveryResult};

/// Builds an authenticated client for one provider kind
pub type ClientConstructor = fn(&ClientConfig) -> DiscoveryResult<Box<dyn ForgePort>>;

fn construct<A: FromClientConfig>(config: &ClientConfig) -> DiscoveryResult<Box<dyn ForgePort>> {
    Ok(Box::new(A::from_config(config)?))
}

/// Lookup table from provider kind to client constructor
#[derive(Clone, Default)]
pub struct ClientRegistry {
    constructors: HashMap<String, ClientConstructor>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ClientRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with github, gitlab, gitea and bitbucket registered
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        registry.register_adapter::<GitHubAdapter>();
        registry.register_adapter::<GitLabAdapter>();
        registry.register_adapter::<GiteaAdapter>();
        registry.register_adapter::<BitbucketAdapter>();
        registry
    }

    /// Register `constructor` under `kind` (case-insensitive).
    ///
    /// A later registration replaces an earlier one for the same kind; the
    /// replaced constructor is returned.
    pub fn register(
        &mut self,
        kind: impl AsRef<str>,
        constructor: ClientConstructor,
    ) -> Option<ClientConstructor> {
        let key = normalize_kind(kind.as_ref());
        let replaced = self.constructors.insert(key.clone(), constructor);
        if replaced.is_some() {
            tracing::debug!(kind = %key, "replaced registered provider");
        }
        replaced
    }

    /// Register an adapter type under its own [`FromClientConfig::KIND`]
    pub fn register_adapter<A: FromClientConfig>(&mut self) -> Option<ClientConstructor> {
        self.register(A::KIND, construct::<A>)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(&normalize_kind(kind))
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Build a client for `kind`. Fails with `UnknownProviderKind` when
    /// nothing is registered under it; construction errors pass through.
    pub fn construct_client(
        &self,
        kind: &str,
        config: &ClientConfig,
    ) -> DiscoveryResult<Box<dyn ForgePort>> {
        let constructor = self
            .constructors
            .get(&normalize_kind(kind))
            .ok_or_else(|| DiscoveryError::UnknownProviderKind(kind.to_string()))?;
        constructor(config)
    }
}

fn normalize_kind(kind: &str) -> String {
    kind.trim().to_lowercase()
}
