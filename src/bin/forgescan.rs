use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use forgescan::{ClientRegistry, CloneProtocol, Discovery, DiscoveryConfig, Target, TracingProgress};

/// CLI arguments for forgescan
#[derive(Parser, Debug)]
#[command(name = "forgescan")]
#[command(version)]
#[command(about = "List the clone targets of an organization or user on a git forge")]
struct Args {
    /// What to enumerate: org:<name> or user:<name>
    target: Target,

    /// Config file (defaults to <config dir>/forgescan/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forge kind: github, gitlab, gitea or bitbucket
    #[arg(long)]
    provider: Option<String>,

    /// Base URL of a self-hosted instance
    #[arg(long)]
    base_url: Option<String>,

    /// Clone protocol: https or ssh
    #[arg(long)]
    protocol: Option<CloneProtocol>,

    /// Check out this branch instead of each repository's default
    #[arg(long)]
    branch: Option<String>,

    /// Skip archived repositories
    #[arg(long)]
    skip_archived: bool,

    /// Skip forks
    #[arg(long)]
    skip_forks: bool,

    /// Only keep repositories with this topic (repeatable)
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Also emit wiki clone targets
    #[arg(long)]
    wiki: bool,
}

impl Args {
    /// Flags win over file and environment settings
    fn apply_to(&self, config: &mut DiscoveryConfig) {
        if let Some(provider) = &self.provider {
            config.provider_kind = provider.trim().to_lowercase();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(protocol) = self.protocol {
            config.clone_protocol = protocol;
        }
        if let Some(branch) = &self.branch {
            config.branch_override = Some(branch.clone());
        }
        if !self.topics.is_empty() {
            config.topic_allow_list = self.topics.clone();
        }
        config.skip_archived |= self.skip_archived;
        config.skip_forks |= self.skip_forks;
        config.clone_wiki |= self.wiki;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries one JSON object per clone target
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,forgescan=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting forgescan at {}", chrono::Utc::now());

    let mut config = DiscoveryConfig::load_from(args.config.as_deref())
        .await
        .with_context(|| match &args.config {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load the default config file".to_string(),
        })?;
    config.apply_env()?;
    args.apply_to(&mut config);
    tracing::debug!(?config, "effective configuration");

    let registry = ClientRegistry::with_builtin_providers();
    let client = registry.construct_client(
        &config.provider_kind,
        &config.client_config(Arc::new(TracingProgress)),
    )?;

    let discovery = Discovery::new(client.as_ref(), config.filter_policy(), config.normalizer());
    let repos = discovery.run(&args.target).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for repo in &repos {
        writeln!(out, "{}", serde_json::to_string(repo)?)?;
    }

    tracing::info!(
        "{} clone target(s) for {} on {}",
        repos.len(),
        args.target,
        config.provider_kind
    );
    Ok(())
}
