//! Status notices for long-running enumerations.
//!
//! Adapters never print. They hand human-readable notices to a
//! [`ProgressReporter`], which the caller wires to whatever output it owns.

/// Receiver for human-readable status notices
pub trait ProgressReporter: Send + Sync {
    fn notice(&self, message: &str);
}

/// Forwards notices to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn notice(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Sent every [`LARGE_ORG_NOTICE_INTERVAL`] pages of an org listing
pub const LARGE_ORG_NOTICE: &str = "Everything is okay, the org just has a lot of repos...";

pub const LARGE_ORG_NOTICE_INTERVAL: u32 = 12;

/// Sent when a user enumerates their own account
pub const SELF_CLONE_NOTICE: &str = "Cloning all your public/private repos. This process may take a bit longer than other clones, please be patient...";
