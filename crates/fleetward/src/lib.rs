//! Fleetward - fleet-wide branch and protection migrations for GitHub
//! organizations.
//!
//! The library enumerates an organization's repositories, decides which ones
//! take part in a run, and moves each one to the branch/protection state an
//! action describes:
//!
//! - `freeze` locks `next` and `main` during a release event
//! - `thaw` returns `main` to day-to-day protection
//! - `migrate-next-to-main` promotes `next` to `main`, keeping a snapshot
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fleetward::{FleetRunner, GitHubClient, MigrationAction, RunOptions, Target, TransitionEngine};
//! use fleetward::platform::AdaptiveRateLimiter;
//!
//! let client = GitHubClient::new(&token, Some(AdaptiveRateLimiter::new(10)), fleetward::github::DEFAULT_TIMEOUT)?;
//! let engine = TransitionEngine::new(Arc::new(client)).with_dry_run(true);
//! let target = Target::Single("splunk-soar-connectors/testrepo".parse()?);
//! let report = FleetRunner::new(engine)
//!     .run(&RunOptions::new(MigrationAction::Freeze, target))
//!     .await?;
//! ```

pub mod engine;
pub mod fleet;
pub mod github;
pub mod http;
pub mod platform;
pub mod protection;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{MigrationAction, MigrationStrategy, Outcome, Step, TransitionEngine};
pub use fleet::{
    FleetError, FleetProgress, FleetReport, FleetRunner, ItemResult, ItemStatus, ListOptions,
    RunOptions, SelectionMode, Target,
};
pub use github::{GitHubClient, GitHubError};
pub use platform::{HostingApi, PlatformError, RepoId, RepoInfo};
pub use protection::{ProtectionRule, ProtectionState};
