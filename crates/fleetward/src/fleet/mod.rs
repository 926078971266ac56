//! Fleet-wide runs: list, filter, then transition each repository in turn.
//!
//! # Module Structure
//!
//! - [`types`] - Listing, selection and run options
//! - [`lister`] - Paged organization listing with name filters
//! - [`eligibility`] - Release-gated eligibility probe
//! - [`runner`] - Sequential runner with pacing and stop support
//! - [`report`] - Per-repository results and run summary
//! - [`progress`] - Progress events for the CLI
//!
//! ```ignore
//! use fleetward::fleet::{FleetRunner, ListOptions, RunOptions, Target};
//!
//! let target = Target::Fleet {
//!     org: "splunk-soar-connectors".into(),
//!     options: ListOptions::default().with_exclude(r"^splunk-soar-connectors/\.github$")?,
//! };
//! let report = FleetRunner::new(engine)
//!     .run(&RunOptions::new(MigrationAction::Freeze, target))
//!     .await?;
//! println!("{}", report.summary());
//! ```

pub mod eligibility;
mod error;
pub mod lister;
pub mod progress;
pub mod report;
pub mod runner;
pub mod types;

pub use eligibility::{Eligibility, IneligibleReason, branch_exists, is_eligible, probe};
pub use error::{FleetError, Result};
pub use lister::{RepoPages, list_repositories};
pub use progress::{FleetProgress, ProgressCallback, emit};
pub use report::{FleetReport, ItemResult, ItemStatus, RunCounts};
pub use runner::{FleetRunner, StopSignal};
pub use types::{
    DEFAULT_DELAY, DEFAULT_MAX_PAGES, DEFAULT_ORG, DEFAULT_PER_PAGE, ListOptions, MAX_PER_PAGE,
    RunOptions, SelectionMode, Target, compile_pattern, default_exclude_pattern,
};
