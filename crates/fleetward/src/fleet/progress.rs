//! Progress events emitted while a fleet run is in flight.
//!
//! The runner reports through a callback so the CLI can render a progress bar
//! on a terminal and plain log lines everywhere else.

use std::time::Duration;

use crate::engine::MigrationAction;
use crate::platform::RepoId;

use super::eligibility::IneligibleReason;
use super::report::ItemStatus;

/// Progress events emitted during a fleet run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FleetProgress {
    /// Starting to list an organization's repositories.
    FetchingRepos {
        /// The organization being listed.
        org: String,
        /// Upper bound on pages requested.
        max_pages: u32,
    },

    /// Fetched one page of repositories.
    FetchedPage {
        org: String,
        /// Page number (1-indexed).
        page: u32,
        /// Repositories on the page as returned by the API.
        count: usize,
        /// Repositories on the page that survived the name filters.
        kept: usize,
        /// Running total of kept repositories.
        total_so_far: usize,
    },

    /// Listing finished.
    FetchComplete { org: String, total: usize },

    /// About to process the candidate list.
    RunStarted {
        action: MigrationAction,
        total: usize,
        dry_run: bool,
    },

    /// Starting work on one repository.
    ProcessingRepo {
        repo: RepoId,
        /// Position in the candidate list (1-indexed).
        index: usize,
        total: usize,
    },

    /// A repository was filtered out by the eligibility probe.
    Ineligible {
        repo: RepoId,
        reason: IneligibleReason,
    },

    /// Finished one repository.
    RepoFinished {
        repo: RepoId,
        status: ItemStatus,
        /// Skip reason or error text.
        detail: Option<String>,
    },

    /// Waiting between repositories.
    Pausing { delay: Duration },

    /// A stop was requested; the remaining repositories were not attempted.
    Interrupted { remaining: usize },

    /// The run is over.
    RunComplete {
        attempted: usize,
        succeeded: usize,
        failed: usize,
    },
}

/// Callback for progress updates during a fleet run.
pub type ProgressCallback = Box<dyn Fn(FleetProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: FleetProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_without_callback_is_noop() {
        emit(
            None,
            FleetProgress::FetchComplete {
                org: "acme".into(),
                total: 3,
            },
        );
    }

    #[test]
    fn emit_invokes_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: ProgressCallback = Box::new(move |event| {
            if let FleetProgress::Pausing { delay } = event {
                assert_eq!(delay, Duration::from_millis(250));
            }
            seen.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            FleetProgress::Pausing {
                delay: Duration::from_millis(250),
            },
        );
        emit(
            Some(&callback),
            FleetProgress::Interrupted { remaining: 2 },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
