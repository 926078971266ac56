use fleetward::fleet::{FleetProgress, ItemStatus};

/// Logging reporter using tracing for structured output.
pub(crate) struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: FleetProgress) {
        match event {
            FleetProgress::FetchingRepos { org, max_pages } => {
                tracing::info!(org = %org, max_pages, "Listing repositories");
            }

            FleetProgress::FetchedPage {
                org,
                page,
                count,
                kept,
                total_so_far,
            } => {
                tracing::debug!(org = %org, page, count, kept, total_so_far, "Fetched page");
            }

            FleetProgress::FetchComplete { org, total } => {
                tracing::info!(org = %org, total, "Listing complete");
            }

            FleetProgress::RunStarted {
                action,
                total,
                dry_run,
            } => {
                tracing::info!(action = %action, total, dry_run, "Run started");
            }

            FleetProgress::ProcessingRepo { repo, index, total } => {
                tracing::info!(repo = %repo, index, total, "Processing repository");
            }

            FleetProgress::Ineligible { repo, reason } => {
                tracing::info!(repo = %repo, reason = %reason, "Not eligible");
            }

            FleetProgress::RepoFinished {
                repo,
                status,
                detail,
            } => match status {
                ItemStatus::Applied => tracing::info!(repo = %repo, "Applied"),
                ItemStatus::Skipped => {
                    tracing::info!(repo = %repo, reason = ?detail, "Skipped");
                }
                ItemStatus::Failed => {
                    tracing::error!(repo = %repo, error = ?detail, "Failed");
                }
            },

            FleetProgress::Pausing { delay } => {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Pausing");
            }

            FleetProgress::Interrupted { remaining } => {
                tracing::warn!(remaining, "Run interrupted");
            }

            FleetProgress::RunComplete {
                attempted,
                succeeded,
                failed,
            } => {
                tracing::info!(attempted, succeeded, failed, "Run complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
