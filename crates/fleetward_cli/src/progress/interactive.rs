use std::sync::Mutex;
use std::time::Duration;

use console::style;
use fleetward::fleet::{FleetProgress, ItemStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[derive(Default)]
struct ProgressState {
    /// Spinner for the organization listing.
    fetch_bar: Option<ProgressBar>,
    /// One tick per repository processed.
    run_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
///
/// Per-repository results are printed above the bars so they stay on screen
/// after the run finishes.
pub(crate) struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn println(&self, line: String) {
        if self.multi.println(line).is_err() {
            tracing::debug!("Terminal unavailable for progress output");
        }
    }

    pub fn handle(&self, event: FleetProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            FleetProgress::FetchingRepos { org, max_pages } => {
                let pb = self.multi.add(ProgressBar::new(u64::from(max_pages)));
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb.set_prefix(format!("{:12}", "Listing"));
                pb.set_message(format!("{org}..."));
                state.fetch_bar = Some(pb);
            }

            FleetProgress::FetchedPage {
                org,
                page,
                total_so_far,
                ..
            } => {
                if let Some(ref pb) = state.fetch_bar {
                    pb.set_position(u64::from(page));
                    pb.set_message(format!("{org}: page {page} ({total_so_far} repos)"));
                }
            }

            FleetProgress::FetchComplete { org, total } => {
                if let Some(pb) = state.fetch_bar.take() {
                    pb.set_style(Self::done_style());
                    pb.finish_with_message(format!("{org}: {total} repos"));
                }
            }

            FleetProgress::RunStarted {
                action,
                total,
                dry_run,
            } => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                let label = if dry_run {
                    format!("{action} (dry)")
                } else {
                    action.to_string()
                };
                pb.set_prefix(format!("{label:12}"));
                state.run_bar = Some(pb);
            }

            FleetProgress::ProcessingRepo { repo, .. } => {
                if let Some(ref pb) = state.run_bar {
                    pb.set_message(repo.to_string());
                }
            }

            FleetProgress::Ineligible { repo, reason } => {
                self.println(format!(
                    "{} {repo}: {reason}",
                    style("ineligible").dim()
                ));
            }

            FleetProgress::RepoFinished {
                repo,
                status,
                detail,
            } => {
                let label = match status {
                    ItemStatus::Applied => style("applied").green(),
                    ItemStatus::Skipped => style("skipped").yellow(),
                    ItemStatus::Failed => style("failed").red(),
                };
                let line = match detail {
                    Some(detail) => format!("{label:>10} {repo}: {detail}"),
                    None => format!("{label:>10} {repo}"),
                };
                self.println(line);
                if let Some(ref pb) = state.run_bar {
                    pb.inc(1);
                }
            }

            FleetProgress::Pausing { delay } => {
                if let Some(ref pb) = state.run_bar {
                    pb.set_message(format!("waiting {}ms", delay.as_millis()));
                }
            }

            FleetProgress::Interrupted { remaining } => {
                if let Some(pb) = state.run_bar.take() {
                    pb.abandon_with_message(format!("stopped, {remaining} not attempted"));
                }
            }

            FleetProgress::RunComplete {
                attempted,
                succeeded,
                failed,
            } => {
                if let Some(pb) = state.run_bar.take() {
                    pb.finish_with_message(format!(
                        "{attempted} attempted, {succeeded} ok, {failed} failed"
                    ));
                }
            }

            _ => {}
        }
    }

    /// Finish any bars still running.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = state.fetch_bar.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = state.run_bar.take() {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg}")
            .expect("Invalid template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("=> ")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use fleetward::{MigrationAction, RepoId};

    use super::*;

    #[test]
    fn styles_compile() {
        let _ = InteractiveReporter::spinner_style();
        let _ = InteractiveReporter::done_style();
        let _ = InteractiveReporter::bar_style();
    }

    #[test]
    fn full_event_sequence_leaves_no_bars() {
        let reporter = InteractiveReporter::new();
        let repo = RepoId::new("acme", "widget");

        reporter.handle(FleetProgress::FetchingRepos {
            org: "acme".into(),
            max_pages: 2,
        });
        reporter.handle(FleetProgress::FetchedPage {
            org: "acme".into(),
            page: 1,
            count: 1,
            kept: 1,
            total_so_far: 1,
        });
        reporter.handle(FleetProgress::FetchComplete {
            org: "acme".into(),
            total: 1,
        });
        reporter.handle(FleetProgress::RunStarted {
            action: MigrationAction::Freeze,
            total: 1,
            dry_run: true,
        });
        reporter.handle(FleetProgress::ProcessingRepo {
            repo: repo.clone(),
            index: 1,
            total: 1,
        });
        reporter.handle(FleetProgress::RepoFinished {
            repo,
            status: ItemStatus::Applied,
            detail: None,
        });
        reporter.handle(FleetProgress::RunComplete {
            attempted: 1,
            succeeded: 1,
            failed: 0,
        });

        let state = reporter.state.lock().unwrap();
        assert!(state.fetch_bar.is_none());
        assert!(state.run_bar.is_none());
    }
}
