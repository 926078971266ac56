//! Sequential fleet runner.

use std::sync::Arc;

use crate::engine::TransitionEngine;
use crate::platform::RepoId;

use super::eligibility::{Eligibility, probe};
use super::error::{FleetError, Result};
use super::lister::list_repositories;
use super::progress::{FleetProgress, ProgressCallback, emit};
use super::report::{FleetReport, ItemResult, ItemStatus};
use super::types::{RunOptions, Target};

/// Polled between repositories; `true` stops the run.
pub type StopSignal = Arc<dyn Fn() -> bool + Send + Sync>;

/// Applies one action across a set of repositories, one at a time.
///
/// A failure on one repository is recorded and the run moves on. Only a
/// failure to build the candidate list aborts the run.
pub struct FleetRunner {
    engine: TransitionEngine,
    on_progress: Option<ProgressCallback>,
    stop: Option<StopSignal>,
}

impl FleetRunner {
    pub fn new(engine: TransitionEngine) -> Self {
        Self {
            engine,
            on_progress: None,
            stop: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| stop())
    }

    /// Resolve the target to the list of repositories to process.
    pub async fn candidates(&self, target: &Target) -> Result<Vec<RepoId>> {
        let api = self.engine.api().as_ref();
        match target {
            Target::Fleet { org, options } => {
                let repos = list_repositories(api, org, options, self.on_progress.as_ref()).await?;
                Ok(repos.into_iter().map(|r| r.id).collect())
            }
            Target::Single(repo) => {
                let info = api.get_repo(repo).await.map_err(|source| FleetError::Target {
                    repo: repo.clone(),
                    source,
                })?;
                Ok(vec![info.id])
            }
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<FleetReport> {
        let on_progress = self.on_progress.as_ref();
        let mut report = FleetReport::new(
            options.action,
            self.engine.strategy(),
            self.engine.is_dry_run(),
        );

        let candidates = self.candidates(&options.target).await?;
        let total = candidates.len();
        tracing::info!(
            action = %options.action,
            strategy = %self.engine.strategy(),
            selection = %options.selection,
            dry_run = self.engine.is_dry_run(),
            total,
            "Starting fleet run"
        );
        emit(
            on_progress,
            FleetProgress::RunStarted {
                action: options.action,
                total,
                dry_run: self.engine.is_dry_run(),
            },
        );

        for (i, repo) in candidates.into_iter().enumerate() {
            if i > 0 && !options.delay.is_zero() {
                emit(
                    on_progress,
                    FleetProgress::Pausing {
                        delay: options.delay,
                    },
                );
                tokio::time::sleep(options.delay).await;
            }
            if self.stop_requested() {
                let remaining = total - i;
                tracing::warn!(remaining, "Stop requested, ending run early");
                emit(on_progress, FleetProgress::Interrupted { remaining });
                report.interrupted = true;
                break;
            }

            emit(
                on_progress,
                FleetProgress::ProcessingRepo {
                    repo: repo.clone(),
                    index: i + 1,
                    total,
                },
            );
            let item = self.process(&repo, options).await;
            emit(
                on_progress,
                FleetProgress::RepoFinished {
                    repo,
                    status: item.status,
                    detail: item.reason.clone(),
                },
            );
            report.record(item);
        }

        report.finish();
        tracing::info!("{}", report.summary());
        emit(
            on_progress,
            FleetProgress::RunComplete {
                attempted: report.counts.attempted,
                succeeded: report.counts.succeeded,
                failed: report.counts.failed,
            },
        );
        Ok(report)
    }

    async fn process(&self, repo: &RepoId, options: &RunOptions) -> ItemResult {
        let api = self.engine.api().as_ref();
        match probe(api, repo, options.selection).await {
            Ok(Eligibility::Eligible) => {}
            Ok(Eligibility::Ineligible(reason)) => {
                tracing::info!(repo = %repo, %reason, "Not eligible");
                emit(
                    self.on_progress.as_ref(),
                    FleetProgress::Ineligible {
                        repo: repo.clone(),
                        reason,
                    },
                );
                return ItemResult::skipped(repo.clone(), options.action, reason.to_string());
            }
            Err(e) => {
                tracing::error!(repo = %repo, error = %e, "Eligibility probe failed");
                return ItemResult::failed(
                    repo.clone(),
                    options.action,
                    format!("eligibility probe failed: {e}"),
                );
            }
        }

        let outcome = self.engine.apply_action(options.action, repo).await;
        let item = ItemResult::from_outcome(repo.clone(), options.action, outcome);
        if item.status == ItemStatus::Failed {
            tracing::warn!(repo = %repo, "Continuing after failure");
        }
        item
    }
}
