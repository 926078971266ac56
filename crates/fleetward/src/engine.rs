//! State transitions for a single repository.
//!
//! [`TransitionEngine::apply_action`] reads the repository's current branches
//! and protection, then performs only the mutations needed to reach the
//! action's target state. Every mutation is preceded by an existence check,
//! so applying an action twice leaves the same state as applying it once.
//!
//! # Example
//!
//! ```ignore
//! use fleetward::engine::{MigrationAction, MigrationStrategy, TransitionEngine};
//!
//! let engine = TransitionEngine::new(api)
//!     .with_strategy(MigrationStrategy::ArchiveAndRecreate)
//!     .with_dry_run(true);
//! let outcome = engine.apply_action(MigrationAction::Freeze, &repo).await;
//! ```

mod freeze;
mod migrate;
mod recorder;
mod thaw;
mod types;

use std::sync::Arc;

pub use types::{
    ARCHIVE_SUFFIX, MAIN_BRANCH, MigrationAction, MigrationStrategy, NEXT_BRANCH, Outcome,
    ParseNameError, Step, archive_branch, rule_label,
};

use crate::platform::{HostingApi, RepoId};
use recorder::StepRecorder;
use types::Completion;

/// Applies [`MigrationAction`]s to repositories through a [`HostingApi`].
#[derive(Clone)]
pub struct TransitionEngine {
    api: Arc<dyn HostingApi>,
    strategy: MigrationStrategy,
    dry_run: bool,
}

impl TransitionEngine {
    pub fn new(api: Arc<dyn HostingApi>) -> Self {
        Self {
            api,
            strategy: MigrationStrategy::default(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: MigrationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Plan steps from the observed state without mutating anything.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn strategy(&self) -> MigrationStrategy {
        self.strategy
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn api(&self) -> &Arc<dyn HostingApi> {
        &self.api
    }

    /// Bring `repo` to the state `action` describes.
    ///
    /// Never returns an error: API failures become [`Outcome::Failed`]
    /// carrying the steps that did succeed.
    pub async fn apply_action(&self, action: MigrationAction, repo: &RepoId) -> Outcome {
        let mut rec = StepRecorder::new(self.api.as_ref(), repo, self.dry_run);

        let result = match action {
            MigrationAction::Freeze => freeze::freeze(&mut rec).await,
            MigrationAction::Thaw => thaw::thaw(&mut rec).await,
            MigrationAction::MigrateNextToMain => match self.strategy {
                MigrationStrategy::ArchiveAndRecreate => {
                    migrate::archive_and_recreate(&mut rec).await
                }
                MigrationStrategy::PromoteInPlace => migrate::promote_in_place(&mut rec).await,
            },
        };

        let steps = rec.into_steps();
        match result {
            Ok(Completion::Done) => Outcome::Applied { steps },
            Ok(Completion::NothingToDo(reason)) => {
                tracing::info!(repo = %repo, %action, %reason, "Skipped");
                Outcome::Skipped { reason }
            }
            Err(e) => {
                tracing::error!(
                    repo = %repo,
                    %action,
                    completed_steps = steps.len(),
                    error = %e,
                    "Action failed"
                );
                Outcome::Failed {
                    error: e.to_string(),
                    steps,
                }
            }
        }
    }
}
