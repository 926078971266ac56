//! Per-repository results and the run summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::engine::{MigrationAction, MigrationStrategy, Outcome, Step};
use crate::platform::RepoId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Applied,
    Skipped,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    #[serde(serialize_with = "serialize_display")]
    pub repo: RepoId,
    pub action: MigrationAction,
    pub status: ItemStatus,
    /// Skip reason or error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub steps: Vec<Step>,
    pub finished_at: DateTime<Utc>,
}

impl ItemResult {
    pub fn from_outcome(repo: RepoId, action: MigrationAction, outcome: Outcome) -> Self {
        let (status, reason, steps) = match outcome {
            Outcome::Applied { steps } => (ItemStatus::Applied, None, steps),
            Outcome::Skipped { reason } => (ItemStatus::Skipped, Some(reason), Vec::new()),
            Outcome::Failed { error, steps } => (ItemStatus::Failed, Some(error), steps),
        };
        Self {
            repo,
            action,
            status,
            reason,
            steps,
            finished_at: Utc::now(),
        }
    }

    pub fn skipped(repo: RepoId, action: MigrationAction, reason: impl Into<String>) -> Self {
        Self::from_outcome(repo, action, Outcome::skipped(reason))
    }

    pub fn failed(repo: RepoId, action: MigrationAction, error: impl Into<String>) -> Self {
        Self::from_outcome(
            repo,
            action,
            Outcome::Failed {
                error: error.into(),
                steps: Vec::new(),
            },
        )
    }
}

/// Tallies over a run's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub attempted: usize,
    /// Applied plus skipped.
    pub succeeded: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Everything a fleet run did.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub action: MigrationAction,
    pub strategy: MigrationStrategy,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// A stop was requested before every candidate was attempted.
    pub interrupted: bool,
    pub counts: RunCounts,
    pub items: Vec<ItemResult>,
}

impl FleetReport {
    pub fn new(action: MigrationAction, strategy: MigrationStrategy, dry_run: bool) -> Self {
        Self {
            action,
            strategy,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            interrupted: false,
            counts: RunCounts::default(),
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, item: ItemResult) {
        self.counts.attempted += 1;
        match item.status {
            ItemStatus::Applied => {
                self.counts.applied += 1;
                self.counts.succeeded += 1;
            }
            ItemStatus::Skipped => {
                self.counts.skipped += 1;
                self.counts.succeeded += 1;
            }
            ItemStatus::Failed => self.counts.failed += 1,
        }
        self.items.push(item);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Failed)
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} attempted, {} applied, {} skipped, {} failed",
            self.action,
            self.counts.attempted,
            self.counts.applied,
            self.counts.skipped,
            self.counts.failed
        );
        if self.dry_run {
            line.push_str(" (dry run)");
        }
        if self.interrupted {
            line.push_str(" (interrupted)");
        }
        line
    }
}
