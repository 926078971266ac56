//! Actions, strategies, steps and outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protection::{ProtectionRule, ProtectionState};

/// The integration branch.
pub const MAIN_BRANCH: &str = "main";

/// The development branch promoted by `migrate-next-to-main`.
pub const NEXT_BRANCH: &str = "next";

/// Suffix of snapshot branches.
pub const ARCHIVE_SUFFIX: &str = "-archive";

/// Snapshot branch name for `branch` (`main` -> `main-archive`).
#[must_use]
pub fn archive_branch(branch: &str) -> String {
    format!("{branch}{ARCHIVE_SUFFIX}")
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Normalize user input: trimmed, lowercase, `_` read as `-`.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

/// The state transition requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationAction {
    /// Lock `next` and `main` against merges.
    Freeze,
    /// Return `main` to day-to-day protection.
    Thaw,
    /// Make `next` the new `main`, keeping a snapshot of the old one.
    MigrateNextToMain,
}

impl MigrationAction {
    pub const ALL: [MigrationAction; 3] = [Self::Freeze, Self::Thaw, Self::MigrateNextToMain];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Thaw => "thaw",
            Self::MigrateNextToMain => "migrate-next-to-main",
        }
    }
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationAction {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "freeze" => Ok(Self::Freeze),
            "thaw" => Ok(Self::Thaw),
            "migrate-next-to-main" | "migrate" => Ok(Self::MigrateNextToMain),
            _ => Err(ParseNameError {
                kind: "action",
                value: s.to_string(),
                expected: "freeze, thaw, migrate-next-to-main",
            }),
        }
    }
}

/// How `migrate-next-to-main` reshapes the branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStrategy {
    /// Snapshot `main` as `main-archive`, then recreate `main` from `next`.
    #[default]
    ArchiveAndRecreate,
    /// Snapshot `next` as `main-archive`, unprotect `next`, point the
    /// default branch at `main`.
    PromoteInPlace,
}

impl MigrationStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArchiveAndRecreate => "archive-and-recreate",
            Self::PromoteInPlace => "promote-in-place",
        }
    }
}

impl fmt::Display for MigrationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationStrategy {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "archive-and-recreate" | "a" => Ok(Self::ArchiveAndRecreate),
            "promote-in-place" | "b" => Ok(Self::PromoteInPlace),
            _ => Err(ParseNameError {
                kind: "strategy",
                value: s.to_string(),
                expected: "archive-and-recreate, promote-in-place",
            }),
        }
    }
}

/// One mutation against the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    Protect { branch: String, rule: ProtectionRule },
    Unprotect { branch: String },
    CreateBranch { branch: String, from: String, sha: String },
    DeleteBranch { branch: String },
    SetDefaultBranch { branch: String },
}

/// Short name for a rule in logs and tables.
#[must_use]
pub fn rule_label(rule: &ProtectionRule) -> &'static str {
    if *rule == ProtectionRule::relaxed() {
        return "relaxed";
    }
    match ProtectionState::classify(Some(rule)) {
        ProtectionState::Frozen => "frozen",
        ProtectionState::Normal => "normal",
        _ => "custom",
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protect { branch, rule } => write!(f, "protect {branch} ({})", rule_label(rule)),
            Self::Unprotect { branch } => write!(f, "unprotect {branch}"),
            Self::CreateBranch { branch, from, sha } => {
                let short = sha.get(..7).unwrap_or(sha);
                write!(f, "create {branch} from {from}@{short}")
            }
            Self::DeleteBranch { branch } => write!(f, "delete {branch}"),
            Self::SetDefaultBranch { branch } => write!(f, "set default branch to {branch}"),
        }
    }
}

/// Result of applying one action to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran; `steps` lists the mutations made (or planned, in a
    /// dry run).
    Applied { steps: Vec<Step> },
    /// A precondition did not hold; nothing was changed.
    Skipped { reason: String },
    /// An API call failed part-way; `steps` lists what succeeded before it.
    Failed { error: String, steps: Vec<Step> },
}

impl Outcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::Applied { steps } | Self::Failed { steps, .. } => steps,
            Self::Skipped { .. } => &[],
        }
    }
}

/// What an action routine concluded once its API calls succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    Done,
    NothingToDo(String),
}

impl Completion {
    pub(crate) fn nothing_to_do(reason: impl Into<String>) -> Self {
        Self::NothingToDo(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_case_insensitively_with_either_separator() {
        for input in ["migrate-next-to-main", "MIGRATE_NEXT_TO_MAIN", " Migrate-Next_To-Main "] {
            assert_eq!(
                input.parse::<MigrationAction>(),
                Ok(MigrationAction::MigrateNextToMain),
                "{input:?}"
            );
        }
        assert_eq!("Freeze".parse::<MigrationAction>(), Ok(MigrationAction::Freeze));
        assert_eq!("thaw".parse::<MigrationAction>(), Ok(MigrationAction::Thaw));
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = "melt".parse::<MigrationAction>().unwrap_err();
        assert!(err.to_string().contains("melt"));
        assert!(err.to_string().contains("freeze"));
    }

    #[test]
    fn action_display_round_trips() {
        for action in MigrationAction::ALL {
            assert_eq!(action.to_string().parse::<MigrationAction>(), Ok(action));
        }
    }

    #[test]
    fn strategy_defaults_to_archive_and_recreate() {
        assert_eq!(MigrationStrategy::default(), MigrationStrategy::ArchiveAndRecreate);
        assert_eq!(
            "promote_in_place".parse::<MigrationStrategy>(),
            Ok(MigrationStrategy::PromoteInPlace)
        );
        assert!("rebase".parse::<MigrationStrategy>().is_err());
    }

    #[test]
    fn strategy_serde_uses_kebab_case() {
        let json = serde_json::to_string(&MigrationStrategy::PromoteInPlace).unwrap();
        assert_eq!(json, "\"promote-in-place\"");
        let parsed: MigrationStrategy = serde_json::from_str("\"archive-and-recreate\"").unwrap();
        assert_eq!(parsed, MigrationStrategy::ArchiveAndRecreate);
    }

    #[test]
    fn archive_branch_name() {
        assert_eq!(archive_branch(MAIN_BRANCH), "main-archive");
    }

    #[test]
    fn steps_render_for_logs() {
        let step = Step::CreateBranch {
            branch: "main".into(),
            from: "next".into(),
            sha: "0123456789abcdef".into(),
        };
        assert_eq!(step.to_string(), "create main from next@0123456");

        let step = Step::Protect {
            branch: "main-archive".into(),
            rule: ProtectionRule::relaxed(),
        };
        assert_eq!(step.to_string(), "protect main-archive (relaxed)");

        let step = Step::Protect {
            branch: "main-archive".into(),
            rule: ProtectionRule::normal().with_enforce_admins(true),
        };
        assert_eq!(step.to_string(), "protect main-archive (custom)");
    }

    #[test]
    fn steps_serialize_with_kind_tag() {
        let json = serde_json::to_value(Step::SetDefaultBranch {
            branch: "main".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "set-default-branch");
        assert_eq!(json["branch"], "main");
    }

    #[test]
    fn skipped_outcome_has_no_steps() {
        let outcome = Outcome::skipped("no next branch");
        assert!(outcome.steps().is_empty());
        assert!(!outcome.is_failure());
    }
}
