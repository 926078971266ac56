//! Branch protection rules and the canonical rules the migrator applies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status check that never reports success, used to block merges while frozen.
pub const FREEZE_CHECK: &str = "freeze-check";

/// Approvals required by the frozen rule (GitHub's maximum).
pub const FROZEN_REVIEW_COUNT: u32 = 6;

/// Required status checks on a protected branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChecks {
    /// Require branches to be up to date before merging.
    pub strict: bool,
    pub contexts: Vec<String>,
}

/// A bundle of branch-update constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionRule {
    pub required_approving_review_count: u32,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub required_status_checks: Option<StatusChecks>,
    pub enforce_admins: bool,
    pub required_conversation_resolution: bool,
}

impl ProtectionRule {
    /// Locks a branch during a release event: six approvals plus a status
    /// check that never passes, enforced for admins.
    #[must_use]
    pub fn frozen() -> Self {
        Self {
            required_approving_review_count: FROZEN_REVIEW_COUNT,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
            required_status_checks: Some(StatusChecks {
                strict: true,
                contexts: vec![FREEZE_CHECK.to_string()],
            }),
            enforce_admins: true,
            required_conversation_resolution: true,
        }
    }

    /// Day-to-day protection: one approval and resolved conversations.
    #[must_use]
    pub fn normal() -> Self {
        Self {
            required_approving_review_count: 1,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: false,
            required_status_checks: None,
            enforce_admins: false,
            required_conversation_resolution: true,
        }
    }

    /// Non-restrictive protection for archive snapshots under promote-in-place.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            required_approving_review_count: 0,
            dismiss_stale_reviews: false,
            require_code_owner_reviews: false,
            required_status_checks: None,
            enforce_admins: false,
            required_conversation_resolution: false,
        }
    }

    #[must_use]
    pub fn with_enforce_admins(mut self, enforce: bool) -> Self {
        self.enforce_admins = enforce;
        self
    }
}

/// Which canonical rule, if any, an observed branch is under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtectionState {
    Unprotected,
    Normal,
    Frozen,
    /// Protected, but by neither canonical rule.
    Custom,
}

impl ProtectionState {
    #[must_use]
    pub fn classify(rule: Option<&ProtectionRule>) -> Self {
        match rule {
            None => Self::Unprotected,
            Some(rule) if *rule == ProtectionRule::frozen() => Self::Frozen,
            Some(rule) if *rule == ProtectionRule::normal() => Self::Normal,
            Some(_) => Self::Custom,
        }
    }
}

impl fmt::Display for ProtectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unprotected => "unprotected",
            Self::Normal => "normal",
            Self::Frozen => "frozen",
            Self::Custom => "custom",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_rule_blocks_merges() {
        let rule = ProtectionRule::frozen();
        assert_eq!(rule.required_approving_review_count, 6);
        assert!(rule.enforce_admins);
        let checks = rule.required_status_checks.expect("status checks");
        assert_eq!(checks.contexts, vec![FREEZE_CHECK.to_string()]);
    }

    #[test]
    fn normal_rule_matches_day_to_day_policy() {
        let rule = ProtectionRule::normal();
        assert_eq!(rule.required_approving_review_count, 1);
        assert!(rule.required_conversation_resolution);
        assert!(rule.required_status_checks.is_none());
        assert!(!rule.enforce_admins);
    }

    #[test]
    fn classify_recognizes_each_canonical_state() {
        assert_eq!(ProtectionState::classify(None), ProtectionState::Unprotected);
        assert_eq!(
            ProtectionState::classify(Some(&ProtectionRule::frozen())),
            ProtectionState::Frozen
        );
        assert_eq!(
            ProtectionState::classify(Some(&ProtectionRule::normal())),
            ProtectionState::Normal
        );
        assert_eq!(
            ProtectionState::classify(Some(&ProtectionRule::relaxed())),
            ProtectionState::Custom
        );
    }

    #[test]
    fn admin_enforcement_makes_normal_rule_custom() {
        let rule = ProtectionRule::normal().with_enforce_admins(true);
        assert!(rule.enforce_admins);
        assert_eq!(ProtectionState::classify(Some(&rule)), ProtectionState::Custom);
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(ProtectionState::Frozen.to_string(), "frozen");
        assert_eq!(ProtectionState::Unprotected.to_string(), "unprotected");
    }
}
