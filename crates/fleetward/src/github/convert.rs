//! Conversions between GitHub wire types and platform types.

use chrono::{DateTime, Utc};

use super::types::{
    GitHubRef, GitHubRelease, GitHubRepo, ProtectionRequest, ProtectionResponse,
    PullRequestReviewsPayload, RateLimitResource, StatusChecksPayload,
};
use crate::platform::{BranchRef, RateLimitInfo, ReleaseInfo, RepoId, RepoInfo};
use crate::protection::{ProtectionRule, StatusChecks};

pub fn to_repo_info(repo: &GitHubRepo) -> RepoInfo {
    RepoInfo {
        id: RepoId::new(&repo.owner.login, &repo.name),
        archived: repo.archived,
        default_branch: repo.default_branch.clone(),
    }
}

pub fn to_release_info(release: &GitHubRelease) -> ReleaseInfo {
    ReleaseInfo {
        tag_name: release.tag_name.clone(),
    }
}

pub fn to_branch_ref(git_ref: &GitHubRef) -> BranchRef {
    let name = git_ref
        .ref_name
        .strip_prefix("refs/heads/")
        .unwrap_or(&git_ref.ref_name);
    BranchRef {
        name: name.to_string(),
        sha: git_ref.object.sha.clone(),
    }
}

pub fn to_protection_rule(resp: &ProtectionResponse) -> ProtectionRule {
    let reviews = resp.required_pull_request_reviews.as_ref();
    ProtectionRule {
        required_approving_review_count: reviews
            .map(|r| r.required_approving_review_count)
            .unwrap_or(0),
        dismiss_stale_reviews: reviews.is_some_and(|r| r.dismiss_stale_reviews),
        require_code_owner_reviews: reviews.is_some_and(|r| r.require_code_owner_reviews),
        required_status_checks: resp.required_status_checks.as_ref().map(|c| StatusChecks {
            strict: c.strict,
            contexts: c.contexts.clone(),
        }),
        enforce_admins: resp.enforce_admins.is_some_and(|f| f.enabled),
        required_conversation_resolution: resp
            .required_conversation_resolution
            .is_some_and(|f| f.enabled),
    }
}

pub fn to_protection_request(rule: &ProtectionRule) -> ProtectionRequest {
    ProtectionRequest {
        required_status_checks: rule
            .required_status_checks
            .as_ref()
            .map(|c| StatusChecksPayload {
                strict: c.strict,
                contexts: c.contexts.clone(),
            }),
        enforce_admins: rule.enforce_admins,
        required_pull_request_reviews: Some(PullRequestReviewsPayload {
            dismiss_stale_reviews: rule.dismiss_stale_reviews,
            require_code_owner_reviews: rule.require_code_owner_reviews,
            required_approving_review_count: rule.required_approving_review_count,
        }),
        restrictions: None,
        required_conversation_resolution: rule.required_conversation_resolution,
        allow_force_pushes: false,
        allow_deletions: false,
    }
}

pub fn to_rate_limit_info(core: &RateLimitResource) -> RateLimitInfo {
    RateLimitInfo {
        limit: core.limit,
        remaining: core.remaining,
        reset_at: DateTime::from_timestamp(core.reset, 0).unwrap_or_else(Utc::now),
        retry_after: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::ProtectionState;

    #[test]
    fn repo_info_from_github_repo() {
        let repo: GitHubRepo = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "okta",
            "full_name": "splunk-soar-connectors/okta",
            "owner": {"login": "splunk-soar-connectors"},
            "archived": true,
            "default_branch": "next"
        }))
        .unwrap();

        let info = to_repo_info(&repo);
        assert_eq!(info.id, RepoId::new("splunk-soar-connectors", "okta"));
        assert!(info.archived);
        assert_eq!(info.default_branch, "next");
    }

    #[test]
    fn branch_ref_strips_heads_prefix() {
        let git_ref: GitHubRef = serde_json::from_value(serde_json::json!({
            "ref": "refs/heads/main-archive",
            "object": {"sha": "abc123", "type": "commit"}
        }))
        .unwrap();
        assert_eq!(
            to_branch_ref(&git_ref),
            BranchRef {
                name: "main-archive".into(),
                sha: "abc123".into()
            }
        );
    }

    #[test]
    fn protection_response_reads_frozen_rule() {
        let resp: ProtectionResponse = serde_json::from_value(serde_json::json!({
            "url": "https://api.github.com/repos/o/r/branches/main/protection",
            "required_status_checks": {"strict": true, "contexts": ["freeze-check"], "checks": []},
            "enforce_admins": {"url": "...", "enabled": true},
            "required_pull_request_reviews": {
                "dismiss_stale_reviews": true,
                "require_code_owner_reviews": true,
                "required_approving_review_count": 6
            },
            "required_conversation_resolution": {"enabled": true},
            "allow_force_pushes": {"enabled": false}
        }))
        .unwrap();

        let rule = to_protection_rule(&resp);
        assert_eq!(ProtectionState::classify(Some(&rule)), ProtectionState::Frozen);
    }

    #[test]
    fn protection_response_without_reviews_has_zero_approvals() {
        let resp: ProtectionResponse = serde_json::from_value(serde_json::json!({
            "enforce_admins": {"enabled": false}
        }))
        .unwrap();
        let rule = to_protection_rule(&resp);
        assert_eq!(rule.required_approving_review_count, 0);
        assert!(rule.required_status_checks.is_none());
        assert!(!rule.required_conversation_resolution);
    }

    #[test]
    fn protection_request_sends_null_restrictions() {
        let body = serde_json::to_value(to_protection_request(&ProtectionRule::normal())).unwrap();
        assert_eq!(body["restrictions"], serde_json::Value::Null);
        assert_eq!(body["required_status_checks"], serde_json::Value::Null);
        assert_eq!(body["enforce_admins"], false);
        assert_eq!(
            body["required_pull_request_reviews"]["required_approving_review_count"],
            1
        );
        assert_eq!(body["required_conversation_resolution"], true);
    }

    #[test]
    fn rate_limit_info_from_core_resource() {
        let core = RateLimitResource {
            limit: 5000,
            remaining: 4990,
            reset: 1_700_000_000,
        };
        let info = to_rate_limit_info(&core);
        assert_eq!(info.remaining, 4990);
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);
    }
}
