//! Release-gated eligibility checks.
//!
//! All checks are read-only. API errors propagate to the caller; an
//! unanswerable probe never counts as "ineligible".

use std::fmt;

use serde::Serialize;

use crate::platform::{self, HostingApi, RepoId};

use super::types::SelectionMode;

/// Why a repository was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IneligibleReason {
    Archived,
    NoReleases,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Archived => "repository is archived",
            Self::NoReleases => "repository has no releases",
        })
    }
}

/// Probe verdict for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(IneligibleReason),
}

impl Eligibility {
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Decide whether `repo` takes part in a run under `mode`.
pub async fn probe(
    api: &dyn HostingApi,
    repo: &RepoId,
    mode: SelectionMode,
) -> platform::Result<Eligibility> {
    match mode {
        SelectionMode::All => Ok(Eligibility::Eligible),
        SelectionMode::ReleaseGated => {
            let info = api.get_repo(repo).await?;
            if info.archived {
                return Ok(Eligibility::Ineligible(IneligibleReason::Archived));
            }
            let releases = api.latest_releases(repo, 1).await?;
            if releases.is_empty() {
                Ok(Eligibility::Ineligible(IneligibleReason::NoReleases))
            } else {
                Ok(Eligibility::Eligible)
            }
        }
    }
}

pub async fn is_eligible(
    api: &dyn HostingApi,
    repo: &RepoId,
    mode: SelectionMode,
) -> platform::Result<bool> {
    Ok(probe(api, repo, mode).await?.is_eligible())
}

pub async fn branch_exists(
    api: &dyn HostingApi,
    repo: &RepoId,
    branch: &str,
) -> platform::Result<bool> {
    Ok(api.get_branch(repo, branch).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;
    use crate::testing::{FakeHub, HubOp};

    fn repo() -> RepoId {
        RepoId::new("acme", "widget")
    }

    #[tokio::test]
    async fn all_mode_makes_no_calls() {
        let hub = FakeHub::new();
        let verdict = probe(&hub, &repo(), SelectionMode::All).await.unwrap();
        assert_eq!(verdict, Eligibility::Eligible);
        assert!(hub.calls().is_empty());
    }

    #[tokio::test]
    async fn archived_repo_is_ineligible_without_release_lookup() {
        let hub = FakeHub::new();
        hub.add_repo(repo()).archived(true).release("v1.0.0");

        let verdict = probe(&hub, &repo(), SelectionMode::ReleaseGated)
            .await
            .unwrap();
        assert_eq!(
            verdict,
            Eligibility::Ineligible(IneligibleReason::Archived)
        );
        assert!(!hub.calls().iter().any(|c| c.op == HubOp::LatestReleases));
    }

    #[tokio::test]
    async fn release_gating_requires_a_release() {
        let hub = FakeHub::new();
        hub.add_repo(repo());
        assert!(
            !is_eligible(&hub, &repo(), SelectionMode::ReleaseGated)
                .await
                .unwrap()
        );

        hub.add_release(&repo(), "v2.1.0");
        assert!(
            is_eligible(&hub, &repo(), SelectionMode::ReleaseGated)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn probe_errors_propagate() {
        let hub = FakeHub::new();
        hub.add_repo(repo()).release("v1");
        hub.fail_on(&repo(), HubOp::LatestReleases, || {
            PlatformError::network("timeout")
        });

        let err = probe(&hub, &repo(), SelectionMode::ReleaseGated)
            .await
            .expect_err("network failure must not read as ineligible");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn branch_exists_checks_the_ref() {
        let hub = FakeHub::new();
        hub.add_repo(repo()).branch("main", "aaa");
        assert!(branch_exists(&hub, &repo(), "main").await.unwrap());
        assert!(!branch_exists(&hub, &repo(), "next").await.unwrap());
    }

    #[test]
    fn reasons_render_for_humans() {
        assert_eq!(
            IneligibleReason::NoReleases.to_string(),
            "repository has no releases"
        );
    }
}
