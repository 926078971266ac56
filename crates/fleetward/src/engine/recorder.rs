//! Executes mutations and keeps the list of what was done.

use crate::platform::{self, HostingApi, RepoId};
use crate::protection::ProtectionRule;

use super::types::Step;

/// Runs each mutation against the hub (unless dry-running) and records it.
///
/// A step is recorded only after the API accepted it, so on failure
/// [`into_steps`](Self::into_steps) lists exactly what changed.
pub(crate) struct StepRecorder<'a> {
    api: &'a dyn HostingApi,
    repo: &'a RepoId,
    dry_run: bool,
    steps: Vec<Step>,
}

impl<'a> StepRecorder<'a> {
    pub(crate) fn new(api: &'a dyn HostingApi, repo: &'a RepoId, dry_run: bool) -> Self {
        Self {
            api,
            repo,
            dry_run,
            steps: Vec::new(),
        }
    }

    pub(crate) fn api(&self) -> &'a dyn HostingApi {
        self.api
    }

    pub(crate) fn repo(&self) -> &'a RepoId {
        self.repo
    }

    pub(crate) fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub(crate) async fn protect(&mut self, branch: &str, rule: ProtectionRule) -> platform::Result<()> {
        if !self.dry_run {
            self.api.put_protection(self.repo, branch, &rule).await?;
        }
        self.record(Step::Protect {
            branch: branch.to_string(),
            rule,
        });
        Ok(())
    }

    pub(crate) async fn unprotect(&mut self, branch: &str) -> platform::Result<()> {
        if !self.dry_run {
            self.api.delete_protection(self.repo, branch).await?;
        }
        self.record(Step::Unprotect {
            branch: branch.to_string(),
        });
        Ok(())
    }

    pub(crate) async fn create_branch(
        &mut self,
        branch: &str,
        from: &str,
        sha: &str,
    ) -> platform::Result<()> {
        if !self.dry_run {
            self.api.create_branch(self.repo, branch, sha).await?;
        }
        self.record(Step::CreateBranch {
            branch: branch.to_string(),
            from: from.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }

    pub(crate) async fn delete_branch(&mut self, branch: &str) -> platform::Result<()> {
        if !self.dry_run {
            self.api.delete_branch(self.repo, branch).await?;
        }
        self.record(Step::DeleteBranch {
            branch: branch.to_string(),
        });
        Ok(())
    }

    pub(crate) async fn set_default_branch(&mut self, branch: &str) -> platform::Result<()> {
        if !self.dry_run {
            self.api.set_default_branch(self.repo, branch).await?;
        }
        self.record(Step::SetDefaultBranch {
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn record(&mut self, step: Step) {
        if self.dry_run {
            tracing::info!(repo = %self.repo, step = %step, "Would apply step");
        } else {
            tracing::info!(repo = %self.repo, step = %step, "Applied step");
        }
        self.steps.push(step);
    }
}
