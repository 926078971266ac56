//! `freeze`: lock `next` and `main` for a release event.

use crate::fleet::branch_exists;
use crate::platform;
use crate::protection::{ProtectionRule, ProtectionState};

use super::recorder::StepRecorder;
use super::types::{Completion, MAIN_BRANCH, NEXT_BRANCH};

pub(crate) async fn freeze(rec: &mut StepRecorder<'_>) -> platform::Result<Completion> {
    let api = rec.api();
    let repo = rec.repo();

    let mut found = false;
    let mut changed = false;
    for branch in [NEXT_BRANCH, MAIN_BRANCH] {
        if !branch_exists(api, repo, branch).await? {
            tracing::debug!(repo = %repo, branch, "Branch missing, not freezing it");
            continue;
        }
        found = true;

        let current = api.get_protection(repo, branch).await?;
        if ProtectionState::classify(current.as_ref()) == ProtectionState::Frozen {
            tracing::debug!(repo = %repo, branch, "Already frozen");
            continue;
        }
        rec.protect(branch, ProtectionRule::frozen()).await?;
        changed = true;
    }

    Ok(match (found, changed) {
        (false, _) => Completion::nothing_to_do("no next or main branch"),
        (true, false) => Completion::nothing_to_do("already frozen"),
        (true, true) => Completion::Done,
    })
}
