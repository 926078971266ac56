//! `thaw`: put `main` back under day-to-day protection. `next` is left alone.

use crate::fleet::branch_exists;
use crate::platform;
use crate::protection::{ProtectionRule, ProtectionState};

use super::recorder::StepRecorder;
use super::types::{Completion, MAIN_BRANCH};

pub(crate) async fn thaw(rec: &mut StepRecorder<'_>) -> platform::Result<Completion> {
    let api = rec.api();
    let repo = rec.repo();

    if !branch_exists(api, repo, MAIN_BRANCH).await? {
        return Ok(Completion::nothing_to_do("no main branch"));
    }

    let current = api.get_protection(repo, MAIN_BRANCH).await?;
    match ProtectionState::classify(current.as_ref()) {
        ProtectionState::Normal => return Ok(Completion::nothing_to_do("main already thawed")),
        ProtectionState::Unprotected => {}
        ProtectionState::Frozen | ProtectionState::Custom => rec.unprotect(MAIN_BRANCH).await?,
    }
    rec.protect(MAIN_BRANCH, ProtectionRule::normal()).await?;
    Ok(Completion::Done)
}
