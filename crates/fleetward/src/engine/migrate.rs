//! `migrate-next-to-main` under both strategies.
//!
//! Both read every branch they depend on before mutating anything, so a dry
//! run plans the same steps a real run would take.

use crate::fleet::branch_exists;
use crate::platform::{self, BranchRef};
use crate::protection::{ProtectionRule, ProtectionState};

use super::recorder::StepRecorder;
use super::types::{Completion, MAIN_BRANCH, NEXT_BRANCH, archive_branch};

/// Snapshot `main` as `main-archive`, delete `main`, recreate it from `next`.
///
/// `main` sitting on `next`'s tip counts as recreated only once the archive
/// exists. A run that stopped after that point finishes the tail (normal
/// rule, default branch); after success a re-run changes nothing.
pub(crate) async fn archive_and_recreate(rec: &mut StepRecorder<'_>) -> platform::Result<Completion> {
    let api = rec.api();
    let repo = rec.repo();

    let Some(next) = api.get_branch(repo, NEXT_BRANCH).await? else {
        return Ok(Completion::nothing_to_do("no next branch"));
    };
    let main = api.get_branch(repo, MAIN_BRANCH).await?;
    let archived = branch_exists(api, repo, &archive_branch(MAIN_BRANCH)).await?;

    match main {
        Some(ref main) if main.sha == next.sha && archived => {
            return finish_main(rec).await;
        }
        Some(ref main) => {
            archive_main(rec, main, archived).await?;
            rec.create_branch(MAIN_BRANCH, NEXT_BRANCH, &next.sha).await?;
        }
        None => {
            tracing::info!(repo = %repo, "No main branch, nothing to archive");
            rec.create_branch(MAIN_BRANCH, NEXT_BRANCH, &next.sha).await?;
        }
    }

    rec.protect(MAIN_BRANCH, ProtectionRule::normal()).await?;
    rec.set_default_branch(MAIN_BRANCH).await?;
    Ok(Completion::Done)
}

/// Tail of a migration whose `main` was already recreated from `next`.
async fn finish_main(rec: &mut StepRecorder<'_>) -> platform::Result<Completion> {
    let api = rec.api();
    let repo = rec.repo();

    let current = api.get_protection(repo, MAIN_BRANCH).await?;
    let needs_rule = ProtectionState::classify(current.as_ref()) != ProtectionState::Normal;
    let needs_default = api.get_repo(repo).await?.default_branch != MAIN_BRANCH;
    if !needs_rule && !needs_default {
        return Ok(Completion::nothing_to_do("already migrated"));
    }

    tracing::info!(repo = %repo, "main already recreated from next, finishing migration");
    if needs_rule {
        rec.protect(MAIN_BRANCH, ProtectionRule::normal()).await?;
    }
    if needs_default {
        rec.set_default_branch(MAIN_BRANCH).await?;
    }
    Ok(Completion::Done)
}

/// Copy `main` to the archive branch, protect the copy with `main`'s rule
/// (admins included), make it the default and delete `main`.
async fn archive_main(
    rec: &mut StepRecorder<'_>,
    main: &BranchRef,
    archived: bool,
) -> platform::Result<()> {
    let api = rec.api();
    let repo = rec.repo();
    let archive = archive_branch(MAIN_BRANCH);

    let captured = api.get_protection(repo, MAIN_BRANCH).await?;
    let archive_rule = captured
        .clone()
        .unwrap_or_else(ProtectionRule::normal)
        .with_enforce_admins(true);

    if !archived {
        rec.create_branch(&archive, MAIN_BRANCH, &main.sha).await?;
        rec.protect(&archive, archive_rule).await?;
    } else if api.get_protection(repo, &archive).await?.is_none() {
        tracing::info!(repo = %repo, branch = %archive, "Archive branch exists unprotected");
        rec.protect(&archive, archive_rule).await?;
    } else {
        // Left by an earlier, interrupted run; its rule came from the original main.
        tracing::info!(repo = %repo, branch = %archive, "Archive branch already exists, keeping it");
    }
    rec.set_default_branch(&archive).await?;

    // Protected branches cannot be deleted.
    if captured.is_some() {
        rec.unprotect(MAIN_BRANCH).await?;
    }
    rec.delete_branch(MAIN_BRANCH).await
}

/// Snapshot `next` as `main-archive` under the relaxed rule, drop `next`'s
/// protection and point the default branch at `main`.
///
/// The snapshot of `next` is named `main-archive`; the name is kept for
/// compatibility with repositories already migrated this way.
pub(crate) async fn promote_in_place(rec: &mut StepRecorder<'_>) -> platform::Result<Completion> {
    let api = rec.api();
    let repo = rec.repo();
    let archive = archive_branch(MAIN_BRANCH);

    let Some(next) = api.get_branch(repo, NEXT_BRANCH).await? else {
        return Ok(Completion::nothing_to_do("no next branch"));
    };

    if branch_exists(api, repo, &archive).await? {
        tracing::info!(repo = %repo, branch = %archive, "Archive branch already exists, keeping it");
    } else {
        rec.create_branch(&archive, NEXT_BRANCH, &next.sha).await?;
    }
    rec.protect(&archive, ProtectionRule::relaxed()).await?;

    if api.get_protection(repo, NEXT_BRANCH).await?.is_some() {
        rec.unprotect(NEXT_BRANCH).await?;
    }

    if branch_exists(api, repo, MAIN_BRANCH).await? {
        rec.set_default_branch(MAIN_BRANCH).await?;
    } else {
        tracing::warn!(repo = %repo, "No main branch, default branch left unchanged");
    }
    Ok(Completion::Done)
}
