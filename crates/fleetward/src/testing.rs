//! In-memory [`HostingApi`] for unit tests.
//!
//! `FakeHub` keeps repositories, branches, protection and releases in memory
//! and behaves like GitHub where the migrator depends on it: protected
//! branches cannot be deleted, the default branch must exist and cannot be
//! deleted, and deletions of missing things succeed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::platform::{
    BranchRef, HostingApi, PlatformError, RateLimitInfo, ReleaseInfo, RepoId, RepoInfo, Result,
};
use crate::protection::ProtectionRule;

/// Operations the hub records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubOp {
    ListOrgRepos,
    GetRepo,
    LatestReleases,
    GetBranch,
    GetProtection,
    PutProtection,
    DeleteProtection,
    CreateBranch,
    DeleteBranch,
    SetDefaultBranch,
    RateLimit,
}

impl HubOp {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::PutProtection
                | Self::DeleteProtection
                | Self::CreateBranch
                | Self::DeleteBranch
                | Self::SetDefaultBranch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCall {
    pub op: HubOp,
    pub repo: Option<RepoId>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub archived: bool,
    pub default_branch: String,
    pub branches: BTreeMap<String, String>,
    pub protection: HashMap<String, ProtectionRule>,
    pub releases: Vec<String>,
}

type ErrorFactory = Arc<dyn Fn() -> PlatformError + Send + Sync>;

#[derive(Default)]
struct HubState {
    repos: BTreeMap<RepoId, FakeRepo>,
    calls: Vec<HubCall>,
    listed_pages: Vec<u32>,
    page_failures: HashMap<u32, PlatformError>,
    failures: HashMap<(RepoId, HubOp), ErrorFactory>,
}

#[derive(Clone, Default)]
pub struct FakeHub {
    state: Arc<Mutex<HubState>>,
}

/// Chained setup for one repository.
pub struct RepoSetup<'a> {
    hub: &'a FakeHub,
    id: RepoId,
}

impl RepoSetup<'_> {
    pub fn archived(self, archived: bool) -> Self {
        self.hub.with_repo(&self.id, |r| r.archived = archived);
        self
    }

    pub fn release(self, tag: &str) -> Self {
        self.hub.add_release(&self.id, tag);
        self
    }

    pub fn branch(self, name: &str, sha: &str) -> Self {
        self.hub.add_branch(&self.id, name, sha);
        self
    }

    pub fn protected(self, branch: &str, rule: ProtectionRule) -> Self {
        self.hub
            .with_repo(&self.id, |r| {
                r.protection.insert(branch.to_string(), rule);
            });
        self
    }

    pub fn default_branch(self, name: &str) -> Self {
        self.hub
            .with_repo(&self.id, |r| r.default_branch = name.to_string());
        self
    }
}

impl FakeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_repo<T>(&self, id: &RepoId, f: impl FnOnce(&mut FakeRepo) -> T) -> T {
        let mut state = self.state();
        let repo = state.repos.entry(id.clone()).or_insert_with(|| FakeRepo {
            default_branch: "main".to_string(),
            ..FakeRepo::default()
        });
        f(repo)
    }

    /// Register a repository (default branch `main`, no branches yet).
    pub fn add_repo(&self, id: RepoId) -> RepoSetup<'_> {
        self.with_repo(&id, |_| ());
        RepoSetup { hub: self, id }
    }

    pub fn add_release(&self, id: &RepoId, tag: &str) {
        self.with_repo(id, |r| r.releases.insert(0, tag.to_string()));
    }

    pub fn add_branch(&self, id: &RepoId, name: &str, sha: &str) {
        self.with_repo(id, |r| {
            r.branches.insert(name.to_string(), sha.to_string());
        });
    }

    /// Fail every `op` on `id` with a fresh error from `make`.
    pub fn fail_on(
        &self,
        id: &RepoId,
        op: HubOp,
        make: impl Fn() -> PlatformError + Send + Sync + 'static,
    ) {
        self.state().failures.insert((id.clone(), op), Arc::new(make));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Fail the next request for listing page `page`.
    pub fn fail_listing_page(&self, page: u32, err: PlatformError) {
        self.state().page_failures.insert(page, err);
    }

    pub fn repo(&self, id: &RepoId) -> Option<FakeRepo> {
        self.state().repos.get(id).cloned()
    }

    pub fn branch_sha(&self, id: &RepoId, branch: &str) -> Option<String> {
        self.repo(id).and_then(|r| r.branches.get(branch).cloned())
    }

    pub fn protection(&self, id: &RepoId, branch: &str) -> Option<ProtectionRule> {
        self.repo(id).and_then(|r| r.protection.get(branch).cloned())
    }

    pub fn default_branch_of(&self, id: &RepoId) -> Option<String> {
        self.repo(id).map(|r| r.default_branch)
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.state().calls.clone()
    }

    pub fn mutations(&self) -> Vec<HubCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.op.is_mutation())
            .collect()
    }

    pub fn listed_pages(&self) -> Vec<u32> {
        self.state().listed_pages.clone()
    }

    /// Record the call and run the injected failure, if any.
    fn enter(&self, op: HubOp, repo: &RepoId, branch: Option<&str>) -> Result<()> {
        let mut state = self.state();
        state.calls.push(HubCall {
            op,
            repo: Some(repo.clone()),
            branch: branch.map(str::to_string),
        });
        if let Some(make) = state.failures.get(&(repo.clone(), op)) {
            return Err(make());
        }
        Ok(())
    }

    fn existing<T>(&self, id: &RepoId, f: impl FnOnce(&mut FakeRepo) -> Result<T>) -> Result<T> {
        let mut state = self.state();
        match state.repos.get_mut(id) {
            Some(repo) => f(repo),
            None => Err(PlatformError::not_found(id.full_name())),
        }
    }
}

#[async_trait]
impl HostingApi for FakeHub {
    async fn list_org_repos_page(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<RepoInfo>> {
        let mut state = self.state();
        state.calls.push(HubCall {
            op: HubOp::ListOrgRepos,
            repo: None,
            branch: None,
        });
        state.listed_pages.push(page);
        if let Some(err) = state.page_failures.remove(&page) {
            return Err(err);
        }

        let per_page = per_page.max(1) as usize;
        let skip = (page.saturating_sub(1) as usize) * per_page;
        Ok(state
            .repos
            .iter()
            .filter(|(id, _)| id.owner == org)
            .skip(skip)
            .take(per_page)
            .map(|(id, r)| RepoInfo {
                id: id.clone(),
                archived: r.archived,
                default_branch: r.default_branch.clone(),
            })
            .collect())
    }

    async fn get_repo(&self, repo: &RepoId) -> Result<RepoInfo> {
        self.enter(HubOp::GetRepo, repo, None)?;
        self.existing(repo, |r| {
            Ok(RepoInfo {
                id: repo.clone(),
                archived: r.archived,
                default_branch: r.default_branch.clone(),
            })
        })
    }

    async fn latest_releases(&self, repo: &RepoId, per_page: u32) -> Result<Vec<ReleaseInfo>> {
        self.enter(HubOp::LatestReleases, repo, None)?;
        self.existing(repo, |r| {
            Ok(r.releases
                .iter()
                .take(per_page as usize)
                .map(|tag| ReleaseInfo {
                    tag_name: tag.clone(),
                })
                .collect())
        })
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<Option<BranchRef>> {
        self.enter(HubOp::GetBranch, repo, Some(branch))?;
        self.existing(repo, |r| {
            Ok(r.branches.get(branch).map(|sha| BranchRef {
                name: branch.to_string(),
                sha: sha.clone(),
            }))
        })
    }

    async fn get_protection(&self, repo: &RepoId, branch: &str) -> Result<Option<ProtectionRule>> {
        self.enter(HubOp::GetProtection, repo, Some(branch))?;
        self.existing(repo, |r| Ok(r.protection.get(branch).cloned()))
    }

    async fn put_protection(&self, repo: &RepoId, branch: &str, rule: &ProtectionRule) -> Result<()> {
        self.enter(HubOp::PutProtection, repo, Some(branch))?;
        self.existing(repo, |r| {
            if !r.branches.contains_key(branch) {
                return Err(PlatformError::not_found(format!("{repo}@{branch}")));
            }
            r.protection.insert(branch.to_string(), rule.clone());
            Ok(())
        })
    }

    async fn delete_protection(&self, repo: &RepoId, branch: &str) -> Result<()> {
        self.enter(HubOp::DeleteProtection, repo, Some(branch))?;
        self.existing(repo, |r| {
            r.protection.remove(branch);
            Ok(())
        })
    }

    async fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        self.enter(HubOp::CreateBranch, repo, Some(branch))?;
        self.existing(repo, |r| {
            r.branches
                .entry(branch.to_string())
                .or_insert_with(|| sha.to_string());
            Ok(())
        })
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<()> {
        self.enter(HubOp::DeleteBranch, repo, Some(branch))?;
        self.existing(repo, |r| {
            if r.protection.contains_key(branch) {
                return Err(PlatformError::api(422, "Cannot delete a protected branch"));
            }
            if r.default_branch == branch && r.branches.contains_key(branch) {
                return Err(PlatformError::api(422, "Cannot delete the default branch"));
            }
            r.branches.remove(branch);
            Ok(())
        })
    }

    async fn set_default_branch(&self, repo: &RepoId, branch: &str) -> Result<()> {
        self.enter(HubOp::SetDefaultBranch, repo, Some(branch))?;
        self.existing(repo, |r| {
            if !r.branches.contains_key(branch) {
                return Err(PlatformError::api(422, "Validation Failed"));
            }
            r.default_branch = branch.to_string();
            Ok(())
        })
    }

    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        self.state().calls.push(HubCall {
            op: HubOp::RateLimit,
            repo: None,
            branch: None,
        });
        Ok(RateLimitInfo {
            limit: 5000,
            remaining: 5000,
            reset_at: Utc::now() + chrono::Duration::hours(1),
            retry_after: None,
        })
    }
}
