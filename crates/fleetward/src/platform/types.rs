use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protection::ProtectionRule;

use super::errors::Result;

/// Repository identifier, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid repository {0:?}: expected owner/name")]
pub struct ParseRepoIdError(pub String);

impl FromStr for RepoId {
    type Err = ParseRepoIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(ParseRepoIdError(s.to_string())),
        }
    }
}

/// Repository attributes the migrator reads. Never created or deleted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub id: RepoId,
    pub archived: bool,
    pub default_branch: String,
}

/// A branch head: name plus the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub tag_name: String,
}

/// Rate limit information reported by the hosting API.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
    /// Server-requested pause before the next request (`Retry-After`).
    pub retry_after: Option<Duration>,
}

/// The hosting API surface the migrator needs.
///
/// Branch lookups return `Ok(None)` for a missing branch. Mutations are
/// idempotent: deleting something already gone or creating a branch that
/// already exists succeeds.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// One page of an organization's repositories. An empty page ends pagination.
    async fn list_org_repos_page(&self, org: &str, page: u32, per_page: u32)
    -> Result<Vec<RepoInfo>>;

    async fn get_repo(&self, repo: &RepoId) -> Result<RepoInfo>;

    /// Most recent releases, newest first.
    async fn latest_releases(&self, repo: &RepoId, per_page: u32) -> Result<Vec<ReleaseInfo>>;

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<Option<BranchRef>>;

    async fn get_protection(&self, repo: &RepoId, branch: &str)
    -> Result<Option<ProtectionRule>>;

    async fn put_protection(&self, repo: &RepoId, branch: &str, rule: &ProtectionRule)
    -> Result<()>;

    async fn delete_protection(&self, repo: &RepoId, branch: &str) -> Result<()>;

    async fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()>;

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<()>;

    async fn set_default_branch(&self, repo: &RepoId, branch: &str) -> Result<()>;

    async fn rate_limit(&self) -> Result<RateLimitInfo>;
}
