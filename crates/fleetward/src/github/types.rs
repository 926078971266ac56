//! Wire types for the GitHub REST endpoints the migrator uses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

/// Subset of `GET /repos/{owner}/{repo}` and `GET /orgs/{org}/repos` items.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub archived: bool,
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRefObject {
    pub sha: String,
}

/// `GET /repos/{owner}/{repo}/git/ref/heads/{branch}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: GitHubRefObject,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateRepoRequest<'a> {
    pub default_branch: &'a str,
}

/// `{"enabled": bool}` wrapper GitHub uses for protection toggles.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EnabledFlag {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChecksPayload {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestReviewsPayload {
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    #[serde(default)]
    pub required_approving_review_count: u32,
}

/// `GET /repos/{owner}/{repo}/branches/{branch}/protection`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectionResponse {
    pub required_status_checks: Option<StatusChecksPayload>,
    pub enforce_admins: Option<EnabledFlag>,
    pub required_pull_request_reviews: Option<PullRequestReviewsPayload>,
    pub required_conversation_resolution: Option<EnabledFlag>,
}

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
///
/// `restrictions` must be sent explicitly; `null` means no push allow-list.
#[derive(Debug, Clone, Serialize)]
pub struct ProtectionRequest {
    pub required_status_checks: Option<StatusChecksPayload>,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: Option<PullRequestReviewsPayload>,
    pub restrictions: Option<()>,
    pub required_conversation_resolution: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResource {
    pub limit: usize,
    pub remaining: usize,
    pub reset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

/// `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

/// Error body GitHub returns alongside 4xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubErrorBody {
    pub message: String,
}
