//! GitHub REST client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use super::convert::{
    to_branch_ref, to_protection_request, to_protection_rule, to_rate_limit_info,
    to_release_info, to_repo_info,
};
use super::error::{GitHubError, short_error_message};
use super::types::{
    CreateRefRequest, GitHubErrorBody, GitHubRef, GitHubRelease, GitHubRepo, ProtectionResponse,
    RateLimitResponse, UpdateRepoRequest,
};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_get};
use crate::platform::{
    self, AdaptiveRateLimiter, BranchRef, HostingApi, PlatformError, RateLimitInfo, ReleaseInfo,
    RepoId, RepoInfo,
};
use crate::protection::ProtectionRule;
use crate::retry::{RetryConfig, with_retry};

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// REST API version pinned through `X-GitHub-Api-Version`.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

const USER_AGENT: &str = "fleetward";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// GitHub API client.
///
/// All calls go through the [`HttpTransport`] seam, are paced by the optional
/// [`AdaptiveRateLimiter`] and retried per [`RetryConfig`] when the failure is
/// transient (transport errors, 5xx, rate limiting).
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    token: Arc<String>,
    rate_limiter: Option<AdaptiveRateLimiter>,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client for api.github.com backed by reqwest.
    pub fn new(
        token: &str,
        rate_limiter: Option<AdaptiveRateLimiter>,
        timeout: StdDuration,
    ) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::Config("GitHub token is empty".to_string()));
        }
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| GitHubError::Config(e.to_string()))?;

        Ok(Self::new_with_transport(
            token,
            rate_limiter,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        token: &str,
        rate_limiter: Option<AdaptiveRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            api_url: GITHUB_API_URL.to_string(),
            token: Arc::new(token.trim().to_string()),
            rate_limiter,
            retry: RetryConfig::default(),
        }
    }

    /// Point the client at another API root (GitHub Enterprise, test servers).
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn rate_limiter(&self) -> Option<&AdaptiveRateLimiter> {
        self.rate_limiter.as_ref()
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    /// Feed rate limit headers into the limiter, if both are present.
    fn update_rate_limit(&self, headers: &HttpHeaders) {
        let Some(ref limiter) = self.rate_limiter else {
            return;
        };
        if let Some(info) = Self::parse_rate_limit_headers(headers) {
            limiter.update(&info);
        } else if let Some(retry_after) = parse_retry_after(headers) {
            limiter.hold_for(retry_after);
        }
    }

    /// Extract rate limit info from GitHub's `x-ratelimit-*` headers.
    fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitInfo> {
        let limit = header_get(headers, "x-ratelimit-limit")?
            .parse::<usize>()
            .ok()?;
        let remaining = header_get(headers, "x-ratelimit-remaining")?
            .parse::<usize>()
            .ok()?;
        let reset_epoch = header_get(headers, "x-ratelimit-reset")?
            .parse::<i64>()
            .ok()?;
        let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
            retry_after: parse_retry_after(headers),
        })
    }

    /// Send one request and map non-2xx statuses to errors.
    async fn send_once(
        &self,
        method: HttpMethod,
        path: &str,
        body: &[u8],
    ) -> Result<HttpResponse, GitHubError> {
        self.wait_for_rate_limit().await;

        let mut request = HttpRequest::new(method, format!("{}{}", self.api_url, path))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token));
        if !body.is_empty() {
            request = request
                .header("Content-Type", "application/json")
                .body(body.to_vec());
        }

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        self.update_rate_limit(&response.headers);
        tracing::debug!(
            method = method.as_str(),
            path,
            status = response.status,
            "GitHub API call"
        );

        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response, path))
        }
    }

    /// Send a request with retries for transient failures.
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, GitHubError> {
        let label = format!("{} {}", method.as_str(), path);
        let body = body.as_slice();
        with_retry(
            || self.send_once(method, path, body),
            &self.retry,
            GitHubError::is_retryable,
            GitHubError::retry_after,
            short_error_message,
            &label,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let response = self.execute(HttpMethod::Get, path, Vec::new()).await?;
        decode(&response, path)
    }

    async fn send_json<B: serde::Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, GitHubError> {
        let body = serde_json::to_vec(body).map_err(|source| GitHubError::MalformedResponse {
            endpoint: path.to_string(),
            source,
        })?;
        self.execute(method, path, body).await
    }

    pub async fn list_org_repos_page(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRepo>, GitHubError> {
        self.get(&format!("/orgs/{org}/repos?per_page={per_page}&page={page}"))
            .await
    }

    pub async fn get_repo(&self, repo: &RepoId) -> Result<GitHubRepo, GitHubError> {
        self.get(&format!("/repos/{}/{}", repo.owner, repo.name))
            .await
    }

    pub async fn list_releases(
        &self,
        repo: &RepoId,
        per_page: u32,
    ) -> Result<Vec<GitHubRelease>, GitHubError> {
        self.get(&format!(
            "/repos/{}/{}/releases?per_page={per_page}",
            repo.owner, repo.name
        ))
        .await
    }

    /// Look up a branch head; `None` when the branch does not exist.
    pub async fn get_branch_ref(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<GitHubRef>, GitHubError> {
        let path = format!("/repos/{}/{}/git/ref/heads/{branch}", repo.owner, repo.name);
        match self.get::<GitHubRef>(&path).await {
            Ok(git_ref) => Ok(Some(git_ref)),
            Err(GitHubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Current protection on a branch; `None` when unprotected.
    pub async fn get_branch_protection(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<ProtectionResponse>, GitHubError> {
        match self.get(&protection_path(repo, branch)).await {
            Ok(resp) => Ok(Some(resp)),
            Err(GitHubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put_branch_protection(
        &self,
        repo: &RepoId,
        branch: &str,
        rule: &ProtectionRule,
    ) -> Result<(), GitHubError> {
        self.send_json(
            HttpMethod::Put,
            &protection_path(repo, branch),
            &to_protection_request(rule),
        )
        .await?;
        Ok(())
    }

    /// Remove protection. Already-unprotected branches succeed.
    pub async fn delete_branch_protection(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> Result<(), GitHubError> {
        match self
            .execute(HttpMethod::Delete, &protection_path(repo, branch), Vec::new())
            .await
        {
            Ok(_) | Err(GitHubError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Create `refs/heads/{branch}` at `sha`. An existing ref succeeds.
    pub async fn create_ref(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
        let body = CreateRefRequest {
            ref_name: format!("refs/heads/{branch}"),
            sha,
        };
        match self.send_json(HttpMethod::Post, &path, &body).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unprocessable("already exists") => {
                tracing::debug!(repo = %repo, branch, "Branch already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Delete `refs/heads/{branch}`. A missing ref succeeds.
    pub async fn delete_ref(&self, repo: &RepoId, branch: &str) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/git/refs/heads/{branch}", repo.owner, repo.name);
        match self.execute(HttpMethod::Delete, &path, Vec::new()).await {
            Ok(_) | Err(GitHubError::NotFound(_)) => Ok(()),
            Err(e) if e.is_unprocessable("does not exist") => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn update_default_branch(&self, repo: &RepoId, branch: &str) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        self.send_json(
            HttpMethod::Patch,
            &path,
            &UpdateRepoRequest {
                default_branch: branch,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn get_rate_limit(&self) -> Result<RateLimitInfo, GitHubError> {
        let resp: RateLimitResponse = self.get("/rate_limit").await?;
        Ok(to_rate_limit_info(&resp.resources.core))
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn list_org_repos_page(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> platform::Result<Vec<RepoInfo>> {
        let repos = GitHubClient::list_org_repos_page(self, org, page, per_page)
            .await
            .map_err(PlatformError::from)?;
        Ok(repos.iter().map(to_repo_info).collect())
    }

    async fn get_repo(&self, repo: &RepoId) -> platform::Result<RepoInfo> {
        let data = GitHubClient::get_repo(self, repo)
            .await
            .map_err(PlatformError::from)?;
        Ok(to_repo_info(&data))
    }

    async fn latest_releases(
        &self,
        repo: &RepoId,
        per_page: u32,
    ) -> platform::Result<Vec<ReleaseInfo>> {
        let releases = self
            .list_releases(repo, per_page)
            .await
            .map_err(PlatformError::from)?;
        Ok(releases.iter().map(to_release_info).collect())
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> platform::Result<Option<BranchRef>> {
        let git_ref = self
            .get_branch_ref(repo, branch)
            .await
            .map_err(PlatformError::from)?;
        Ok(git_ref.as_ref().map(to_branch_ref))
    }

    async fn get_protection(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> platform::Result<Option<ProtectionRule>> {
        let resp = self
            .get_branch_protection(repo, branch)
            .await
            .map_err(PlatformError::from)?;
        Ok(resp.as_ref().map(to_protection_rule))
    }

    async fn put_protection(
        &self,
        repo: &RepoId,
        branch: &str,
        rule: &ProtectionRule,
    ) -> platform::Result<()> {
        self.put_branch_protection(repo, branch, rule)
            .await
            .map_err(PlatformError::from)
    }

    async fn delete_protection(&self, repo: &RepoId, branch: &str) -> platform::Result<()> {
        self.delete_branch_protection(repo, branch)
            .await
            .map_err(PlatformError::from)
    }

    async fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> platform::Result<()> {
        self.create_ref(repo, branch, sha)
            .await
            .map_err(PlatformError::from)
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> platform::Result<()> {
        self.delete_ref(repo, branch)
            .await
            .map_err(PlatformError::from)
    }

    async fn set_default_branch(&self, repo: &RepoId, branch: &str) -> platform::Result<()> {
        self.update_default_branch(repo, branch)
            .await
            .map_err(PlatformError::from)
    }

    async fn rate_limit(&self) -> platform::Result<RateLimitInfo> {
        self.get_rate_limit().await.map_err(PlatformError::from)
    }
}

fn protection_path(repo: &RepoId, branch: &str) -> String {
    format!(
        "/repos/{}/{}/branches/{branch}/protection",
        repo.owner, repo.name
    )
}

fn decode<T: DeserializeOwned>(response: &HttpResponse, endpoint: &str) -> Result<T, GitHubError> {
    serde_json::from_slice(&response.body).map_err(|source| GitHubError::MalformedResponse {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn parse_retry_after(headers: &HttpHeaders) -> Option<StdDuration> {
    header_get(headers, "retry-after")?
        .trim()
        .parse::<u64>()
        .ok()
        .map(StdDuration::from_secs)
}

/// GitHub puts a human-readable `message` in error bodies; fall back to the raw body.
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<GitHubErrorBody>(&response.body)
        .map(|b| b.message)
        .unwrap_or_else(|_| response.body_text())
}

fn status_error(response: &HttpResponse, path: &str) -> GitHubError {
    let retry_after = parse_retry_after(&response.headers);
    let budget_exhausted = header_get(&response.headers, "x-ratelimit-remaining") == Some("0");

    match response.status {
        401 => GitHubError::AuthRequired,
        429 => rate_limited(response, retry_after),
        403 if budget_exhausted || retry_after.is_some() => rate_limited(response, retry_after),
        404 => GitHubError::NotFound(path.to_string()),
        status if status >= 500 => GitHubError::Server {
            status,
            message: error_message(response),
        },
        status => GitHubError::Api {
            status,
            message: error_message(response),
        },
    }
}

fn rate_limited(response: &HttpResponse, retry_after: Option<StdDuration>) -> GitHubError {
    let reset_at = header_get(&response.headers, "x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .or_else(|| {
            retry_after
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .map(|d| Utc::now() + d)
        })
        .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1));
    GitHubError::RateLimited {
        reset_at,
        retry_after,
    }
}
