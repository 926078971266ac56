use console::Term;
use fleetward::fleet::{ListOptions, SelectionMode, Target, default_exclude_pattern};
use fleetward::platform::AdaptiveRateLimiter;
use fleetward::retry::RetryConfig;
use fleetward::{GitHubClient, HostingApi};

use crate::config::Config;
use crate::{FilterOptions, TargetOptions};

/// Build a GitHub client from configuration.
///
/// The rate limiter is skipped with `--no-rate-limit`; retries still apply.
pub(crate) fn build_client(
    config: &Config,
    no_rate_limit: bool,
) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = config.github_token()?;
    let limiter = if no_rate_limit {
        tracing::warn!("Proactive rate limiting disabled");
        None
    } else {
        Some(AdaptiveRateLimiter::new(config.fleet.requests_per_second))
    };

    let client = GitHubClient::new(&token, limiter, config.timeout())?
        .with_api_url(&config.github.api_url)
        .with_retry_config(RetryConfig::default().with_max_retries(config.http.max_retries));
    Ok(client)
}

/// Merge listing flags with configuration defaults.
pub(crate) fn list_options(
    filters: &FilterOptions,
    config: &Config,
) -> Result<(String, ListOptions), Box<dyn std::error::Error>> {
    let org = filters
        .org
        .clone()
        .unwrap_or_else(|| config.github.org.clone());

    let exclude = match filters.exclude.clone().or_else(|| config.fleet.exclude.clone()) {
        Some(pattern) => pattern,
        None => {
            let sandbox = config.sandbox_repo()?;
            default_exclude_pattern(&org, Some(&sandbox))
        }
    };

    let mut options = ListOptions::default()
        .with_per_page(filters.per_page.unwrap_or(config.fleet.per_page))
        .with_max_pages(filters.max_pages.unwrap_or(config.fleet.max_pages));
    if !exclude.is_empty() {
        options = options.with_exclude(&exclude)?;
    }
    if let Some(ref pattern) = filters.include {
        options = options.with_include(pattern)?;
    }
    Ok((org, options))
}

pub(crate) fn selection(filters: &FilterOptions) -> SelectionMode {
    if filters.release_gated {
        SelectionMode::ReleaseGated
    } else {
        SelectionMode::All
    }
}

/// Resolve `--all` / `--repo` into a run target.
///
/// Without either flag the run is confined to the configured sandbox
/// repository.
pub(crate) fn resolve_target(
    target: &TargetOptions,
    config: &Config,
) -> Result<Target, Box<dyn std::error::Error>> {
    if target.all {
        let (org, options) = list_options(&target.filters, config)?;
        return Ok(Target::Fleet { org, options });
    }
    let repo = match target.repo.clone() {
        Some(repo) => repo,
        None => config.sandbox_repo()?,
    };
    Ok(Target::Single(repo))
}

/// Show the remaining API budget before a run.
pub(crate) async fn display_rate_limit(client: &GitHubClient) {
    let is_tty = Term::stdout().is_term();
    match client.rate_limit().await {
        Ok(info) => {
            if is_tty {
                println!(
                    "Rate limit: {}/{} remaining (resets at {})\n",
                    info.remaining, info.limit, info.reset_at
                );
            } else {
                tracing::info!(
                    remaining = info.remaining,
                    limit = info.limit,
                    reset_at = %info.reset_at,
                    "Rate limit status"
                );
            }
        }
        Err(e) => tracing::debug!(error = %e, "Could not read rate limit"),
    }
}
