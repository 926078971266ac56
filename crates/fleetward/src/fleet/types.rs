//! Options shared by the lister, the prober and the runner.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{FleetError, Result};
use crate::engine::MigrationAction;
use crate::platform::RepoId;

/// Repositories requested per listing page.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// GitHub caps `per_page` at 100.
pub const MAX_PER_PAGE: u32 = 100;

/// Listing pages requested before giving up on finding the end.
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Pause between repositories.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1_000);

/// Organization the fleet lives in.
pub const DEFAULT_ORG: &str = "splunk-soar-connectors";

/// How the organization listing is paged and filtered.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub per_page: u32,
    pub max_pages: u32,
    /// Keep only repositories whose `owner/name` matches.
    pub include: Option<Regex>,
    /// Drop repositories whose `owner/name` matches.
    pub exclude: Option<Regex>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            include: None,
            exclude: None,
        }
    }
}

impl ListOptions {
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the exclusion pattern (unanchored search over `owner/name`).
    pub fn with_exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude = Some(compile_pattern(pattern)?);
        Ok(self)
    }

    /// Set the inclusion pattern (unanchored search over `owner/name`).
    pub fn with_include(mut self, pattern: &str) -> Result<Self> {
        self.include = Some(compile_pattern(pattern)?);
        Ok(self)
    }

    /// Whether a repository survives the include and exclude filters.
    #[must_use]
    pub fn keeps(&self, repo: &RepoId) -> bool {
        let full_name = repo.full_name();
        if let Some(ref include) = self.include
            && !include.is_match(&full_name)
        {
            return false;
        }
        !self
            .exclude
            .as_ref()
            .is_some_and(|exclude| exclude.is_match(&full_name))
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| FleetError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// The default exclusion: the org's meta repository and the sandbox.
#[must_use]
pub fn default_exclude_pattern(org: &str, sandbox: Option<&RepoId>) -> String {
    let mut names = vec![regex::escape(".github")];
    if let Some(sandbox) = sandbox
        && sandbox.owner == org
    {
        names.push(regex::escape(&sandbox.name));
    }
    format!("^{}/({})$", regex::escape(org), names.join("|"))
}

/// Which listed repositories are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Every listed repository.
    #[default]
    All,
    /// Only unarchived repositories with at least one release.
    ReleaseGated,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::ReleaseGated => "release-gated",
        })
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "release-gated" | "released" => Ok(Self::ReleaseGated),
            other => Err(format!("unknown selection mode: {other}")),
        }
    }
}

/// What a run operates on.
#[derive(Debug, Clone)]
pub enum Target {
    /// Every repository of `org` that survives the listing filters.
    Fleet { org: String, options: ListOptions },
    /// One repository, bypassing the lister.
    Single(RepoId),
}

/// Everything a fleet run needs besides the hosting API and the engine.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub action: MigrationAction,
    pub target: Target,
    pub selection: SelectionMode,
    /// Pause between repositories; zero disables it.
    pub delay: Duration,
}

impl RunOptions {
    pub fn new(action: MigrationAction, target: Target) -> Self {
        Self {
            action,
            target,
            selection: SelectionMode::default(),
            delay: DEFAULT_DELAY,
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}
