//! Configuration file support for fleetward.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`FLEETWARD_` prefix, `__` between section and
//!    key, e.g. `FLEETWARD_FLEET__MAX_PAGES`), plus `FLEETWARD_GITHUB_TOKEN`
//!    and `GITHUB_TOKEN` for the token
//! 3. Local config file (./fleetward.toml)
//! 4. XDG config file (~/.config/fleetward/config.toml)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use FLEETWARD_GITHUB_TOKEN / GITHUB_TOKEN
//! api_url = "https://api.github.com"
//! org = "splunk-soar-connectors"
//! sandbox_repo = "splunk-soar-connectors/testrepo"
//!
//! [fleet]
//! exclude = "^splunk-soar-connectors/(\\.github|testrepo)$"
//! per_page = 30
//! max_pages = 20
//! delay_ms = 1000
//! requests_per_second = 10
//!
//! [run]
//! strategy = "archive-and-recreate"
//! fail_on_error = false
//!
//! [http]
//! timeout_secs = 30
//! max_retries = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use fleetward::engine::ParseNameError;
use fleetward::fleet::{DEFAULT_MAX_PAGES, DEFAULT_ORG, DEFAULT_PER_PAGE};
use fleetward::github::GITHUB_API_URL;
use fleetward::platform::{ParseRepoIdError, rate_limits};
use fleetward::{MigrationStrategy, RepoId};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(
        "no GitHub token configured; set FLEETWARD_GITHUB_TOKEN or GITHUB_TOKEN, \
         or add `token` under [github] in fleetward.toml"
    )]
    MissingToken,

    #[error("invalid sandbox repository: {0}")]
    SandboxRepo(#[source] ParseRepoIdError),

    #[error("invalid run.strategy: {0}")]
    Strategy(#[source] ParseNameError),
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub fleet: FleetConfig,
    pub run: RunConfig,
    pub http: HttpConfig,
}

/// GitHub connection and fleet identity.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Also read from FLEETWARD_GITHUB_TOKEN or GITHUB_TOKEN.
    pub token: Option<String>,
    /// API root, for GitHub Enterprise.
    pub api_url: String,
    /// Organization whose repositories form the fleet.
    pub org: String,
    /// Repository targeted when neither `--all` nor `--repo` is given.
    pub sandbox_repo: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GITHUB_API_URL.to_string(),
            org: DEFAULT_ORG.to_string(),
            sandbox_repo: format!("{DEFAULT_ORG}/testrepo"),
        }
    }
}

/// Listing and pacing defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Exclusion regex over `owner/name`. Unset means the org's `.github`
    /// repository and the sandbox repository.
    pub exclude: Option<String>,
    pub per_page: u32,
    pub max_pages: u32,
    /// Pause between repositories; 0 disables it.
    pub delay_ms: u64,
    pub requests_per_second: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            exclude: None,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            delay_ms: 1_000,
            requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
        }
    }
}

/// Run behaviour defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Migration strategy name, see [`MigrationStrategy`].
    pub strategy: String,
    /// Exit non-zero when any repository fails.
    pub fail_on_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: MigrationStrategy::default().to_string(),
            fail_on_error: false,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 5,
        }
    }
}

impl Config {
    /// Load configuration from files and the environment.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/fleetward/config.toml)
    /// 3. Local config file (./fleetward.toml)
    /// 4. Environment variables with the FLEETWARD_ prefix
    /// 5. Token variables (GITHUB_TOKEN, then FLEETWARD_GITHUB_TOKEN)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("fleetward.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./fleetward.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(Self::environment());

        // Single-underscore token names are the conventional ones; the generic
        // environment source above only understands `__` between levels.
        builder = builder
            .set_override_option("github.token", non_empty_env("GITHUB_TOKEN"))?
            .set_override_option("github.token", non_empty_env("FLEETWARD_GITHUB_TOKEN"))?;

        Ok(builder.build()?.try_deserialize()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix("FLEETWARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// The GitHub token, if one is configured and not blank.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(ConfigError::MissingToken)
    }

    pub fn sandbox_repo(&self) -> Result<RepoId, ConfigError> {
        self.github
            .sandbox_repo
            .parse()
            .map_err(ConfigError::SandboxRepo)
    }

    pub fn strategy(&self) -> Result<MigrationStrategy, ConfigError> {
        self.run.strategy.parse().map_err(ConfigError::Strategy)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.fleet.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "fleetward").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
