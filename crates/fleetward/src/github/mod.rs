//! GitHub REST API client.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - Wire types for the endpoints the migrator calls
//! - [`client`] - The client and its [`HostingApi`](crate::platform::HostingApi) implementation
//! - [`convert`] - Conversion between wire types and platform types
//!
//! ```ignore
//! use fleetward::github::{GitHubClient, DEFAULT_TIMEOUT};
//! use fleetward::platform::AdaptiveRateLimiter;
//!
//! let limiter = AdaptiveRateLimiter::new(10);
//! let client = GitHubClient::new(&token, Some(limiter), DEFAULT_TIMEOUT)?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_TIMEOUT, GITHUB_API_URL, GITHUB_API_VERSION, GitHubClient};
pub use error::{GitHubError, short_error_message};
pub use types::{GitHubRepo, ProtectionResponse};
