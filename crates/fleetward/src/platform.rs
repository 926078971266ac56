//! Hosting-agnostic view of the API the migrator talks to.
//!
//! [`HostingApi`] is the seam between the migration logic and the network:
//! the GitHub client implements it over HTTP, and tests implement it in
//! memory.

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{AdaptiveRateLimiter, rate_limits};
pub use types::{
    BranchRef, HostingApi, ParseRepoIdError, RateLimitInfo, ReleaseInfo, RepoId, RepoInfo,
};
