use thiserror::Error;

use crate::platform::{PlatformError, RepoId};

/// Failures that abort a fleet run before any repository is touched.
#[derive(Debug, Error)]
pub enum FleetError {
    /// A page of the organization listing could not be fetched.
    #[error("Failed to list repositories of {org} (page {page}): {source}")]
    Listing {
        org: String,
        page: u32,
        #[source]
        source: PlatformError,
    },

    /// A name filter did not compile.
    #[error("Invalid repository pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The single-repository target could not be resolved.
    #[error("Failed to resolve target repository {repo}: {source}")]
    Target {
        repo: RepoId,
        #[source]
        source: PlatformError,
    },
}

pub type Result<T> = std::result::Result<T, FleetError>;
