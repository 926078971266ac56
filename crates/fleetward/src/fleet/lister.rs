//! Organization listing.

use crate::platform::{HostingApi, RepoInfo};

use super::error::{FleetError, Result};
use super::progress::{FleetProgress, ProgressCallback, emit};
use super::types::ListOptions;

/// A one-shot cursor over an organization's repositories, one API page at a
/// time.
///
/// Pages are requested in order starting at 1. The cursor ends after
/// `max_pages` pages, at the first empty page, or at the first failed page;
/// once ended it never issues another request.
pub struct RepoPages<'a> {
    api: &'a dyn HostingApi,
    org: String,
    options: &'a ListOptions,
    page: u32,
    done: bool,
}

impl<'a> RepoPages<'a> {
    pub fn new(api: &'a dyn HostingApi, org: &str, options: &'a ListOptions) -> Self {
        Self {
            api,
            org: org.to_string(),
            options,
            page: 1,
            done: false,
        }
    }

    /// Page number the next call will request.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Fetch the next page, filtered by the include and exclude patterns.
    ///
    /// Returns `Ok(None)` when the listing is exhausted. A page whose
    /// repositories were all filtered out is `Ok(Some(vec![]))`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RepoInfo>>> {
        Ok(self.next_raw_page().await?.map(|(_, kept)| kept))
    }

    /// Like [`next_page`](Self::next_page), but also reports how many
    /// repositories the API returned before filtering.
    async fn next_raw_page(&mut self) -> Result<Option<(usize, Vec<RepoInfo>)>> {
        if self.done || self.page > self.options.max_pages {
            self.done = true;
            return Ok(None);
        }

        let page = self.page;
        let repos = match self
            .api
            .list_org_repos_page(&self.org, page, self.options.per_page)
            .await
        {
            Ok(repos) => repos,
            Err(source) => {
                self.done = true;
                return Err(FleetError::Listing {
                    org: self.org.clone(),
                    page,
                    source,
                });
            }
        };

        if repos.is_empty() {
            tracing::debug!(org = %self.org, page, "Empty page, listing complete");
            self.done = true;
            return Ok(None);
        }

        self.page += 1;
        let count = repos.len();
        let kept: Vec<RepoInfo> = repos
            .into_iter()
            .filter(|repo| {
                let keep = self.options.keeps(&repo.id);
                if !keep {
                    tracing::debug!(repo = %repo.id, "Excluded by name filter");
                }
                keep
            })
            .collect();
        Ok(Some((count, kept)))
    }

    /// Drain the cursor into a single list.
    pub async fn collect_all(mut self) -> Result<Vec<RepoInfo>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}

/// List every repository of `org` that survives the filters in `options`.
///
/// The full list is materialized before returning, so nothing downstream
/// runs against a partial listing.
pub async fn list_repositories(
    api: &dyn HostingApi,
    org: &str,
    options: &ListOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<RepoInfo>> {
    emit(
        on_progress,
        FleetProgress::FetchingRepos {
            org: org.to_string(),
            max_pages: options.max_pages,
        },
    );

    let mut pages = RepoPages::new(api, org, options);
    let mut all = Vec::new();
    loop {
        let page = pages.page();
        let Some((count, kept)) = pages.next_raw_page().await? else {
            break;
        };
        all.extend(kept.iter().cloned());
        emit(
            on_progress,
            FleetProgress::FetchedPage {
                org: org.to_string(),
                page,
                count,
                kept: kept.len(),
                total_so_far: all.len(),
            },
        );
    }

    if pages.page() > options.max_pages {
        tracing::warn!(
            org,
            max_pages = options.max_pages,
            "Stopped at the page limit; the organization may have more repositories"
        );
    }

    tracing::info!(org, total = all.len(), "Listed repositories");
    emit(
        on_progress,
        FleetProgress::FetchComplete {
            org: org.to_string(),
            total: all.len(),
        },
    );
    Ok(all)
}
