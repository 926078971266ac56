//! `fleetward list`: show what a fleet run would act on.

use std::sync::Arc;

use fleetward::RepoInfo;
use fleetward::fleet::{Eligibility, SelectionMode, list_repositories, probe};

use crate::FilterOptions;
use crate::commands::limits::OutputFormat;
use crate::commands::shared::{build_client, list_options, selection};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// One listed repository.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RepoRow {
    #[tabled(rename = "Repository")]
    pub repository: String,
    #[tabled(rename = "Default Branch")]
    pub default_branch: String,
    #[tabled(rename = "Archived")]
    pub archived: bool,
    #[tabled(rename = "Eligible")]
    pub eligible: String,
}

impl RepoRow {
    fn new(repo: &RepoInfo, eligibility: Option<Eligibility>) -> Self {
        let eligible = match eligibility {
            None => "-".to_string(),
            Some(Eligibility::Eligible) => "yes".to_string(),
            Some(Eligibility::Ineligible(reason)) => format!("no: {reason}"),
        };
        Self {
            repository: repo.id.to_string(),
            default_branch: repo.default_branch.clone(),
            archived: repo.archived,
            eligible,
        }
    }
}

pub(crate) async fn handle_list(
    filters: FilterOptions,
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config, false)?;
    let (org, options) = list_options(&filters, config)?;

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let result = list_repositories(&client, &org, &options, Some(&callback)).await;
    reporter.finish();
    let repos = result?;

    let mode = selection(&filters);
    let mut rows = Vec::with_capacity(repos.len());
    for repo in &repos {
        let eligibility = match mode {
            SelectionMode::All => None,
            SelectionMode::ReleaseGated => Some(probe(&client, &repo.id, mode).await?),
        };
        rows.push(RepoRow::new(repo, eligibility));
    }

    print_rows(rows, output)?;
    Ok(())
}

fn print_rows(rows: Vec<RepoRow>, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            let count = rows.len();
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{table}");
            println!("{count} repositories");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
