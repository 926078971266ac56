//! freeze / thaw / migrate: one action across the selected repositories.

use std::sync::Arc;
use std::time::Duration;

use console::{Term, style};
use fleetward::fleet::{FleetReport, ItemResult, ItemStatus, RunOptions};
use fleetward::{FleetRunner, MigrationAction, MigrationStrategy, Step, TransitionEngine};

use crate::commands::limits::OutputFormat;
use crate::commands::shared::{build_client, display_rate_limit, resolve_target, selection};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::is_shutdown_requested;
use crate::{RunArgs, TargetOptions};

pub(crate) async fn handle_run(
    action: MigrationAction,
    strategy: Option<MigrationStrategy>,
    target: TargetOptions,
    run: RunArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = match strategy {
        Some(strategy) => strategy,
        None => config.strategy()?,
    };
    let fail_on_error = run.fail_on_error || config.run.fail_on_error;
    let delay = run
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.delay());

    let client = build_client(config, run.no_rate_limit)?;
    let resolved = resolve_target(&target, config)?;
    let options = RunOptions::new(action, resolved)
        .with_selection(selection(&target.filters))
        .with_delay(delay);

    if matches!(run.output, OutputFormat::Table) {
        display_rate_limit(&client).await;
    }

    let engine = TransitionEngine::new(Arc::new(client))
        .with_strategy(strategy)
        .with_dry_run(run.dry_run);
    let reporter = Arc::new(ProgressReporter::new());
    let runner = FleetRunner::new(engine)
        .with_progress(reporter.as_callback())
        .with_stop_signal(Arc::new(is_shutdown_requested));

    let result = runner.run(&options).await;
    reporter.finish();
    let report = result?;

    print_report(&report, run.output)?;

    if fail_on_error && report.has_failures() {
        return Err(format!(
            "{} of {} repositories failed",
            report.counts.failed, report.counts.attempted
        )
        .into());
    }
    Ok(())
}

/// One report row.
#[derive(Debug, Clone, tabled::Tabled)]
struct ItemRow {
    #[tabled(rename = "Repository")]
    repo: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Steps")]
    steps: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&ItemResult> for ItemRow {
    fn from(item: &ItemResult) -> Self {
        Self {
            repo: item.repo.to_string(),
            status: item.status.to_string(),
            steps: item
                .steps
                .iter()
                .map(Step::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            detail: item.reason.clone().unwrap_or_default(),
        }
    }
}

fn print_report(
    report: &FleetReport,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => {
            if !report.items.is_empty() {
                let rows: Vec<ItemRow> = report.items.iter().map(ItemRow::from).collect();
                let mut table = tabled::Table::new(rows);
                table.with(tabled::settings::Style::rounded());
                println!("{table}");
            }
            if Term::stdout().is_term() {
                let summary = report.summary();
                if report.has_failures() {
                    println!("{}", style(summary).red().bold());
                } else {
                    println!("{}", style(summary).green().bold());
                }
                for item in report.failures() {
                    println!(
                        "  {} {}: {}",
                        style(ItemStatus::Failed).red(),
                        item.repo,
                        item.reason.as_deref().unwrap_or("unknown error")
                    );
                }
            } else {
                println!("{}", report.summary());
            }
        }
    }
    Ok(())
}
