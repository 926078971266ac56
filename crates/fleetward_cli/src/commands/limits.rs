use clap::ValueEnum;
use fleetward::HostingApi;
use fleetward::platform::RateLimitInfo;

use crate::commands::shared::build_client;
use crate::config::Config;

/// Output format for tables and reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config, false)?;
    let info = client.rate_limit().await?;
    RateLimitDisplay::from_info("core", &info).print(output)?;
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_info(name: &str, info: &RateLimitInfo) -> Self {
        let used = info.limit.saturating_sub(info.remaining);
        let usage_percent = if info.limit > 0 {
            (used as f64 / info.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_duration = info.reset_at.signed_duration_since(chrono::Utc::now());
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: info.limit.to_string(),
            used: used.to_string(),
            remaining: info.remaining.to_string(),
            usage_percent: format!("{usage_percent:.1}%"),
            reset_at: info.reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }

    pub(crate) fn print(self, format: OutputFormat) -> Result<(), serde_json::Error> {
        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(vec![self]);
                table.with(tabled::settings::Style::rounded());
                println!("{table}");
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&self)?);
            }
        }
        Ok(())
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{total_secs}s")
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{mins}m {secs}s")
        } else {
            format!("{mins}m")
        }
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins > 0 {
            format!("{hours}h {mins}m")
        } else {
            format!("{hours}h")
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn output_format_default_is_table() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[test]
    fn format_duration_handles_seconds_minutes_and_hours() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(120)), "2m");
        assert_eq!(format_duration(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(Duration::seconds(3900)), "1h 5m");
    }

    #[test]
    fn display_derives_usage_from_remaining() {
        let info = RateLimitInfo {
            limit: 5000,
            remaining: 4000,
            reset_at: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            retry_after: None,
        };

        let display = RateLimitDisplay::from_info("core", &info);
        assert_eq!(display.used, "1000");
        assert_eq!(display.usage_percent, "20.0%");
        assert_eq!(display.reset_at, "2000-01-01 00:00:00 UTC");
        assert_eq!(display.reset_in, "now");
    }

    #[test]
    fn zero_limit_does_not_divide_by_zero() {
        let info = RateLimitInfo {
            limit: 0,
            remaining: 0,
            reset_at: Utc::now() + Duration::minutes(5),
            retry_after: None,
        };
        let display = RateLimitDisplay::from_info("core", &info);
        assert_eq!(display.usage_percent, "0.0%");
        assert_ne!(display.reset_in, "now");
    }
}
