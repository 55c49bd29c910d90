use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use leapgrid_core::config::{parse_clock_time, RunConfig};
use leapgrid_core::snapshot::{persist_artifacts, run_snapshot, SessionWindow};
use leapgrid_core::ValidationError;

use crate::cli::{Cli, SnapshotArgs};
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &SnapshotArgs, cli: &Cli) -> Result<CommandResult, CliError> {
    let config = RunConfig::load(&args.config)?;
    let client = super::build_client(cli)?;

    let as_of = match &args.as_of {
        Some(raw) => parse_as_of(raw)?,
        None => exchange_local_now(config.session_utc_offset_hours),
    };
    let window = SessionWindow::for_day(&config, as_of)?;

    let report = run_snapshot(&client, &config, window).await;

    if !args.dry_run {
        persist_artifacts(&report, &config)?;
    }

    let warnings = report.warnings.clone();
    let data = serde_json::to_value(&report)?;
    Ok(CommandResult::ok(data).with_warnings(warnings))
}

/// Exchange-local "now" from the configured fixed UTC offset.
fn exchange_local_now(utc_offset_hours: i8) -> PrimitiveDateTime {
    let local = OffsetDateTime::now_utc() + time::Duration::hours(i64::from(utc_offset_hours));
    PrimitiveDateTime::new(local.date(), local.time())
}

fn parse_as_of(raw: &str) -> Result<PrimitiveDateTime, CliError> {
    let invalid = || ValidationError::InvalidTimestamp {
        value: raw.to_owned(),
    };

    let (date_part, clock_part) = raw.trim().split_once(' ').ok_or_else(invalid)?;
    let date = Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .map_err(|_| invalid())?;
    let clock = parse_clock_time(clock_part).map_err(|_| invalid())?;
    Ok(PrimitiveDateTime::new(date, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn as_of_parses_minute_precision() {
        let parsed = parse_as_of("2026-02-20 13:45").expect("parses");
        assert_eq!(parsed, datetime!(2026 - 02 - 20 13:45:00));
    }

    #[test]
    fn as_of_rejects_date_only_input() {
        assert!(parse_as_of("2026-02-20").is_err());
    }
}
