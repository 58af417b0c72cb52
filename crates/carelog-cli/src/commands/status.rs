use std::path::Path;

use crate::commands::common::{build_status_report, current_time_ms, format_status_lines};
use crate::error::CliError;

pub async fn run_status(scope: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let report = build_status_report(scope, db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report, current_time_ms()) {
            println!("{line}");
        }
    }

    Ok(())
}
