use std::env;
use std::path::{Path, PathBuf};

use carelog_core::config::parse_sync_config;
use carelog_core::models::{EntityType, SyncConflict, SyncMapping};
use carelog_core::sync::WatermarkStore;
use carelog_core::util::{format_timestamp, normalize_text_option, now_millis};
use carelog_core::{SyncConfig, SyncDatabase};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub scope: String,
    pub last_sync_time: Option<i64>,
    pub last_sync_time_iso: Option<String>,
    pub mappings: Vec<MappingCount>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct MappingCount {
    pub entity_type: EntityType,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MappingItem {
    pub local_id: i64,
    pub remote_id: String,
    pub last_synced_at: i64,
    pub last_synced_at_iso: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entity_type: EntityType,
    pub local_id: i64,
    pub remote_id: String,
    pub local_updated_at: i64,
    pub remote_updated_at: i64,
    pub winner: String,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub async fn build_status_report(scope: &str, db_path: &Path) -> Result<StatusReport, CliError> {
    let scope = normalize_scope(scope)?;
    let db = open_database(db_path).await?;

    let last_sync_time = db.load(&scope).await?;
    let counts = db.count_mappings_by_type().await?;
    let mappings = EntityType::ALL
        .iter()
        .map(|entity_type| MappingCount {
            entity_type: *entity_type,
            count: counts
                .iter()
                .find(|(counted, _)| counted == entity_type)
                .map_or(0, |(_, count)| *count),
        })
        .collect();

    Ok(StatusReport {
        scope,
        last_sync_time,
        last_sync_time_iso: last_sync_time.map(format_timestamp),
        mappings,
    })
}

pub fn format_status_lines(report: &StatusReport, now_ms: i64) -> Vec<String> {
    let last_sync = report.last_sync_time.map_or_else(
        || "never".to_string(),
        |timestamp| {
            format!(
                "{} ({})",
                format_timestamp(timestamp),
                format_relative_time(timestamp, now_ms)
            )
        },
    );

    let mut lines = vec![
        format!("Scope:      {}", report.scope),
        format!("Last sync:  {last_sync}"),
        "Mappings:".to_string(),
    ];
    lines.extend(report.mappings.iter().map(|mapping| {
        format!(
            "  {:<16} {}",
            mapping.entity_type.display_name(),
            mapping.count
        )
    }));
    lines
}

pub fn parse_entity_type(value: &str) -> Result<EntityType, CliError> {
    Ok(value.parse::<EntityType>()?)
}

pub fn mapping_to_item(mapping: &SyncMapping) -> MappingItem {
    MappingItem {
        local_id: mapping.local_id,
        remote_id: mapping.remote_id.clone(),
        last_synced_at: mapping.last_synced_at,
        last_synced_at_iso: format_timestamp(mapping.last_synced_at),
    }
}

pub fn format_mapping_lines(mappings: &[SyncMapping]) -> Vec<String> {
    mappings
        .iter()
        .map(|mapping| {
            format!(
                "{:>8}  {}  synced {}",
                mapping.local_id,
                mapping.remote_id,
                format_timestamp(mapping.last_synced_at)
            )
        })
        .collect()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entity_type: conflict.entity_type,
        local_id: conflict.local_id,
        remote_id: conflict.remote_id.clone(),
        local_updated_at: conflict.local_updated_at,
        remote_updated_at: conflict.remote_updated_at,
        winner: conflict.winner.to_string(),
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}={}  local={} remote={}  winner={}",
                format_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.entity_type,
                conflict.local_id,
                conflict.local_updated_at,
                conflict.remote_updated_at,
                conflict.winner
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn current_time_ms() -> i64 {
    now_millis()
}

pub fn normalize_scope(scope: &str) -> Result<String, CliError> {
    normalize_text_option(Some(scope.to_string())).ok_or(CliError::EmptyScope)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env_path("CARELOG_DB_PATH"))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carelog")
        .join("carelog.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env_path("CARELOG_CONFIG"))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carelog")
        .join("sync.json")
}

fn env_path(name: &str) -> Option<PathBuf> {
    normalize_text_option(env::var(name).ok()).map(PathBuf::from)
}

/// Load the sync config; a missing file means defaults.
pub fn load_sync_config(path: &Path) -> Result<SyncConfig, CliError> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    let payload = std::fs::read_to_string(path)?;
    parse_sync_config(&payload).map_err(|error| CliError::Config(error.to_string()))
}

pub async fn open_database(path: &Path) -> Result<SyncDatabase, CliError> {
    tracing::debug!("Opening sync database at {}", path.display());
    Ok(SyncDatabase::open_path(path).await?)
}
