//! carelog-core - Core library for Carelog
//!
//! This crate contains the shared models, the local sync bookkeeping
//! database, and the offline-first sync engine used by every Carelog client.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use config::{SyncConfig, TieBreak};
pub use error::{DomainError, Error, Result};
pub use models::{EntityType, SyncMapping, SyncMetadata, SyncRecord};
pub use services::SyncDatabase;
pub use sync::{SyncOrchestrator, SyncResult, SyncState};
