//! Database layer for Carelog sync bookkeeping

mod conflict_repository;
mod connection;
mod mapping_repository;
mod migrations;
mod watermark_repository;

pub use conflict_repository::LibSqlConflictRepository;
pub use connection::Database;
pub use mapping_repository::LibSqlMappingRepository;
pub use watermark_repository::LibSqlWatermarkRepository;
