//! Services wrapping the local database

mod database;

pub use database::SyncDatabase;
