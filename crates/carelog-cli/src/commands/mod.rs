pub mod common;
pub mod completions;
pub mod config;
pub mod conflicts;
pub mod mappings;
pub mod status;
