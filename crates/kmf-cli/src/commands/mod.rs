//! CLI commands

pub mod export;
pub mod migrate;
pub mod repo;
