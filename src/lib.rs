// ABOUTME: Library module for table-archiver
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod archive;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod logging;
pub mod mysql;
pub mod schema;
pub mod utils;
pub mod value;
