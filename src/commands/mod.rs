// ABOUTME: Command implementations for the archiver CLI
// ABOUTME: Exports the archive and export commands

pub mod archive;
pub mod export;

pub use archive::{archive, ArchiveArgs};
pub use export::{export, ExportArgs};
