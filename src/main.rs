// ABOUTME: CLI entry point for table-archiver
// ABOUTME: Parses commands, installs logging and routes to the command handlers

use chrono::{Local, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use table_archiver::commands::{self, ArchiveArgs, ExportArgs};
use table_archiver::config::{self, ConnectionOverrides};
use table_archiver::logging;

#[derive(Parser)]
#[command(name = "table-archiver")]
#[command(about = "Move aged rows out of a live MySQL table into a dated archive table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonFlags {
    /// Database name (required here or in the config file)
    #[arg(long)]
    database: Option<String>,
    /// MySQL host [default: localhost]
    #[arg(long)]
    host: Option<String>,
    /// MySQL port [default: 3306]
    #[arg(long)]
    port: Option<u16>,
    /// MySQL user [default: root]
    #[arg(long)]
    user: Option<String>,
    /// MySQL password [default: empty]
    #[arg(long)]
    password: Option<String>,
    /// TOML config file with [connection] and [archive] sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for the run log file [default: .]
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Use UTC instead of local time for the cutoff and all timestamps
    #[arg(long)]
    utc: bool,
}

impl CommonFlags {
    fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Move rows older than the retention window into <table>_archive_<YYYYMMDD>
    Archive {
        /// Table to archive
        #[arg(long)]
        table: String,
        #[command(flatten)]
        common: CommonFlags,
        /// Retention window in days [default: 90]
        #[arg(long)]
        days: Option<u32>,
        /// Report what would be archived without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Dump the archive table to a .sql file after archiving
        #[arg(long)]
        export_sql: bool,
        /// Dump the archive table to a .csv file after archiving
        #[arg(long)]
        export_csv: bool,
        /// Directory for dump files [default: ./archives]
        #[arg(long)]
        export_path: Option<PathBuf>,
        /// Date/time column measuring row age (selected automatically if omitted)
        #[arg(long)]
        date_column: Option<String>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Dump an existing table to SQL and/or CSV (both if neither flag is given)
    Export {
        /// Table to export
        #[arg(long)]
        table: String,
        #[command(flatten)]
        common: CommonFlags,
        /// Write a .sql dump
        #[arg(long)]
        sql: bool,
        /// Write a .csv dump
        #[arg(long)]
        csv: bool,
        /// Directory for dump files [default: ./archives]
        #[arg(long)]
        export_path: Option<PathBuf>,
    },
}

fn reference_instant(utc: bool) -> NaiveDateTime {
    if utc {
        Utc::now().naive_utc()
    } else {
        Local::now().naive_local()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let common = match &cli.command {
        Commands::Archive { common, .. } | Commands::Export { common, .. } => common,
    };
    let started_at = reference_instant(common.utc);
    let file_config = config::load_optional_config(common.config.as_deref())?;
    let log_path = logging::init(&file_config.log_dir(common.log_dir.clone()), started_at)?;
    tracing::info!("Logging to {}", log_path.display());

    match cli.command {
        Commands::Archive {
            table,
            common,
            days,
            dry_run,
            export_sql,
            export_csv,
            export_path,
            date_column,
            yes,
        } => {
            let args = ArchiveArgs {
                table,
                connection: common.overrides(),
                days,
                dry_run,
                export_sql,
                export_csv,
                export_path,
                date_column,
                yes,
            };
            commands::archive(args, &file_config, started_at).await
        }
        Commands::Export {
            table,
            common,
            sql,
            csv,
            export_path,
        } => {
            let args = ExportArgs {
                table,
                connection: common.overrides(),
                sql,
                csv,
                export_path,
            };
            commands::export(args, &file_config, started_at).await
        }
    }
}
