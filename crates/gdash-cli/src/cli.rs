//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// GDASH - Climate log dashboard
#[derive(Parser)]
#[command(name = "gdash")]
#[command(about = "Self-hosted climate log dashboard with weather insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "gdash.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set GDASH_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every API route except login requires a session token
        /// or an API key.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (the web client build)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Collect readings from Open-Meteo in the background
        ///
        /// Also enabled by setting GDASH_COLLECT_INTERVAL_SECS.
        #[arg(long)]
        collect: bool,

        /// Collector config file (TOML with [station] and [collector] sections)
        #[arg(long)]
        collector_config: Option<PathBuf>,
    },

    /// Show weather insights for stored readings
    Insights {
        /// Print the raw insights as JSON
        #[arg(long)]
        json: bool,

        /// Start date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD for the whole day, or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Only readings whose location contains this text
        #[arg(short, long)]
        location: Option<String>,
    },

    /// List recent weather logs, newest first
    Logs {
        /// Number of logs to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Record a weather log by hand
    Add {
        /// Location label (e.g. "Goiânia, BR")
        #[arg(short, long)]
        location: Option<String>,

        /// Temperature in °C
        #[arg(short, long, allow_negative_numbers = true)]
        temperature: Option<f64>,

        /// Relative humidity in percent
        #[arg(long)]
        humidity: Option<f64>,

        /// Wind speed in km/h
        #[arg(long)]
        wind_speed: Option<f64>,

        /// Condition label (e.g. "clear", "rain")
        #[arg(short, long)]
        condition: Option<String>,

        /// Observation time (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Record a generated sample reading
    Sample {
        /// Number of readings to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Import weather logs from a JSON or CSV file
    Import {
        /// File to import (.json or .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// File format (detected from the extension if not specified)
        #[arg(long, value_enum)]
        format: Option<FileFormat>,
    },

    /// Export weather logs to CSV or JSON
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: FileFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD for the whole day, or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Only readings whose location contains this text
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Fetch one reading from Open-Meteo and store it
    Collect {
        /// Collector config file (defaults to the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Manage dashboard users
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Show database status (encryption, size, counts)
    Status,

    /// Delete all weather logs and audit entries (keeps users)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users
    List,

    /// Create a user
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Login email
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters); read from GDASH_NEW_PASSWORD if omitted
        #[arg(short, long)]
        password: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Delete a user by email
    Delete {
        /// Login email
        email: String,
    },
}
