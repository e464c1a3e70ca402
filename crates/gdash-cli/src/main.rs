//! GDASH CLI - Climate log dashboard
//!
//! Usage:
//!   gdash init                    Initialize database
//!   gdash import --file logs.csv  Import weather logs (JSON or CSV)
//!   gdash insights                Show weather insights
//!   gdash serve --port 3000       Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            collect,
            collector_config,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                collect,
                collector_config.as_deref(),
            )
            .await
        }
        Commands::Insights {
            json,
            from,
            to,
            location,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let filter =
                commands::build_filter(from.as_deref(), to.as_deref(), location.as_deref())?;
            commands::cmd_insights(&db, &filter, json)
        }
        Commands::Logs { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_logs(&db, limit)
        }
        Commands::Add {
            location,
            temperature,
            humidity,
            wind_speed,
            condition,
            timestamp,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let log = commands::manual_log(
                location,
                temperature,
                humidity,
                wind_speed,
                condition,
                timestamp.as_deref(),
            )?;
            commands::cmd_add(&db, log)
        }
        Commands::Sample { count } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_sample(&db, count)
        }
        Commands::Import { file, format } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, format)
        }
        Commands::Export {
            format,
            output,
            from,
            to,
            location,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let filter =
                commands::build_filter(from.as_deref(), to.as_deref(), location.as_deref())?;
            commands::cmd_export(&db, &filter, format, output.as_deref())
        }
        Commands::Collect { config } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_collect(&db, config.as_deref()).await
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
                Some(UsersAction::Add {
                    name,
                    email,
                    password,
                    admin,
                }) => {
                    let password = match password {
                        Some(p) => p,
                        None => std::env::var(commands::NEW_PASSWORD_ENV).map_err(|_| {
                            anyhow::anyhow!(
                                "Pass --password or set {}",
                                commands::NEW_PASSWORD_ENV
                            )
                        })?,
                    };
                    commands::cmd_users_add(&db, &name, &email, &password, admin)
                }
                Some(UsersAction::Delete { email }) => commands::cmd_users_delete(&db, &email),
            }
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Reset { yes } => commands::cmd_reset(&cli.db, yes, cli.no_encrypt),
    }
}
