//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use gdash_core::collector::{CollectorConfig, ENV_INTERVAL};

use super::open_db;

/// Whether background collection should run for `gdash serve`
pub fn collection_requested(collect_flag: bool, config_path: Option<&Path>) -> bool {
    collect_flag
        || config_path.is_some()
        || std::env::var(ENV_INTERVAL)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    collect: bool,
    collector_config: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting GDASH web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let mut config = gdash_server::ServerConfig::from_env();
    config.require_auth = !no_auth;

    if collection_requested(collect, collector_config) {
        let collector =
            CollectorConfig::load(collector_config).context("Failed to load collector config")?;
        println!(
            "   📡 Collector: {} every {}s",
            collector.station.name,
            collector.interval.as_secs()
        );
        config.collector = Some(collector);
    }

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: session tokens (POST /api/users/login)");
        if !config.api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured ({})",
                config.api_keys.len(),
                gdash_server::ENV_API_KEYS
            );
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = match static_dir {
        Some(p) => Some(
            p.to_str()
                .context("static_dir path must be valid UTF-8")?,
        ),
        None => None,
    };
    gdash_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
