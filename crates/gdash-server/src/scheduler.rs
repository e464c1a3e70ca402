//! Background weather collection
//!
//! Enabled by `GDASH_COLLECT_INTERVAL_SECS` (or `gdash serve --collect`).
//! Every tick fetches the current conditions for the configured station and
//! stores them. A failed fetch is logged and retried on the next tick.

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use gdash_core::collector::{collect_once, CollectorConfig, OpenMeteoProvider, WeatherProvider};
use gdash_core::Database;

/// Actor recorded in the audit log for collected readings
const SCHEDULER_ACTOR: &str = "collector";

/// Start the collector as a background task using the Open-Meteo provider
pub fn start_collector_scheduler(db: Database, config: CollectorConfig) -> anyhow::Result<()> {
    let provider = OpenMeteoProvider::from_config(&config)?;
    spawn_collector(db, Arc::new(provider), config);
    Ok(())
}

/// Start the collector with any provider
pub fn spawn_collector(
    db: Database,
    provider: Arc<dyn WeatherProvider>,
    config: CollectorConfig,
) -> tokio::task::JoinHandle<()> {
    info!(
        station = %config.station.name,
        provider = provider.name(),
        "Starting collector: every {} seconds",
        config.interval.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = interval(config.interval);
        // A slow provider should not cause a burst of catch-up requests
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately, so a reading is taken at startup
            ticker.tick().await;
            run_collection(&db, provider.as_ref(), &config).await;
        }
    })
}

async fn run_collection(db: &Database, provider: &dyn WeatherProvider, config: &CollectorConfig) {
    match collect_once(db, provider, config).await {
        Ok(log) => {
            let id = log.id.as_deref().and_then(|id| id.parse::<i64>().ok());
            if let Err(e) = db.log_audit(
                SCHEDULER_ACTOR,
                "create",
                Some("weather_log"),
                id,
                Some(provider.name()),
            ) {
                warn!("Failed to log collected reading to audit: {}", e);
            }
        }
        Err(e) => {
            error!(station = %config.station.name, "Scheduled collection failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdash_core::test_utils::MockOpenMeteoServer;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collector_stores_readings() {
        let server = MockOpenMeteoServer::start().await;
        let db = Database::in_memory().unwrap();
        let config = CollectorConfig {
            base_url: server.url(),
            interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let provider = Arc::new(OpenMeteoProvider::from_config(&config).unwrap());

        let handle = spawn_collector(db.clone(), provider, config);

        // The first tick fires immediately; the audit entry is written last
        let mut audited = false;
        for _ in 0..100 {
            audited = db
                .list_audit_log(10)
                .unwrap()
                .iter()
                .any(|e| e.user_email == "collector");
            if audited {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        handle.abort();

        assert!(audited);
        assert_eq!(db.all_weather_logs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_collection_keeps_running() {
        let server = MockOpenMeteoServer::start_failing().await;
        let db = Database::in_memory().unwrap();
        let config = CollectorConfig {
            base_url: server.url(),
            ..Default::default()
        };
        let provider = OpenMeteoProvider::from_config(&config).unwrap();

        run_collection(&db, &provider, &config).await;
        assert!(db.all_weather_logs().unwrap().is_empty());
    }
}
