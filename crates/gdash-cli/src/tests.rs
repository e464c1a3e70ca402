//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Timelike};
use gdash_core::collector::{CollectorConfig, OpenMeteoProvider};
use gdash_core::db::Database;
use gdash_core::models::{UserRole, WeatherLogFilter};
use gdash_core::test_utils::MockOpenMeteoServer;
use tempfile::TempDir;

use crate::cli::FileFormat;
use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

// ========== Filter Tests ==========

#[test]
fn test_build_filter_dates() {
    let filter = commands::build_filter(Some("2024-01-10"), Some("2024-01-12"), Some(" Goiânia "))
        .unwrap();

    let from = filter.from.unwrap();
    assert_eq!((from.day(), from.hour()), (10, 0));
    let to = filter.to.unwrap();
    assert_eq!((to.day(), to.hour(), to.minute()), (12, 23, 59));
    assert_eq!(filter.location.as_deref(), Some("Goiânia"));
    assert!(filter.limit.is_none());
}

#[test]
fn test_build_filter_rejects_bad_input() {
    assert!(commands::build_filter(Some("yesterday"), None, None).is_err());
    assert!(commands::build_filter(Some("2024-02-01"), Some("2024-01-01"), None).is_err());
}

#[test]
fn test_build_filter_blank_location() {
    let filter = commands::build_filter(None, None, Some("   ")).unwrap();
    assert!(filter.location.is_none());
}

// ========== Weather Command Tests ==========

#[test]
fn test_cmd_add() {
    let db = setup_test_db();
    let log = commands::manual_log(
        Some("Goiânia, BR".to_string()),
        Some(-1.5),
        Some(40.0),
        None,
        Some("frost".to_string()),
        Some("2024-07-01T06:00:00Z"),
    )
    .unwrap();

    commands::cmd_add(&db, log.clone()).unwrap();
    // Adding the same reading twice is skipped, not an error
    commands::cmd_add(&db, log).unwrap();

    let logs = db.all_weather_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].temperature, Some(-1.5));
    assert_eq!(logs[0].source.as_deref(), Some(commands::MANUAL_SOURCE));
}

#[test]
fn test_manual_log_requires_a_field() {
    let result = commands::manual_log(None, None, None, None, Some("  ".to_string()), None);
    assert!(result.is_err());
}

#[test]
fn test_manual_log_defaults_to_now() {
    let log = commands::manual_log(None, Some(25.0), None, None, None, None).unwrap();
    let age = chrono::Utc::now() - log.timestamp.unwrap();
    assert!(age.num_seconds() < 5);
    assert!(log.import_hash.is_some());
}

#[test]
fn test_cmd_sample() {
    let db = setup_test_db();
    commands::cmd_sample(&db, 3).unwrap();

    let logs = db.all_weather_logs().unwrap();
    assert_eq!(logs.len(), 3);
    for log in logs {
        assert_eq!(log.source.as_deref(), Some("sample"));
        let t = log.temperature.unwrap();
        assert!((30.0..=33.0).contains(&t));
    }
}

#[test]
fn test_cmd_logs() {
    let db = setup_test_db();
    assert!(commands::cmd_logs(&db, 10).is_ok());

    commands::cmd_sample(&db, 2).unwrap();
    assert!(commands::cmd_logs(&db, 10).is_ok());
}

#[test]
fn test_cmd_insights() {
    let db = setup_test_db();
    assert!(commands::cmd_insights(&db, &WeatherLogFilter::default(), false).is_ok());

    commands::cmd_sample(&db, 2).unwrap();
    assert!(commands::cmd_insights(&db, &WeatherLogFilter::default(), true).is_ok());

    let filter = commands::build_filter(None, None, Some("fortaleza")).unwrap();
    assert!(commands::cmd_insights(&db, &filter, false).is_ok());
}

// ========== Import/Export Tests ==========

#[test]
fn test_cmd_import_csv() {
    let db = setup_test_db();
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "logs.csv",
        "timestamp,location,temperature,humidity,windSpeed,condition\n\
         2024-01-15T06:00:00Z,Goiânia,21.0,80,5.0,clear\n\
         2024-01-15T09:00:00Z,Goiânia,26.5,65,8.0,clear\n\
         ,,,,,\n",
    );

    commands::cmd_import(&db, &path, None).unwrap();
    assert_eq!(db.all_weather_logs().unwrap().len(), 2);

    // Importing the same file again only finds duplicates
    commands::cmd_import(&db, &path, None).unwrap();
    assert_eq!(db.all_weather_logs().unwrap().len(), 2);

    let entries = db.list_audit_log(10).unwrap();
    assert!(entries.iter().any(|e| e.action == "import"));
}

#[test]
fn test_cmd_import_json_with_explicit_format() {
    let db = setup_test_db();
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "backup.txt",
        r#"[{"timestamp":"2024-01-15T06:00:00Z","location":"Goiânia","temperature":21.0},
            {"timestamp":"2024-01-15T07:00:00Z","location":"Goiânia","temperature":"n/a"}]"#,
    );

    // The extension says nothing about the format
    assert!(commands::cmd_import(&db, &path, None).is_err());

    commands::cmd_import(&db, &path, Some(FileFormat::Json)).unwrap();
    let logs = db.all_weather_logs().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].temperature, None);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let result = commands::cmd_import(&db, Path::new("/nonexistent/logs.csv"), None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_export_to_file() {
    let db = setup_test_db();
    commands::cmd_sample(&db, 2).unwrap();
    let dir = TempDir::new().unwrap();

    let csv_path = dir.path().join("out.csv");
    commands::cmd_export(
        &db,
        &WeatherLogFilter::default(),
        FileFormat::Csv,
        Some(&csv_path),
    )
    .unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("id,timestamp,location"));

    let json_path = dir.path().join("out.json");
    commands::cmd_export(
        &db,
        &WeatherLogFilter::default(),
        FileFormat::Json,
        Some(&json_path),
    )
    .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[test]
fn test_export_then_import_into_fresh_db() {
    let db = setup_test_db();
    commands::cmd_sample(&db, 3).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.json");
    commands::cmd_export(&db, &WeatherLogFilter::default(), FileFormat::Json, Some(&path)).unwrap();

    let fresh = setup_test_db();
    commands::cmd_import(&fresh, &path, None).unwrap();

    let original = db.all_weather_logs().unwrap();
    let restored = fresh.all_weather_logs().unwrap();
    assert_eq!(restored.len(), original.len());
    for (a, b) in original.iter().zip(&restored) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.temperature, b.temperature);
    }
}

// ========== Collector Tests ==========

#[tokio::test]
async fn test_collect_with_mock_provider() {
    let server = MockOpenMeteoServer::start().await;
    let db = setup_test_db();
    let config = CollectorConfig {
        base_url: server.url(),
        ..Default::default()
    };
    let provider = OpenMeteoProvider::from_config(&config).unwrap();

    commands::collect_with(&db, &provider, &config).await.unwrap();

    let logs = db.all_weather_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].temperature, Some(27.5));
    assert_eq!(logs[0].location.as_deref(), Some(config.station.name.as_str()));
}

#[tokio::test]
async fn test_collect_with_failing_provider() {
    let server = MockOpenMeteoServer::start_failing().await;
    let db = setup_test_db();
    let config = CollectorConfig {
        base_url: server.url(),
        ..Default::default()
    };
    let provider = OpenMeteoProvider::from_config(&config).unwrap();

    assert!(commands::collect_with(&db, &provider, &config).await.is_err());
    assert!(db.all_weather_logs().unwrap().is_empty());
}

#[test]
fn test_collection_requested_by_flags() {
    assert!(commands::collection_requested(true, None));
    assert!(commands::collection_requested(
        false,
        Some(Path::new("collector.toml"))
    ));
}

// ========== User Command Tests ==========

#[test]
fn test_cmd_users_add_and_list() {
    let db = setup_test_db();
    commands::cmd_users_add(&db, "Admin", "Admin@Example.com", "secret-pass", true).unwrap();
    commands::cmd_users_add(&db, "Viewer", "viewer@example.com", "secret-pass", false).unwrap();
    assert!(commands::cmd_users_list(&db).is_ok());

    let admin = db.get_user_by_email("admin@example.com").unwrap().unwrap();
    assert_eq!(admin.role, UserRole::Admin);
    assert!(db
        .verify_credentials("admin@example.com", "secret-pass")
        .unwrap()
        .is_some());
}

#[test]
fn test_cmd_users_add_rejects_short_password() {
    let db = setup_test_db();
    assert!(commands::cmd_users_add(&db, "Admin", "admin@example.com", "123", true).is_err());
    assert_eq!(db.count_users().unwrap(), 0);
}

#[test]
fn test_cmd_users_delete() {
    let db = setup_test_db();
    commands::cmd_users_add(&db, "Admin", "admin@example.com", "secret-pass", true).unwrap();
    commands::cmd_users_add(&db, "Viewer", "viewer@example.com", "secret-pass", false).unwrap();

    // The only admin stays
    assert!(commands::cmd_users_delete(&db, "admin@example.com").is_err());

    commands::cmd_users_delete(&db, "viewer@example.com").unwrap();
    assert_eq!(db.count_users().unwrap(), 1);
    assert!(commands::cmd_users_delete(&db, "viewer@example.com").is_err());
}

// ========== Status/Reset Tests ==========

#[test]
fn test_cmd_status_missing_db() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.db");
    assert!(commands::cmd_status(&path, true).is_ok());
}

#[test]
fn test_cmd_init_and_reset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gdash.db");

    commands::cmd_init(&path, true).unwrap();
    let db = commands::open_db(&path, true).unwrap();
    commands::cmd_sample(&db, 2).unwrap();
    commands::cmd_users_add(&db, "Admin", "admin@example.com", "secret-pass", true).unwrap();
    assert!(commands::cmd_status(&path, true).is_ok());

    commands::cmd_reset(&path, true, true).unwrap();

    assert!(db.all_weather_logs().unwrap().is_empty());
    assert_eq!(db.count_users().unwrap(), 1);
}

#[test]
fn test_cmd_reset_missing_db() {
    let dir = TempDir::new().unwrap();
    assert!(commands::cmd_reset(&dir.path().join("missing.db"), true, true).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer string", 10), "a much ...");
    assert_eq!(truncate("Goiânia, Goiás, BR", 10), "Goiânia...");
}
