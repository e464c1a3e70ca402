//! Import and export command implementations

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gdash_core::{
    db::Database,
    export::ExportFormat,
    import::{parse_weather_file, ImportFormat},
    models::WeatherLogFilter,
};

use crate::cli::FileFormat;

impl From<FileFormat> for ImportFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Csv => ImportFormat::Csv,
            FileFormat::Json => ImportFormat::Json,
        }
    }
}

impl From<FileFormat> for ExportFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Csv => ExportFormat::Csv,
            FileFormat::Json => ExportFormat::Json,
        }
    }
}

pub fn cmd_import(db: &Database, file: &Path, format: Option<FileFormat>) -> Result<()> {
    let format = match format {
        Some(f) => f.into(),
        None => ImportFormat::from_path(file).ok_or_else(|| {
            anyhow::anyhow!(
                "Could not detect the format of {}.\nSpecify --format json or --format csv",
                file.display()
            )
        })?,
    };

    println!("📥 Importing weather logs from {}...", file.display());

    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?,
    );
    let logs = parse_weather_file(reader, format)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let stats = db.import_weather_logs(&logs)?;

    db.log_audit(
        "cli",
        "import",
        Some("weather_log"),
        None,
        Some(&format!(
            "file={} imported={} duplicates={}",
            file.display(),
            stats.imported,
            stats.duplicates
        )),
    )?;

    println!();
    println!("📊 Import Results");
    println!("   ─────────────────────────────");
    println!("   Records read: {}", stats.parsed);
    println!("   ✅ Imported: {}", stats.imported);
    if stats.duplicates > 0 {
        println!("   ⏭️  Duplicates skipped: {}", stats.duplicates);
    }
    if stats.skipped > 0 {
        println!("   ⚠️  Empty records skipped: {}", stats.skipped);
    }

    Ok(())
}

pub fn cmd_export(
    db: &Database,
    filter: &WeatherLogFilter,
    format: FileFormat,
    output: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format.into();
    let content = db.export_weather(filter, format)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?;
            file.write_all(content.as_bytes())?;
            db.log_audit(
                "cli",
                "export",
                Some("weather_log"),
                None,
                Some(&format!("format={} file={}", format.extension(), path.display())),
            )?;
            eprintln!("✅ Exported weather logs to {}", path.display());
        }
        None => {
            std::io::stdout().write_all(content.as_bytes())?;
        }
    }

    Ok(())
}
