//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, build_filter)
//! - `weather` - Weather log commands (logs, add, sample, insights)
//! - `import` - Import/export commands (JSON and CSV)
//! - `collect` - One-shot Open-Meteo collection
//! - `users` - User management commands
//! - `serve` - Web server command
//! - `status` - Status/reset commands

pub mod collect;
pub mod core;
pub mod import;
pub mod serve;
pub mod status;
pub mod users;
pub mod weather;

// Re-export command functions for main.rs
pub use collect::*;
pub use core::*;
pub use import::*;
pub use serve::*;
pub use status::*;
pub use users::*;
pub use weather::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
