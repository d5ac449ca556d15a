use std::path::PathBuf;

use chrono::Duration;
use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Glycemia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Band boundaries (mmol/L) used when a patient has none set.
pub const DEFAULT_GLYCEMIC_RANGES: [f64; 4] = [3.0, 3.9, 10.0, 13.9];

/// Target time fractions used when a patient has none set.
pub const DEFAULT_GLYCEMIC_TARGETS: [f64; 5] = [0.01, 0.04, 0.7, 0.25, 0.05];

/// Trailing window a summary is computed over.
pub const SUMMARY_WINDOW_DAYS: i64 = 14;

/// How long a computed summary is reused.
pub const SUMMARY_TTL_HOURS: i64 = 12;

/// Get the application data directory
/// ~/Glycemia/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Path of the SQLite database. `GLYCEMIA_DB` overrides the default location.
pub fn database_path() -> PathBuf {
    std::env::var_os("GLYCEMIA_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join("glycemia.db"))
}

/// Log filter applied when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "glycemia=info,warn"
}

/// Tunables of the summary cache builder.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySettings {
    pub window_days: i64,
    pub ttl_hours: i64,
}

impl SummarySettings {
    pub fn window(&self) -> Duration {
        Duration::days(self.window_days)
    }

    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            window_days: SUMMARY_WINDOW_DAYS,
            ttl_hours: SUMMARY_TTL_HOURS,
        }
    }
}
