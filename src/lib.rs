pub mod access;
pub mod config;
pub mod db;
pub mod diagnoses;
pub mod error;
pub mod models;
pub mod notes;
pub mod readings;
pub mod summary;
pub mod users;

pub use error::ServiceError;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
