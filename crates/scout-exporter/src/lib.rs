//! # scout-exporter
//!
//! The cloudscout exporter daemon (scoutd).
//!
//! This crate wires the collection core to the outside world: it resolves
//! the monitored project list, registers the per-resource-family collectors,
//! and serves the Prometheus text exposition over HTTP.

pub mod endpoint;
pub mod exporter;

// Re-export commonly used types
pub use endpoint::MetricsEndpoint;
pub use exporter::Exporter;

use scout_core::LoggingConfig;

// Error handling
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Core error: {0}")]
    Core(#[from] scout_core::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;

/// Initialize the exporter with logging and tracing
pub async fn init_exporter(config: &scout_core::Config) -> Result<Exporter> {
    // Initialize logging
    init_logging(&config.logging)?;

    tracing::info!("Initializing cloudscout exporter");

    let exporter = Exporter::new(config.clone()).await?;

    Ok(exporter)
}

/// Initialize logging and tracing
fn init_logging(logging_config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging_config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(logging_config.show_target)
        .with_thread_ids(logging_config.show_thread_ids)
        .with_line_number(logging_config.show_line_numbers);

    match logging_config.format.as_str() {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use scout_core::Config;

    #[test]
    fn test_default_config_is_runnable() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.network.metrics_port > 0);
    }
}
