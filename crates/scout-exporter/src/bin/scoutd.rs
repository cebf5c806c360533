//! Main binary for the cloudscout exporter daemon (scoutd)

use clap::{Parser, Subcommand};
use scout_core::Config;
use scout_exporter::{init_exporter, ExporterError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "scoutd")]
#[command(about = "Prometheus exporter daemon for Google Cloud Platform resources")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Metrics listen address (overrides the configured one)
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default configuration
    Config {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { ref output }) => generate_config(output.clone()),
        Some(Commands::Validate { ref config }) => validate_config(config.clone()),
        None => run_exporter(&cli).await,
    }
}

async fn run_exporter(cli: &Cli) -> Result<()> {
    // Load configuration
    let mut config = if let Some(ref config_path) = cli.config {
        Config::load_from_file(config_path.clone())?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    if let Some(bind) = cli.bind {
        config.network.bind_ip = bind.ip();
        config.network.metrics_port = bind.port();
    }

    // Initialize and run the exporter
    let mut exporter = init_exporter(&config).await?;

    info!(
        "Starting cloudscout exporter on {}",
        config.metrics_bind_addr()
    );

    if let Err(e) = exporter.run().await {
        error!("Exporter failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();

    if let Some(output_path) = output {
        config
            .to_file(&output_path)
            .map_err(ExporterError::Core)?;
        println!("Generated configuration file: {}", output_path.display());
    } else {
        let yaml = serde_yaml::to_string(&config)?;
        println!("{}", yaml);
    }

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = Config::load_from_file(&config_path)?;
    config.validate()?;

    println!("Configuration is valid");
    if config.projects.ids.is_empty() {
        println!("Projects: discovered via Cloud Resource Manager");
    } else {
        println!("Projects: {}", config.projects.ids.join(", "));
    }
    println!("Metrics endpoint: {}", config.metrics_bind_addr());
    println!(
        "Per-project scrape deadline: {}s",
        config.scrape.project_timeout_seconds
    );

    Ok(())
}
