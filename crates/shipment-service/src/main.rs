use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shipment_client::{ShiprocketClient, WebhookVerifier};
use shipment_config::{Config, ConfigLoader, LogFormat};
use shipment_service::api::{self, AppState};
use shipment_service::fulfillment::Fulfillment;
use shipment_service::store::InMemoryOrderStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shipment-service")]
#[command(about = "Shipment orchestration service", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", env = "SHIPMENT_CONFIG")]
	config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(long, env = "SHIPMENT_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the shipment service
	Start,
	/// Validate the configuration file
	Validate,
	/// Print the current tracking state of a shipment
	Track {
		/// Shiprocket shipment id
		shipment_id: u64,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = load_config(&cli)?;
	let log_level = cli
		.log_level
		.clone()
		.unwrap_or_else(|| config.service.log_level.clone());
	setup_tracing(&log_level, config.service.log_format)?;

	match &cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(&cli, &config),
		Some(Commands::Track { shipment_id }) => track_shipment(config, *shipment_id).await,
	}
}

fn load_config(cli: &Cli) -> Result<Config> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &cli.config {
		loader = loader.with_file(path);
	}
	loader.load().context("Failed to load configuration")
}

async fn start_service(config: Config) -> Result<()> {
	info!("Starting {}", config.service.name);

	let client = ShiprocketClient::new(config.shiprocket.clone())
		.context("Failed to create Shiprocket client")?;
	if !client.is_enabled() {
		warn!("Shipping integration is disabled, shipment routes will fail");
	}

	let verifier = WebhookVerifier::new(config.shiprocket.webhook_secret.clone());
	if !verifier.is_configured() {
		warn!("No webhook secret configured, every webhook will be rejected");
	}

	let fulfillment = Fulfillment::new(Arc::new(client), Arc::new(InMemoryOrderStore::new()));
	let state = AppState::new(Arc::new(fulfillment), verifier);

	api::serve(
		state,
		&config.service.host,
		config.service.port,
		setup_shutdown_signal(),
	)
	.await
	.context("HTTP server failed")?;

	info!("{} stopped", config.service.name);
	Ok(())
}

fn validate_config(cli: &Cli, config: &Config) -> Result<()> {
	match &cli.config {
		Some(path) => info!("Configuration file {:?} is valid", path),
		None => info!("Default configuration is valid"),
	}
	info!("Service name: {}", config.service.name);
	info!("Listen address: {}:{}", config.service.host, config.service.port);
	info!("Shiprocket API: {}", config.shiprocket.base_url);
	info!("Credentials present: {}", config.shiprocket.has_credentials());
	info!("Courier policy: {:?}", config.shiprocket.courier_policy);
	Ok(())
}

async fn track_shipment(config: Config, shipment_id: u64) -> Result<()> {
	let client =
		ShiprocketClient::new(config.shiprocket).context("Failed to create Shiprocket client")?;
	let snapshot = client
		.track_shipment(shipment_id)
		.await
		.with_context(|| format!("Failed to track shipment {}", shipment_id))?;

	println!("{}", serde_json::to_string_pretty(&snapshot)?);
	Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	let registry = tracing_subscriber::registry().with(env_filter);
	match format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
	}
	.context("Failed to initialize tracing")?;

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received");
}
