//! Main entry point for the tableside ordering service.
//!
//! Serves the order API for QR-code table ordering. Orders and menu items
//! live in a remote data service; this binary validates requests, enforces
//! the one-active-order-per-table rule together with that service and maps
//! every outcome to an HTTP answer.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tableside_config::Config;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the tableside service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the tableside service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the order service with the configured gateway
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tableside");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		gateway = %config.gateway.primary,
		creation = ?config.orders.creation,
		"Loaded configuration [{}]",
		config.service.id
	);

	let api_config = match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => api_config,
		None => {
			tracing::warn!("API server is disabled in configuration, nothing to serve");
			return Ok(());
		},
	};

	let orders = Arc::new(factory_registry::build_order_service_from_config(config)?);
	server::start_server(api_config, orders).await?;

	tracing::info!("Stopped tableside");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["tableside"]);

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["tableside", "--config", "custom.toml", "-l", "debug"]);

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_build_from_file_config() {
		let temp_dir = tempdir().unwrap();
		let config_path = temp_dir.path().join("tableside.toml");

		let config_content = r#"
[service]
id = "tableside-file-test"

[gateway]
primary = "memory"
timeout_seconds = 2

[gateway.implementations.memory]
tables = [1, 2, 42]

[[gateway.implementations.memory.menu]]
id = 7
name = "Pad Thai"
price = "45.00"

[orders]
creation = "serialized"

[api]
enabled = true
port = 0
"#;
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.service.id, "tableside-file-test");

		let orders = factory_registry::build_order_service_from_config(config).unwrap();
		assert_eq!(
			orders.creation_mode(),
			tableside_config::CreationMode::Serialized
		);
	}
}
