//! Configuration module for the tableside ordering service.
//!
//! Configuration is read from TOML files with `${VAR}` / `${VAR:-default}`
//! environment interpolation and validated after parsing.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["gateway.toml", "api.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the tableside service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Remote data gateway selection and limits.
	pub gateway: GatewayConfig,
	/// Order orchestration behaviour.
	#[serde(default)]
	pub orders: OrdersConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
}

/// Configuration for the remote data gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Upper bound in seconds on every call to the remote data service.
	#[serde(default = "default_gateway_timeout")]
	pub timeout_seconds: u64,
	/// Map of gateway implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_gateway_timeout() -> u64 {
	5
}

/// How concurrent order creations for one table are kept from racing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationMode {
	/// The remote data service enforces one active order per table atomically;
	/// creations go straight through and its conflicts are surfaced.
	#[default]
	Delegated,
	/// Creations for the same table are ordered through a per-table slot in
	/// this process, for remote services that cannot enforce the constraint.
	Serialized,
}

/// Configuration for order orchestration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
	#[serde(default)]
	pub creation: CreationMode,
	/// Maximum wait in seconds for another in-flight creation on the same
	/// table to finish. Only used in serialized mode.
	#[serde(default = "default_slot_timeout")]
	pub slot_timeout_seconds: u64,
}

impl Default for OrdersConfig {
	fn default() -> Self {
		Self {
			creation: CreationMode::default(),
			slot_timeout_seconds: default_slot_timeout(),
		}
	}
}

fn default_slot_timeout() -> u64 {
	10
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration. Permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}

	result.push_str(&input[last_end..]);
	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Upper bound applied to every gateway call.
	pub fn gateway_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.gateway.timeout_seconds)
	}

	/// Upper bound on waiting for a table's creation slot.
	pub fn slot_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.orders.slot_timeout_seconds)
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.gateway.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one gateway implementation must be configured".into(),
			));
		}
		if self.gateway.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Gateway primary implementation cannot be empty".into(),
			));
		}
		if !self
			.gateway
			.implementations
			.contains_key(&self.gateway.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary gateway '{}' not found in implementations",
				self.gateway.primary
			)));
		}
		if self.gateway.timeout_seconds == 0 || self.gateway.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"Gateway timeout_seconds must be between 1 and 300".into(),
			));
		}

		if self.orders.slot_timeout_seconds == 0 || self.orders.slot_timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"Orders slot_timeout_seconds must be between 1 and 300".into(),
			));
		}

		if let Some(ref api) = self.api {
			if api.enabled && api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses and validates a configuration from a TOML string, resolving
/// environment variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
