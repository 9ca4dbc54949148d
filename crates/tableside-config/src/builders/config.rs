//! Configuration builder for tests and local development.
//!
//! Produces a valid [`Config`] backed by the in-memory gateway without going
//! through TOML.

use crate::{ApiConfig, Config, CreationMode, GatewayConfig, OrdersConfig, ServiceConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	gateway_primary: String,
	gateway_timeout_seconds: u64,
	implementations: HashMap<String, toml::Value>,
	creation: CreationMode,
	slot_timeout_seconds: u64,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Starts from an empty in-memory gateway in delegated mode.
	pub fn new() -> Self {
		let mut implementations = HashMap::new();
		implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Self {
			service_id: "tableside-test".to_string(),
			gateway_primary: "memory".to_string(),
			gateway_timeout_seconds: 5,
			implementations,
			creation: CreationMode::Delegated,
			slot_timeout_seconds: 10,
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Adds (or replaces) a gateway implementation and makes it primary.
	pub fn gateway(mut self, name: impl Into<String>, config: toml::Value) -> Self {
		let name = name.into();
		self.implementations.insert(name.clone(), config);
		self.gateway_primary = name;
		self
	}

	pub fn gateway_timeout_seconds(mut self, seconds: u64) -> Self {
		self.gateway_timeout_seconds = seconds;
		self
	}

	pub fn creation(mut self, mode: CreationMode) -> Self {
		self.creation = mode;
		self
	}

	pub fn slot_timeout_seconds(mut self, seconds: u64) -> Self {
		self.slot_timeout_seconds = seconds;
		self
	}

	pub fn api(mut self, api: ApiConfig) -> Self {
		self.api = Some(api);
		self
	}

	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			gateway: GatewayConfig {
				primary: self.gateway_primary,
				timeout_seconds: self.gateway_timeout_seconds,
				implementations: self.implementations,
			},
			orders: OrdersConfig {
				creation: self.creation,
				slot_timeout_seconds: self.slot_timeout_seconds,
			},
			api: self.api,
		}
	}
}
