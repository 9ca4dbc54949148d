//! Builder pattern for constructing the order service.
//!
//! Composes an [`OrderService`] from configuration and a set of gateway
//! factories keyed by implementation name. Every configured implementation
//! with a matching factory is instantiated, which validates its settings at
//! startup; the primary one is wrapped in a [`GatewayService`].

use crate::guard::CreationGuard;
use crate::service::OrderService;
use std::collections::HashMap;
use std::sync::Arc;
use tableside_config::{Config, CreationMode};
use tableside_gateway::{GatewayError, GatewayInterface, GatewayService};
use thiserror::Error;

/// Errors that can occur during order service construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions needed to build an [`OrderService`].
pub struct OrderServiceFactories<GF> {
	pub gateway_factories: HashMap<String, GF>,
}

/// Builder for constructing an [`OrderService`] with a pluggable gateway.
pub struct OrderServiceBuilder {
	config: Config,
}

impl OrderServiceBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the service, creating gateway implementations through `factories`.
	pub fn build<GF>(
		self,
		factories: OrderServiceFactories<GF>,
	) -> Result<OrderService, BuilderError>
	where
		GF: Fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>,
	{
		let mut gateway_impls = HashMap::new();
		for (name, config) in &self.config.gateway.implementations {
			let Some(factory) = factories.gateway_factories.get(name) else {
				tracing::warn!(component = "gateway", implementation = %name, "Unknown implementation, skipped");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.gateway.primary == name;
					tracing::info!(component = "gateway", implementation = %name, enabled = %is_primary, "Loaded");
					gateway_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "gateway",
						implementation = %name,
						error = %e,
						"Failed to create gateway implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create gateway implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.gateway.primary;
		let backend = gateway_impls.remove(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary gateway '{}' has no registered implementation",
				primary
			))
		})?;

		Ok(self.build_with_gateway(backend))
	}

	/// Builds the service around an already constructed gateway backend.
	pub fn build_with_gateway(self, backend: Box<dyn GatewayInterface>) -> OrderService {
		let gateway = Arc::new(GatewayService::new(backend, self.config.gateway_timeout()));
		let service = OrderService::new(gateway);

		match self.config.orders.creation {
			CreationMode::Delegated => service,
			CreationMode::Serialized => {
				tracing::info!(
					slot_timeout = ?self.config.slot_timeout(),
					"Serialized order creation enabled"
				);
				service.with_creation_guard(CreationGuard::new(self.config.slot_timeout()))
			},
		}
	}
}
