//! Dynamic factory registry for gateway implementations.
//!
//! Collects every gateway implementation compiled into the binary so the
//! configuration can pick one by name.

use std::collections::HashMap;
use std::sync::OnceLock;
use tableside_config::Config;
use tableside_core::builder::OrderServiceFactories;
use tableside_core::{OrderService, OrderServiceBuilder};
use tableside_gateway::GatewayFactory;

/// Registry of all implementation factories.
pub struct FactoryRegistry {
	pub gateway: HashMap<String, GatewayFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			gateway: HashMap::new(),
		}
	}

	pub fn register_gateway(&mut self, name: impl Into<String>, factory: GatewayFactory) {
		self.gateway.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in tableside_gateway::get_all_implementations() {
			tracing::debug!("Registering gateway implementation: {}", name);
			registry.register_gateway(name, factory);
		}
		registry
	})
}

/// Builds the order service from configuration using the registry.
///
/// Every implementation named in the configuration must be known.
pub fn build_order_service_from_config(
	config: Config,
) -> Result<OrderService, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut gateway_factories = HashMap::new();
	for name in config.gateway.implementations.keys() {
		let Some(factory) = registry.gateway.get(name) else {
			let mut available: Vec<_> = registry.gateway.keys().cloned().collect();
			available.sort();
			return Err(format!(
				"Unknown gateway implementation '{}'. Available: [{}]",
				name,
				available.join(", ")
			)
			.into());
		};
		gateway_factories.insert(name.clone(), *factory);
	}

	let service = OrderServiceBuilder::new(config).build(OrderServiceFactories { gateway_factories })?;
	Ok(service)
}
