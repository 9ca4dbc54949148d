//! In-memory stand-in for the remote data service.
//!
//! Useful for local development and tests. By default it enforces the
//! one-active-order-per-table constraint atomically: the existence check and
//! the insert happen under a single write lock, the way a uniqueness
//! constraint would in the real data store. With `enforce_unique_active =
//! false` it behaves like a store without that constraint.

use crate::{GatewayError, GatewayInterface, MenuStream};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tableside_types::{
	ConfigSchema, Field, FieldType, MenuItem, Order, OrderId, OrderLineItem, OrderRequest,
	OrderStatus, Schema, TableId, ValidationError,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
	orders: BTreeMap<OrderId, Order>,
	next_order_id: OrderId,
	next_line_id: i64,
}

/// Options read from `[gateway.implementations.memory]`.
#[derive(Debug, Clone, Deserialize)]
struct MemoryGatewayConfig {
	/// Known tables; any table is accepted when absent.
	#[serde(default)]
	tables: Option<Vec<TableId>>,
	#[serde(default = "default_enforce")]
	enforce_unique_active: bool,
	/// Artificial delay applied to every call.
	#[serde(default)]
	latency_ms: u64,
	#[serde(default)]
	menu: Vec<MenuItem>,
}

fn default_enforce() -> bool {
	true
}

/// In-memory gateway implementation.
pub struct MemoryGateway {
	state: Arc<RwLock<MemoryState>>,
	menu: Arc<Vec<MenuItem>>,
	tables: Option<HashSet<TableId>>,
	enforce_unique_active: bool,
	latency: Option<Duration>,
}

impl MemoryGateway {
	/// Creates an empty gateway that accepts any table and enforces the
	/// active-order constraint.
	pub fn new() -> Self {
		Self {
			state: Arc::new(RwLock::new(MemoryState {
				next_order_id: 1,
				next_line_id: 1,
				..Default::default()
			})),
			menu: Arc::new(Vec::new()),
			tables: None,
			enforce_unique_active: true,
			latency: None,
		}
	}

	/// Restricts orders to the given tables.
	pub fn with_tables(mut self, tables: impl IntoIterator<Item = TableId>) -> Self {
		self.tables = Some(tables.into_iter().collect());
		self
	}

	pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
		self.menu = Arc::new(menu);
		self
	}

	/// Drops the uniqueness constraint, so duplicate active orders can occur.
	pub fn without_unique_constraint(mut self) -> Self {
		self.enforce_unique_active = false;
		self
	}

	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);
		self
	}

	/// Moves an order to another status, as the remote service would when the
	/// bill is paid or the table is cleared.
	pub async fn set_status(
		&self,
		order_id: OrderId,
		status: OrderStatus,
	) -> Result<Order, GatewayError> {
		let mut state = self.state.write().await;
		let order = state
			.orders
			.get_mut(&order_id)
			.ok_or(GatewayError::NotFound)?;
		order.status = status;
		Ok(order.clone())
	}

	/// Number of orders with status CREATED for a table.
	pub async fn active_count(&self, table_id: TableId) -> usize {
		let state = self.state.read().await;
		state
			.orders
			.values()
			.filter(|o| o.table_id == table_id && o.is_active())
			.count()
	}

	async fn simulate_latency(&self) {
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
	}

	fn knows_table(&self, table_id: TableId) -> bool {
		self.tables
			.as_ref()
			.is_none_or(|tables| tables.contains(&table_id))
	}
}

impl Default for MemoryGateway {
	fn default() -> Self {
		Self::new()
	}
}

fn find_active(state: &MemoryState, table_id: TableId) -> Option<&Order> {
	state
		.orders
		.values()
		.find(|o| o.table_id == table_id && o.is_active())
}

#[async_trait]
impl GatewayInterface for MemoryGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryGatewaySchema)
	}

	async fn find_active_order(&self, table_id: TableId) -> Result<Order, GatewayError> {
		self.simulate_latency().await;
		let state = self.state.read().await;
		find_active(&state, table_id)
			.cloned()
			.ok_or(GatewayError::NotFound)
	}

	async fn create_order(&self, request: &OrderRequest) -> Result<Order, GatewayError> {
		self.simulate_latency().await;

		let table_id = request
			.table_id
			.ok_or_else(|| GatewayError::Remote("missing tableId".into()))?;
		if !self.knows_table(table_id) {
			return Err(GatewayError::NotFound);
		}
		if !self.menu.is_empty() {
			if let Some(unknown) = request
				.items
				.iter()
				.find(|line| !self.menu.iter().any(|m| m.id == line.menu_id))
			{
				tracing::debug!(menu_id = unknown.menu_id, "Unknown menu item");
				return Err(GatewayError::NotFound);
			}
		}

		// Check and insert under one lock.
		let mut state = self.state.write().await;
		if self.enforce_unique_active {
			if let Some(existing) = find_active(&state, table_id) {
				return Err(GatewayError::Conflict(format!(
					"table {} already has active order {}",
					table_id, existing.id
				)));
			}
		}

		let order_id = state.next_order_id;
		state.next_order_id += 1;

		let mut items = Vec::with_capacity(request.items.len());
		for line in &request.items {
			items.push(OrderLineItem {
				id: Some(state.next_line_id),
				order_id: Some(order_id),
				menu_id: line.menu_id,
				quantity: line.quantity,
			});
			state.next_line_id += 1;
		}

		let order = Order {
			id: order_id,
			table_id,
			status: OrderStatus::Created,
			created_at: chrono::Local::now().naive_local(),
			items,
		};
		state.orders.insert(order_id, order.clone());

		Ok(order)
	}

	async fn get_order(&self, order_id: OrderId) -> Result<Order, GatewayError> {
		self.simulate_latency().await;
		let state = self.state.read().await;
		state
			.orders
			.get(&order_id)
			.cloned()
			.ok_or(GatewayError::NotFound)
	}

	fn list_menu_items(&self) -> MenuStream {
		let menu = Arc::clone(&self.menu);
		let latency = self.latency;

		Box::pin(async_stream::stream! {
			if let Some(latency) = latency {
				tokio::time::sleep(latency).await;
			}
			for item in menu.iter() {
				yield Ok(item.clone());
			}
		})
	}
}

/// Configuration schema for MemoryGateway.
pub struct MemoryGatewaySchema;

impl ConfigSchema for MemoryGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let menu_item = Schema::new(
			vec![
				Field::new(
					"id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("name", FieldType::String),
				// Decimal string, e.g. "45.00"
				Field::new("price", FieldType::String),
			],
			vec![Field::new("available", FieldType::Boolean)],
		);

		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"tables",
					FieldType::Array(Box::new(FieldType::Integer {
						min: Some(1),
						max: None,
					})),
				),
				Field::new("enforce_unique_active", FieldType::Boolean),
				Field::new(
					"latency_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
				Field::new("menu", FieldType::Array(Box::new(FieldType::Table(menu_item)))),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory gateway from configuration.
///
/// Configuration parameters (all optional):
/// - `tables`: allow-list of table ids
/// - `enforce_unique_active`: defaults to true
/// - `latency_ms`: artificial per-call delay
/// - `menu`: array of `{ id, name, price, available }`
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	MemoryGatewaySchema
		.validate(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid memory gateway config: {}", e)))?;

	let parsed: MemoryGatewayConfig = config
		.clone()
		.try_into()
		.map_err(|e| GatewayError::Configuration(format!("Invalid memory gateway config: {}", e)))?;

	let mut gateway = MemoryGateway::new().with_menu(parsed.menu);
	if let Some(tables) = parsed.tables {
		gateway = gateway.with_tables(tables);
	}
	if !parsed.enforce_unique_active {
		gateway = gateway.without_unique_constraint();
	}
	if parsed.latency_ms > 0 {
		gateway = gateway.with_latency(Duration::from_millis(parsed.latency_ms));
	}

	Ok(Box::new(gateway))
}

/// Registry for the memory gateway implementation.
pub struct Registry;

impl tableside_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl crate::GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::StreamExt;
	use rust_decimal::Decimal;
	use tableside_types::OrderLineRequest;

	fn request(table_id: TableId) -> OrderRequest {
		OrderRequest::new(
			table_id,
			vec![OrderLineRequest {
				menu_id: 7,
				quantity: 2,
			}],
		)
	}

	#[tokio::test]
	async fn test_create_then_find_active() {
		let gateway = MemoryGateway::new();

		assert!(matches!(
			gateway.find_active_order(42).await,
			Err(GatewayError::NotFound)
		));

		let created = gateway.create_order(&request(42)).await.unwrap();
		assert_eq!(created.table_id, 42);
		assert_eq!(created.status, OrderStatus::Created);
		assert_eq!(created.items.len(), 1);
		assert_eq!(created.items[0].order_id, Some(created.id));

		let active = gateway.find_active_order(42).await.unwrap();
		assert_eq!(active, created);
		assert_eq!(gateway.get_order(created.id).await.unwrap(), created);
	}

	#[tokio::test]
	async fn test_second_active_order_conflicts() {
		let gateway = MemoryGateway::new();
		gateway.create_order(&request(42)).await.unwrap();

		let second = gateway.create_order(&request(42)).await;
		assert!(matches!(second, Err(GatewayError::Conflict(_))));

		// Other tables are unaffected
		assert!(gateway.create_order(&request(43)).await.is_ok());
	}

	#[tokio::test]
	async fn test_closed_order_frees_the_table() {
		let gateway = MemoryGateway::new();
		let first = gateway.create_order(&request(42)).await.unwrap();

		gateway
			.set_status(first.id, OrderStatus::from("PAID"))
			.await
			.unwrap();

		assert!(matches!(
			gateway.find_active_order(42).await,
			Err(GatewayError::NotFound)
		));
		let second = gateway.create_order(&request(42)).await.unwrap();
		assert_ne!(second.id, first.id);
	}

	#[tokio::test]
	async fn test_without_constraint_allows_duplicates() {
		let gateway = MemoryGateway::new().without_unique_constraint();
		gateway.create_order(&request(42)).await.unwrap();
		gateway.create_order(&request(42)).await.unwrap();

		assert_eq!(gateway.active_count(42).await, 2);
	}

	#[tokio::test]
	async fn test_unknown_table_and_menu_item() {
		let gateway = MemoryGateway::new()
			.with_tables([1, 2])
			.with_menu(vec![MenuItem {
				id: 7,
				name: "Pad Thai".into(),
				price: Decimal::new(4500, 2),
				available: true,
			}]);

		assert!(matches!(
			gateway.create_order(&request(42)).await,
			Err(GatewayError::NotFound)
		));

		let unknown_item = OrderRequest::new(
			1,
			vec![OrderLineRequest {
				menu_id: 99,
				quantity: 1,
			}],
		);
		assert!(matches!(
			gateway.create_order(&unknown_item).await,
			Err(GatewayError::NotFound)
		));

		assert!(gateway.create_order(&request(1)).await.is_ok());
	}

	#[tokio::test]
	async fn test_factory_reads_menu_and_tables() {
		let config: toml::Value = toml::from_str(
			r#"
tables = [42]
[[menu]]
id = 7
name = "Pad Thai"
price = "45.00"

[[menu]]
id = 8
name = "Tom Yum"
price = "60.50"
available = false
"#,
		)
		.unwrap();

		let gateway = create_gateway(&config).unwrap();
		let menu: Vec<_> = gateway.list_menu_items().collect().await;

		assert_eq!(menu.len(), 2);
		let tom_yum = menu[1].as_ref().unwrap();
		assert_eq!(tom_yum.price, Decimal::new(6050, 2));
		assert!(!tom_yum.available);

		assert!(matches!(
			gateway.create_order(&request(1)).await,
			Err(GatewayError::NotFound)
		));
	}

	#[test]
	fn test_factory_rejects_bad_config() {
		let config: toml::Value = toml::from_str("tables = [\"a\"]").unwrap();
		assert!(matches!(
			create_gateway(&config),
			Err(GatewayError::Configuration(_))
		));
	}
}
