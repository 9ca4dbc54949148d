//! The order orchestration service.
//!
//! Exposes the four operations the HTTP boundary needs. Reads go straight to
//! the remote service through the gateway. Creation is validated locally and
//! then handed to the remote service, which is the authority on whether a
//! table may open a new order. In serialized mode the service additionally
//! takes a per-table creation slot and checks for an existing active order
//! before creating.

use crate::guard::CreationGuard;
use crate::lifecycle::{RequestLifecycle, RequestPhase};
use crate::resolver::{OrderStateResolver, TableOrderState};
use crate::OrderError;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tableside_config::CreationMode;
use tableside_gateway::{GatewayError, GatewayService};
use tableside_types::{MenuItem, Order, OrderId, OrderRequest, TableId};
use tracing::instrument;

/// Menu items as produced by [`OrderService::list_menu_items`].
pub type MenuItemStream = BoxStream<'static, Result<MenuItem, OrderError>>;

/// Coordinates order reads and creation against the remote data service.
pub struct OrderService {
	gateway: Arc<GatewayService>,
	resolver: OrderStateResolver,
	/// Present in serialized creation mode.
	guard: Option<CreationGuard>,
}

impl OrderService {
	/// Creates a service in delegated mode.
	pub fn new(gateway: Arc<GatewayService>) -> Self {
		Self {
			resolver: OrderStateResolver::new(Arc::clone(&gateway)),
			gateway,
			guard: None,
		}
	}

	/// Switches to serialized creation using `guard`.
	pub fn with_creation_guard(mut self, guard: CreationGuard) -> Self {
		self.guard = Some(guard);
		self
	}

	pub fn creation_mode(&self) -> CreationMode {
		if self.guard.is_some() {
			CreationMode::Serialized
		} else {
			CreationMode::Delegated
		}
	}

	/// Returns the table's order with status CREATED.
	#[instrument(skip_all, fields(table_id = %table_id))]
	pub async fn get_active_order(&self, table_id: TableId) -> Result<Order, OrderError> {
		let mut lifecycle = RequestLifecycle::start("get_active_order");
		lifecycle.enter(RequestPhase::Validating);
		lifecycle.enter(RequestPhase::Delegating);

		let result = match self.resolver.resolve(table_id).await {
			Ok(TableOrderState::Active(order)) => Ok(order),
			Ok(TableOrderState::Vacant) => Err(OrderError::NotFound(format!(
				"no active order for table {}",
				table_id
			))),
			Err(e) => Err(e),
		};
		lifecycle.finish(result)
	}

	/// Creates a new order for the request's table.
	#[instrument(skip_all, fields(table_id = ?request.table_id, lines = request.items.len()))]
	pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
		let mut lifecycle = RequestLifecycle::start("create_order");
		lifecycle.enter(RequestPhase::Validating);

		let table_id = match validate_request(&request) {
			Ok(table_id) => table_id,
			Err(e) => {
				tracing::debug!(error = %e, "Rejected order request");
				return lifecycle.finish(Err(e));
			},
		};

		lifecycle.enter(RequestPhase::Delegating);
		let result = self.create_validated(table_id, &request).await;
		match &result {
			Ok(order) => tracing::info!(order_id = order.id, "Order created"),
			Err(e) => tracing::info!(error = %e, "Order not created"),
		}
		lifecycle.finish(result)
	}

	async fn create_validated(
		&self,
		table_id: TableId,
		request: &OrderRequest,
	) -> Result<Order, OrderError> {
		// Held until the creation call returns.
		let _permit = match &self.guard {
			Some(guard) => {
				let permit = guard.acquire(table_id).await?;
				if let TableOrderState::Active(existing) = self.resolver.resolve(table_id).await? {
					return Err(OrderError::Conflict(format!(
						"table {} already has active order {}",
						table_id, existing.id
					)));
				}
				Some(permit)
			},
			None => None,
		};

		let order = self
			.gateway
			.create_order(request)
			.await
			.map_err(|e| match e {
				GatewayError::NotFound => OrderError::NotFound(format!(
					"table {} or one of the requested menu items does not exist",
					table_id
				)),
				other => other.into(),
			})?;

		check_created(table_id, order)
	}

	/// Fetches an order by id.
	#[instrument(skip_all, fields(order_id = %order_id))]
	pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
		let mut lifecycle = RequestLifecycle::start("get_order");
		lifecycle.enter(RequestPhase::Validating);
		lifecycle.enter(RequestPhase::Delegating);

		let result = self.gateway.get_order(order_id).await.map_err(|e| match e {
			GatewayError::NotFound => OrderError::NotFound(format!("order {} not found", order_id)),
			other => other.into(),
		});
		lifecycle.finish(result)
	}

	/// Streams the menu.
	///
	/// Items are passed on as they arrive. A failure is yielded once as
	/// [`OrderError::RemoteFailure`] and ends the stream; items already
	/// yielded remain valid.
	pub fn list_menu_items(&self) -> MenuItemStream {
		let mut inner = self.gateway.list_menu_items();

		Box::pin(async_stream::stream! {
			let mut lifecycle = RequestLifecycle::start("list_menu_items");
			lifecycle.enter(RequestPhase::Validating);
			lifecycle.enter(RequestPhase::Delegating);

			let mut delivered = 0usize;
			while let Some(item) = inner.next().await {
				match item {
					Ok(item) => {
						delivered += 1;
						yield Ok(item);
					},
					Err(e) => {
						tracing::warn!(error = %e, delivered, "Menu listing failed");
						let err = OrderError::RemoteFailure(e.to_string());
						let _ = lifecycle.finish::<()>(Err(err.clone()));
						yield Err(err);
						return;
					},
				}
			}

			tracing::debug!(delivered, "Menu listed");
			let _ = lifecycle.finish(Ok(()));
		})
	}
}

/// Checks the request shape and returns its table id.
fn validate_request(request: &OrderRequest) -> Result<TableId, OrderError> {
	let table_id = request
		.table_id
		.ok_or_else(|| OrderError::InvalidRequest("tableId is required".into()))?;
	if table_id <= 0 {
		return Err(OrderError::InvalidRequest(format!(
			"tableId must be positive, got {}",
			table_id
		)));
	}
	if request.items.is_empty() {
		return Err(OrderError::InvalidRequest(
			"at least one order item is required".into(),
		));
	}
	if let Some(line) = request.items.iter().find(|line| line.quantity <= 0) {
		return Err(OrderError::InvalidRequest(format!(
			"quantity for menu item {} must be positive, got {}",
			line.menu_id, line.quantity
		)));
	}
	Ok(table_id)
}

/// Rejects a creation result that does not describe a fresh order for the
/// requested table.
fn check_created(table_id: TableId, order: Order) -> Result<Order, OrderError> {
	if order.table_id != table_id {
		tracing::error!(
			expected = table_id,
			actual = order.table_id,
			order_id = order.id,
			"Remote service returned an order for another table"
		);
		return Err(OrderError::RemoteFailure(format!(
			"remote service returned order {} for table {} instead of {}",
			order.id, order.table_id, table_id
		)));
	}
	if !order.is_active() {
		tracing::error!(order_id = order.id, status = %order.status, "Created order is not active");
		return Err(OrderError::RemoteFailure(format!(
			"remote service returned order {} with status {}",
			order.id, order.status
		)));
	}
	Ok(order)
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::stream;
	use rust_decimal::Decimal;
	use std::time::Duration;
	use tableside_gateway::implementations::memory::MemoryGateway;
	use tableside_gateway::{GatewayInterface, MockGatewayInterface};
	use tableside_types::{OrderLineRequest, OrderStatus};

	fn gateway(backend: impl GatewayInterface + 'static) -> Arc<GatewayService> {
		Arc::new(GatewayService::new(Box::new(backend), Duration::from_secs(5)))
	}

	fn request(table_id: TableId) -> OrderRequest {
		OrderRequest::new(
			table_id,
			vec![
				OrderLineRequest {
					menu_id: 7,
					quantity: 2,
				},
				OrderLineRequest {
					menu_id: 8,
					quantity: 1,
				},
			],
		)
	}

	fn order(id: OrderId, table_id: TableId, status: OrderStatus) -> Order {
		Order {
			id,
			table_id,
			status,
			created_at: chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
				.unwrap()
				.and_hms_opt(18, 30, 0)
				.unwrap(),
			items: vec![],
		}
	}

	fn menu_item(id: i64) -> MenuItem {
		MenuItem {
			id,
			name: format!("dish-{}", id),
			price: Decimal::new(4500, 2),
			available: true,
		}
	}

	#[tokio::test]
	async fn test_table_42_scenario() {
		let service = OrderService::new(gateway(MemoryGateway::new()));

		assert!(matches!(
			service.get_active_order(42).await,
			Err(OrderError::NotFound(_))
		));

		let created = service.create_order(request(42)).await.unwrap();
		assert_eq!(created.table_id, 42);
		assert_eq!(created.status, OrderStatus::Created);

		assert_eq!(service.get_active_order(42).await.unwrap(), created);
		assert_eq!(service.get_order(created.id).await.unwrap(), created);

		assert!(matches!(
			service.create_order(request(42)).await,
			Err(OrderError::Conflict(_))
		));
	}

	#[tokio::test]
	async fn test_invalid_requests_never_reach_gateway() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_create_order().never();
		mock.expect_find_active_order().never();
		let service = OrderService::new(gateway(mock))
			.with_creation_guard(CreationGuard::new(Duration::from_secs(1)));

		let empty = OrderRequest::new(42, vec![]);
		assert!(matches!(
			service.create_order(empty).await,
			Err(OrderError::InvalidRequest(_))
		));

		let no_table = OrderRequest {
			table_id: None,
			items: request(42).items,
		};
		assert!(matches!(
			service.create_order(no_table).await,
			Err(OrderError::InvalidRequest(msg)) if msg.contains("tableId")
		));

		assert!(matches!(
			service.create_order(request(0)).await,
			Err(OrderError::InvalidRequest(_))
		));

		let zero_quantity = OrderRequest::new(
			42,
			vec![OrderLineRequest {
				menu_id: 7,
				quantity: 0,
			}],
		);
		assert!(matches!(
			service.create_order(zero_quantity).await,
			Err(OrderError::InvalidRequest(msg)) if msg.contains("menu item 7")
		));
	}

	#[tokio::test]
	async fn test_reads_are_idempotent() {
		let memory = MemoryGateway::new();
		let existing = memory.create_order(&request(42)).await.unwrap();
		let service = OrderService::new(gateway(memory));

		for _ in 0..3 {
			assert_eq!(service.get_active_order(42).await.unwrap(), existing);
			assert_eq!(service.get_order(existing.id).await.unwrap(), existing);
		}
		assert!(matches!(
			service.get_order(existing.id + 1).await,
			Err(OrderError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_unknown_table_on_create_is_not_found() {
		let service = OrderService::new(gateway(MemoryGateway::new().with_tables([1, 2])));

		assert!(matches!(
			service.create_order(request(42)).await,
			Err(OrderError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_untrustworthy_creation_result_is_remote_failure() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_create_order()
			.withf(|req| req.table_id == Some(42))
			.returning(|_| Ok(order(1, 43, OrderStatus::Created)));
		mock.expect_create_order()
			.withf(|req| req.table_id == Some(7))
			.returning(|_| Ok(order(2, 7, OrderStatus::from("PAID"))));
		let service = OrderService::new(gateway(mock));

		assert!(matches!(
			service.create_order(request(42)).await,
			Err(OrderError::RemoteFailure(_))
		));
		assert!(matches!(
			service.create_order(request(7)).await,
			Err(OrderError::RemoteFailure(_))
		));
	}

	#[tokio::test]
	async fn test_delegated_mode_creates_without_lookup() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_find_active_order().never();
		mock.expect_create_order()
			.times(1)
			.returning(|_| Err(GatewayError::Conflict("table 42 is taken".into())));
		let service = OrderService::new(gateway(mock));

		assert_eq!(service.creation_mode(), CreationMode::Delegated);
		assert_eq!(
			service.create_order(request(42)).await,
			Err(OrderError::Conflict("table 42 is taken".into()))
		);
	}

	#[tokio::test]
	async fn test_remote_failure_on_read() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_find_active_order()
			.returning(|_| Err(GatewayError::Remote("connection refused".into())));
		let service = OrderService::new(gateway(mock));

		assert!(matches!(
			service.get_active_order(42).await,
			Err(OrderError::RemoteFailure(_))
		));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_creates_with_atomic_remote() {
		let memory = MemoryGateway::new().with_latency(Duration::from_millis(5));
		let service = Arc::new(OrderService::new(gateway(memory)));

		let outcomes = race_creates(&service, 42, 16).await;

		assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
		assert!(outcomes
			.iter()
			.filter_map(|r| r.as_ref().err())
			.all(|e| matches!(e, OrderError::Conflict(_))));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_creates_serialized_with_plain_remote() {
		let memory = MemoryGateway::new()
			.without_unique_constraint()
			.with_latency(Duration::from_millis(5));
		let service = Arc::new(
			OrderService::new(gateway(memory))
				.with_creation_guard(CreationGuard::new(Duration::from_secs(10))),
		);
		assert_eq!(service.creation_mode(), CreationMode::Serialized);

		let outcomes = race_creates(&service, 42, 16).await;

		assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
		assert!(outcomes
			.iter()
			.filter_map(|r| r.as_ref().err())
			.all(|e| matches!(e, OrderError::Conflict(_))));
	}

	async fn race_creates(
		service: &Arc<OrderService>,
		table_id: TableId,
		n: usize,
	) -> Vec<Result<Order, OrderError>> {
		let handles: Vec<_> = (0..n)
			.map(|_| {
				let service = Arc::clone(service);
				tokio::spawn(async move { service.create_order(request(table_id)).await })
			})
			.collect();

		let mut outcomes = Vec::with_capacity(n);
		for handle in handles {
			outcomes.push(handle.await.unwrap());
		}
		outcomes
	}

	#[tokio::test]
	async fn test_menu_failure_mid_stream() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_list_menu_items().returning(|| {
			Box::pin(stream::iter(vec![
				Ok(menu_item(1)),
				Ok(menu_item(2)),
				Err(GatewayError::Remote("connection reset".into())),
			]))
		});
		let service = OrderService::new(gateway(mock));

		let items: Vec<_> = service.list_menu_items().collect().await;

		assert_eq!(items.len(), 3);
		assert_eq!(items[1].as_ref().unwrap().id, 2);
		assert!(matches!(items[2], Err(OrderError::RemoteFailure(_))));
	}

	#[tokio::test]
	async fn test_unreachable_menu() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_list_menu_items().returning(|| {
			Box::pin(stream::iter(vec![Err(GatewayError::Remote(
				"connection refused".into(),
			))]))
		});
		let service = OrderService::new(gateway(mock));

		let items: Vec<_> = service.list_menu_items().collect().await;

		assert_eq!(items.len(), 1);
		assert!(matches!(items[0], Err(OrderError::RemoteFailure(_))));
	}

	#[tokio::test]
	async fn test_full_menu() {
		let service = OrderService::new(gateway(
			MemoryGateway::new().with_menu(vec![menu_item(1), menu_item(2)]),
		));

		let items: Vec<_> = service.list_menu_items().collect().await;
		assert_eq!(items.len(), 2);
		assert!(items.iter().all(|i| i.is_ok()));
	}
}
