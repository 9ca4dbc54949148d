//! Remote data gateway for the tableside ordering service.
//!
//! Orders and menu items live in a separate remote data service. This crate
//! hides how that service is reached behind [`GatewayInterface`] and reduces
//! every outcome to success or one of a few [`GatewayError`] kinds, so callers
//! never see transport details.
//!
//! [`GatewayService`] wraps the configured backend and puts an upper bound on
//! the time spent waiting for any single remote call.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use tableside_types::{
	ConfigSchema, ImplementationRegistry, MenuItem, Order, OrderId, OrderRequest, TableId,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur during gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
	/// The remote service answered that the resource does not exist.
	#[error("Not found")]
	NotFound,
	/// The remote service refused a creation because the table already has
	/// an active order.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Transport error, timeout or unexpected response.
	#[error("Remote service error: {0}")]
	Remote(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Lazily produced menu items.
///
/// The stream is finite. If the remote service fails part-way through, the
/// error is yielded as the last item; items already produced stay valid.
pub type MenuStream = BoxStream<'static, Result<MenuItem, GatewayError>>;

/// Trait defining the interface to the remote data service.
///
/// Implementations must not retry on their own: whether a call may be
/// repeated is decided by the caller, and creations are never safe to repeat.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GatewayInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Looks up the table's order with status CREATED.
	async fn find_active_order(&self, table_id: TableId) -> Result<Order, GatewayError>;

	/// Creates an order; the remote service assigns its id and timestamp.
	async fn create_order(&self, request: &OrderRequest) -> Result<Order, GatewayError>;

	/// Fetches an order by id.
	async fn get_order(&self, order_id: OrderId) -> Result<Order, GatewayError>;

	/// Streams the menu.
	fn list_menu_items(&self) -> MenuStream;
}

/// Type alias for gateway factory functions.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>;

/// Registry trait for gateway implementations.
pub trait GatewayRegistry: ImplementationRegistry<Factory = GatewayFactory> {}

/// Get all registered gateway implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level gateway service with bounded waits.
///
/// Every call is raced against `timeout`; running out of time is reported as
/// [`GatewayError::Remote`] and the in-flight call is dropped. Dropping it does
/// not mean the remote operation failed, it may still have completed.
pub struct GatewayService {
	/// The underlying gateway implementation.
	backend: Box<dyn GatewayInterface>,
	/// Upper bound on each remote call, and on each menu item.
	timeout: Duration,
}

impl GatewayService {
	pub fn new(backend: Box<dyn GatewayInterface>, timeout: Duration) -> Self {
		Self { backend, timeout }
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, GatewayError>
	where
		F: std::future::Future<Output = Result<T, GatewayError>>,
	{
		match tokio::time::timeout(self.timeout, call).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(operation, timeout = ?self.timeout, "Gateway call timed out");
				Err(GatewayError::Remote(format!(
					"{} timed out after {:?}",
					operation, self.timeout
				)))
			},
		}
	}

	pub async fn find_active_order(&self, table_id: TableId) -> Result<Order, GatewayError> {
		self.bounded("find_active_order", self.backend.find_active_order(table_id))
			.await
	}

	pub async fn create_order(&self, request: &OrderRequest) -> Result<Order, GatewayError> {
		self.bounded("create_order", self.backend.create_order(request))
			.await
	}

	pub async fn get_order(&self, order_id: OrderId) -> Result<Order, GatewayError> {
		self.bounded("get_order", self.backend.get_order(order_id))
			.await
	}

	/// Streams the menu, bounding the wait for each item and ending the
	/// stream right after the first error.
	pub fn list_menu_items(&self) -> MenuStream {
		let mut inner = self.backend.list_menu_items();
		let timeout = self.timeout;

		Box::pin(async_stream::stream! {
			loop {
				match tokio::time::timeout(timeout, inner.next()).await {
					Ok(Some(Ok(item))) => yield Ok(item),
					Ok(Some(Err(e))) => {
						yield Err(e);
						break;
					},
					Ok(None) => break,
					Err(_) => {
						tracing::warn!(?timeout, "Menu stream stalled");
						yield Err(GatewayError::Remote(format!(
							"list_menu_items timed out after {:?}",
							timeout
						)));
						break;
					},
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::stream;
	use rust_decimal::Decimal;
	use tableside_types::OrderStatus;

	fn menu_item(id: i64) -> MenuItem {
		MenuItem {
			id,
			name: format!("item-{}", id),
			price: Decimal::new(4500, 2),
			available: true,
		}
	}

	fn order(table_id: TableId) -> Order {
		Order {
			id: 1,
			table_id,
			status: OrderStatus::Created,
			created_at: chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
				.unwrap()
				.and_hms_opt(18, 30, 0)
				.unwrap(),
			items: vec![],
		}
	}

	#[tokio::test]
	async fn test_passes_through_results() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_find_active_order()
			.withf(|table_id| *table_id == 42)
			.returning(|table_id| Ok(order(table_id)));
		mock.expect_get_order()
			.returning(|_| Err(GatewayError::NotFound));

		let service = GatewayService::new(Box::new(mock), Duration::from_secs(1));

		assert_eq!(service.find_active_order(42).await.unwrap().table_id, 42);
		assert!(matches!(
			service.get_order(9).await,
			Err(GatewayError::NotFound)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_call_becomes_remote_failure() {
		let slow = SlowGateway {
			delay: Duration::from_secs(30),
		};

		let service = GatewayService::new(Box::new(slow), Duration::from_secs(2));
		let result = service.find_active_order(42).await;

		assert!(matches!(result, Err(GatewayError::Remote(msg)) if msg.contains("timed out")));
	}

	#[tokio::test]
	async fn test_menu_stream_ends_after_first_error() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_list_menu_items().returning(|| {
			Box::pin(stream::iter(vec![
				Ok(menu_item(1)),
				Err(GatewayError::Remote("connection reset".into())),
				Ok(menu_item(2)),
			]))
		});

		let service = GatewayService::new(Box::new(mock), Duration::from_secs(1));
		let items: Vec<_> = service.list_menu_items().collect().await;

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].as_ref().unwrap().id, 1);
		assert!(matches!(items[1], Err(GatewayError::Remote(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_stalled_menu_stream_times_out() {
		let mut mock = MockGatewayInterface::new();
		mock.expect_list_menu_items().returning(|| {
			Box::pin(stream::iter(vec![Ok(menu_item(1))]).chain(stream::pending()))
		});

		let service = GatewayService::new(Box::new(mock), Duration::from_secs(1));
		let items: Vec<_> = service.list_menu_items().collect().await;

		assert_eq!(items.len(), 2);
		assert!(items[0].is_ok());
		assert!(matches!(&items[1], Err(GatewayError::Remote(msg)) if msg.contains("timed out")));
	}

	/// Backend whose lookups take longer than any sensible timeout.
	struct SlowGateway {
		delay: Duration,
	}

	#[async_trait]
	impl GatewayInterface for SlowGateway {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(implementations::memory::MemoryGatewaySchema)
		}

		async fn find_active_order(&self, table_id: TableId) -> Result<Order, GatewayError> {
			tokio::time::sleep(self.delay).await;
			Ok(order(table_id))
		}

		async fn create_order(&self, _request: &OrderRequest) -> Result<Order, GatewayError> {
			tokio::time::sleep(self.delay).await;
			Err(GatewayError::Remote("unreachable".into()))
		}

		async fn get_order(&self, _order_id: OrderId) -> Result<Order, GatewayError> {
			tokio::time::sleep(self.delay).await;
			Err(GatewayError::NotFound)
		}

		fn list_menu_items(&self) -> MenuStream {
			Box::pin(futures::stream::empty())
		}
	}
}
