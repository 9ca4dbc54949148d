//! Resolution of a table's current order.

use crate::OrderError;
use std::sync::Arc;
use tableside_gateway::{GatewayError, GatewayService};
use tableside_types::{Order, TableId};

/// What a table looks like right now from the remote service's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOrderState {
	/// No order with status CREATED.
	Vacant,
	Active(Order),
}

impl TableOrderState {
	pub fn into_order(self) -> Option<Order> {
		match self {
			TableOrderState::Vacant => None,
			TableOrderState::Active(order) => Some(order),
		}
	}
}

/// Reads the active order of a table straight from the gateway.
///
/// Nothing is cached; two calls may observe different states if the remote
/// service changed in between.
pub struct OrderStateResolver {
	gateway: Arc<GatewayService>,
}

impl OrderStateResolver {
	pub fn new(gateway: Arc<GatewayService>) -> Self {
		Self { gateway }
	}

	pub async fn resolve(&self, table_id: TableId) -> Result<TableOrderState, OrderError> {
		match self.gateway.find_active_order(table_id).await {
			Ok(order) => Ok(TableOrderState::Active(order)),
			Err(GatewayError::NotFound) => Ok(TableOrderState::Vacant),
			Err(e) => Err(e.into()),
		}
	}
}
