//! Order types shared between the gateway, the orchestration core and the API.
//!
//! Orders are owned by the remote data service. This crate only mirrors their
//! wire shape so that every layer agrees on field names and status strings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a dining table, as encoded in the per-table QR code.
pub type TableId = i64;

/// Identifier assigned to an order by the remote data service.
pub type OrderId = i64;

/// Identifier of a menu item.
pub type MenuItemId = i64;

/// Wire value of the only status this service reasons about.
pub const STATUS_CREATED: &str = "CREATED";

/// Lifecycle status of an order.
///
/// Only `Created` is meaningful to the orchestration layer: it marks the
/// table's active order. Every other status is driven by the remote data
/// service and carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
	/// The order is open and is the table's active order.
	Created,
	/// Any externally owned status (e.g. "PAID", "CLOSED").
	Other(String),
}

impl OrderStatus {
	/// Returns true if this status marks an active order.
	pub fn is_active(&self) -> bool {
		matches!(self, OrderStatus::Created)
	}

	pub fn as_str(&self) -> &str {
		match self {
			OrderStatus::Created => STATUS_CREATED,
			OrderStatus::Other(s) => s.as_str(),
		}
	}
}

impl From<String> for OrderStatus {
	fn from(value: String) -> Self {
		if value == STATUS_CREATED {
			OrderStatus::Created
		} else {
			OrderStatus::Other(value)
		}
	}
}

impl From<&str> for OrderStatus {
	fn from(value: &str) -> Self {
		OrderStatus::from(value.to_string())
	}
}

impl From<OrderStatus> for String {
	fn from(status: OrderStatus) -> Self {
		match status {
			OrderStatus::Created => STATUS_CREATED.to_string(),
			OrderStatus::Other(s) => s,
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A line of an order as stored by the remote data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<OrderId>,
	pub menu_id: MenuItemId,
	pub quantity: i32,
}

/// An order for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Identifier assigned by the remote data service.
	pub id: OrderId,
	/// Table the order belongs to.
	pub table_id: TableId,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Creation time as recorded by the remote data service (no offset).
	pub created_at: NaiveDateTime,
	/// Order lines; empty when the remote service does not embed them.
	#[serde(default)]
	pub items: Vec<OrderLineItem>,
}

impl Order {
	/// Returns true if this is the table's active order.
	pub fn is_active(&self) -> bool {
		self.status.is_active()
	}
}

/// A requested line: which menu item and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
	pub menu_id: MenuItemId,
	#[serde(alias = "qty")]
	pub quantity: i32,
}

/// Input for creating an order.
///
/// The table id is optional on the wire so that a missing id can be reported
/// as an invalid request instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
	#[serde(default)]
	pub table_id: Option<TableId>,
	#[serde(default)]
	pub items: Vec<OrderLineRequest>,
}

impl OrderRequest {
	/// Convenience constructor for a request with a known table.
	pub fn new(table_id: TableId, items: Vec<OrderLineRequest>) -> Self {
		Self {
			table_id: Some(table_id),
			items,
		}
	}
}
