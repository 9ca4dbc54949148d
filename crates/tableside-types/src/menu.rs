//! Menu types.

use crate::MenuItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A menu entry as published by the remote data service. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
	pub id: MenuItemId,
	pub name: String,
	pub price: Decimal,
	/// Whether the kitchen currently serves this item.
	#[serde(default = "default_available")]
	pub available: bool,
}

fn default_available() -> bool {
	true
}
