//! Per-table creation slots.
//!
//! In serialized creation mode at most one creation per table runs inside
//! this process at a time. Waiting for a slot is bounded; a caller that cannot
//! get one in time is told the table is busy.

use crate::OrderError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tableside_types::TableId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = Arc<DashMap<TableId, Arc<Mutex<()>>>>;

/// Hands out one creation slot per table.
#[derive(Debug, Clone)]
pub struct CreationGuard {
	slots: Slots,
	wait: Duration,
}

impl CreationGuard {
	pub fn new(wait: Duration) -> Self {
		Self {
			slots: Arc::new(DashMap::new()),
			wait,
		}
	}

	/// Waits for the table's slot.
	///
	/// Fails with [`OrderError::Conflict`] when the slot stays taken for
	/// longer than the configured wait.
	pub async fn acquire(&self, table_id: TableId) -> Result<CreationPermit, OrderError> {
		// Built before waiting so a cancelled waiter still evicts on drop.
		let mut permit = CreationPermit {
			table_id,
			slots: Arc::clone(&self.slots),
			held: None,
		};
		let slot = self
			.slots
			.entry(table_id)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();

		match tokio::time::timeout(self.wait, slot.lock_owned()).await {
			Ok(held) => {
				permit.held = Some(held);
				Ok(permit)
			},
			Err(_) => {
				tracing::debug!(table_id, wait = ?self.wait, "Creation slot still taken");
				drop(permit);
				Err(OrderError::Conflict(format!(
					"another order creation for table {} is in progress",
					table_id
				)))
			},
		}
	}

	/// Number of tables with a creation in flight or queued.
	pub fn in_flight(&self) -> usize {
		self.slots.len()
	}
}

/// Removes the table's entry when only the map still refers to it.
fn evict_if_unused(slots: &DashMap<TableId, Arc<Mutex<()>>>, table_id: TableId) {
	slots.remove_if(&table_id, |_, slot| Arc::strong_count(slot) == 1);
}

/// Exclusive right to create an order for one table.
///
/// Released on drop, whether the creation finished, failed or was cancelled.
/// A permit that never got its lock only evicts the table's entry.
#[derive(Debug)]
pub struct CreationPermit {
	table_id: TableId,
	slots: Slots,
	/// Keeps the slot's mutex alive while locked. `None` while still waiting.
	held: Option<OwnedMutexGuard<()>>,
}

impl CreationPermit {
	pub fn table_id(&self) -> TableId {
		self.table_id
	}
}

impl Drop for CreationPermit {
	fn drop(&mut self) {
		// Unlock and give up our reference before checking for eviction.
		self.held.take();
		evict_if_unused(&self.slots, self.table_id);
	}
}
