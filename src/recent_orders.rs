use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Default number of orders a customer's browser keeps.
pub const DEFAULT_CAPACITY: usize = 20;

/// RecentOrder
///
/// One order remembered on the customer side, in the same shape the storefront keeps
/// under the `orders` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecentOrder {
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub order_id: String,
    pub tracking_url: String,
    /// Shop handle.
    pub shop: String,
}

/// RecentOrders
///
/// Bounded list of the customer's recent orders. Order ids are unique; recording an id that
/// is already present changes nothing. When full, the oldest entry is evicted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentOrders {
    entries: VecDeque<RecentOrder>,
    capacity: usize,
}

impl Default for RecentOrders {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentOrders {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// record
    ///
    /// Appends `order` unless its id is already known. Returns whether it was added.
    pub fn record(&mut self, order: RecentOrder) -> bool {
        if self.contains(&order.order_id) {
            return false;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(order);
        true
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.entries.iter().any(|o| o.order_id == order_id)
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RecentOrder> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// from_json
    ///
    /// Restores a stored array. Duplicate ids are dropped and, when the array is longer than
    /// `capacity`, only the newest entries are kept.
    pub fn from_json(raw: &str, capacity: usize) -> Result<Self, serde_json::Error> {
        let stored: Vec<RecentOrder> = serde_json::from_str(raw)?;
        let mut orders = Self::with_capacity(capacity);
        for order in stored {
            orders.record(order);
        }
        Ok(orders)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }
}
