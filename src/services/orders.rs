//! Order ledger
//!
//! The persisted order list is append-only. All appends in this process go
//! through one writer lock so read-modify-write cycles cannot interleave.
//! Other processes sharing the same profile directory are not coordinated.

use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::OrderId;
use crate::storage::{keys, KeyValueStore, StorageError, Write};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("order id {0} already exists")]
    DuplicateId(OrderId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Listing filter for order history and the admin view.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderFilter {
    /// Case-insensitive match on order id, customer name or email.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        let query_ok = match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let q = q.to_lowercase();
                order.id.as_str().to_lowercase().contains(&q)
                    || order.customer_name.to_lowercase().contains(&q)
                    || order.customer_email.to_lowercase().contains(&q)
            }
        };
        query_ok
            && self.status.map_or(true, |s| order.status == s)
            && self.user_id.map_or(true, |id| order.user_id == Some(id))
    }
}

#[derive(Debug)]
pub struct OrderLedger<S> {
    store: Arc<S>,
    writer: Mutex<()>,
}

impl<S: KeyValueStore> OrderLedger<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store, writer: Mutex::new(()) } }

    /// Every stored order, oldest first. A corrupt list is an error, never an empty one.
    pub fn all(&self) -> Result<Vec<Order>, StorageError> {
        match self.store.get(keys::ORDERS)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn search(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError> {
        Ok(self.all()?.into_iter().filter(|o| filter.matches(o)).collect())
    }

    pub fn for_user(&self, user_id: u64) -> Result<Vec<Order>, StorageError> {
        self.search(&OrderFilter { user_id: Some(user_id), ..OrderFilter::default() })
    }

    pub fn last_order(&self) -> Result<Option<Order>, StorageError> {
        crate::storage::load_json(self.store.as_ref(), keys::LAST_ORDER)
    }

    /// Appends `order`, stores it as the last-order snapshot and applies
    /// `also` in the same all-or-nothing batch.
    pub fn append_with(&self, order: &Order, also: Vec<Write>) -> Result<(), LedgerError> {
        let _writer = self.writer.lock();
        let mut orders = self.all()?;
        if orders.iter().any(|o| o.id == order.id) {
            return Err(LedgerError::DuplicateId(order.id.clone()));
        }
        orders.push(order.clone());

        let mut batch = vec![Write::set_json(keys::ORDERS, &orders)?, Write::set_json(keys::LAST_ORDER, order)?];
        batch.extend(also);
        self.store.commit(&batch)?;
        tracing::info!(order_id = %order.id, orders = orders.len(), "order appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;
    use crate::domain::aggregates::{CartLine, Customer, OrderSource, PaymentMethod};
    use crate::pricing::{price, PricingRules};
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(id: &str, name: &str, user_id: u64) -> Order {
        let items = vec![CartLine::new(widget(1, Decimal::new(20, 0)))];
        let customer = Customer { user_id: Some(user_id), name: name.into(), email: format!("{name}@example.com"), ..Customer::default() };
        Order::create(OrderId::new(id).unwrap(), &customer, items.clone(), &price(&items, &PricingRules::default()), PaymentMethod::CreditCard, OrderSource::Cart, Utc::now())
    }

    #[test]
    fn test_append_and_query() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        ledger.append_with(&order("ORD1", "jane", 2), vec![]).unwrap();
        ledger.append_with(&order("ORD2", "budi", 3), vec![]).unwrap();
        assert_eq!(ledger.all().unwrap().len(), 2);
        assert_eq!(ledger.for_user(3).unwrap()[0].id.as_str(), "ORD2");
        assert_eq!(ledger.last_order().unwrap().unwrap().id.as_str(), "ORD2");
        let found = ledger.search(&OrderFilter { query: Some("JANE@".into()), ..OrderFilter::default() }).unwrap();
        assert_eq!(found.len(), 1);
        let none = ledger.search(&OrderFilter { status: Some(OrderStatus::Pending), ..OrderFilter::default() }).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        ledger.append_with(&order("ORD1", "jane", 2), vec![]).unwrap();
        assert!(matches!(ledger.append_with(&order("ORD1", "jane", 2), vec![]), Err(LedgerError::DuplicateId(_))));
        assert_eq!(ledger.all().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_list_is_not_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::ORDERS, "[{broken").unwrap();
        let ledger = OrderLedger::new(store.clone());
        assert!(ledger.append_with(&order("ORD1", "jane", 2), vec![]).is_err());
        assert_eq!(store.get(keys::ORDERS).unwrap().as_deref(), Some("[{broken"));
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let ledger = Arc::new(OrderLedger::new(Arc::new(MemoryStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.append_with(&order(&format!("ORD{i}"), "jane", 2), vec![]).unwrap())
            })
            .collect();
        for h in handles { h.join().unwrap(); }
        assert_eq!(ledger.all().unwrap().len(), 8);
    }
}
