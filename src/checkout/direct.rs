//! Buy-now payloads.
//!
//! A buy-now click writes a single-use payload that the next checkout entry
//! consumes. Payloads expire so an abandoned one cannot resurface later.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, Product};

/// Default lifetime of a stored buy-now payload.
pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCheckoutPayload {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default = "yes")]
    pub is_direct_checkout: bool,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    /// Token the buy-now navigation carries; matching it proves the payload is
    /// the one the shopper just created.
    #[serde(default)]
    pub intent: Option<Uuid>,
}

fn yes() -> bool { true }

impl DirectCheckoutPayload {
    /// One line of quantity 1 for `product`.
    pub fn buy_now(product: Product, now: DateTime<Utc>) -> Self {
        let line = CartLine::new(product);
        Self {
            total: line.line_total(),
            items: vec![line],
            is_direct_checkout: true,
            timestamp: now.timestamp_millis(),
            intent: Some(Uuid::new_v4()),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> { DateTime::from_timestamp_millis(self.timestamp) }

    /// Fresh when created no more than `ttl` ago and not in the future.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.created_at() {
            Some(created) => created <= now && now - created <= ttl,
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

/// What the stored `directCheckout` key held at checkout entry.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredPayload {
    Absent,
    /// Present but not decodable.
    Corrupt,
    Present(DirectCheckoutPayload),
}

impl StoredPayload {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Absent,
            Some(raw) => match serde_json::from_str(raw) {
                Ok(payload) => Self::Present(payload),
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable buy-now payload");
                    Self::Corrupt
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;

    #[test]
    fn test_buy_now_payload() {
        let now = Utc::now();
        let p = DirectCheckoutPayload::buy_now(widget(7, Decimal::new(1250, 2)), now);
        assert_eq!(p.items.len(), 1);
        assert_eq!(p.items[0].quantity.value(), 1);
        assert_eq!(p.total, Decimal::new(1250, 2));
        assert!(p.is_direct_checkout);
        assert!(p.intent.is_some());
    }

    #[test]
    fn test_freshness_window() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let p = DirectCheckoutPayload::buy_now(widget(7, Decimal::ONE), now);
        let ttl = Duration::seconds(DEFAULT_TTL_SECS);
        assert!(p.is_fresh(now, ttl));
        assert!(p.is_fresh(now + ttl, ttl));
        assert!(!p.is_fresh(now + ttl + Duration::milliseconds(1), ttl));
        assert!(!p.is_fresh(now - Duration::seconds(1), ttl));
    }

    #[test]
    fn test_missing_items_parse_as_empty() {
        let stored = StoredPayload::from_raw(Some(r#"{"total":0,"isDirectCheckout":true,"timestamp":1}"#));
        match stored {
            StoredPayload::Present(p) => assert!(p.is_empty()),
            other => panic!("expected payload, got {other:?}"),
        }
        assert_eq!(StoredPayload::from_raw(Some("{oops")), StoredPayload::Corrupt);
        assert_eq!(StoredPayload::from_raw(None), StoredPayload::Absent);
    }
}
