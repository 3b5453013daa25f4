//! Order Aggregate
//!
//! Orders are created once per successful checkout and never mutated afterwards.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::CartLine;
use crate::domain::value_objects::OrderId;
use crate::pricing::PriceBreakdown;

/// Days added to the order date for the delivery estimate.
pub const DELIVERY_ESTIMATE_DAYS: i64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<u64>,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub estimated_delivery: DateTime<Utc>,
    pub source: OrderSource,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { Pending, #[default] Processing }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { Pending, #[default] Completed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    #[serde(alias = "cod")]
    CashOnDelivery,
}

/// Which checkout flow produced the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource { Cart, BuyNow }

/// Buyer identity and shipping destination captured from the checkout form.
#[derive(Clone, Debug, Default)]
pub struct Customer {
    pub user_id: Option<u64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Customer {
    pub fn shipping_address(&self) -> String {
        format!("{}, {}, {}, {}", self.address.trim(), self.city.trim(), self.postal_code.trim(), self.country.trim())
    }
}

impl Order {
    pub fn create(
        id: OrderId,
        customer: &Customer,
        items: Vec<CartLine>,
        breakdown: &PriceBreakdown,
        payment_method: PaymentMethod,
        source: OrderSource,
        order_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: customer.user_id,
            customer_name: customer.name.trim().to_string(),
            customer_email: customer.email.trim().to_string(),
            customer_phone: customer.phone.trim().to_string(),
            items,
            subtotal: breakdown.subtotal,
            shipping: breakdown.shipping,
            tax: breakdown.tax,
            total: breakdown.total,
            status: OrderStatus::Processing,
            payment_method,
            shipping_address: customer.shipping_address(),
            order_date,
            payment_status: PaymentStatus::Completed,
            estimated_delivery: order_date + Duration::days(DELIVERY_ESTIMATE_DAYS),
            source,
        }
    }

    pub fn item_count(&self) -> u32 { self.items.iter().map(|l| l.quantity.value()).sum() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;
    use crate::pricing::{price, PricingRules};

    fn customer() -> Customer {
        Customer {
            user_id: Some(2),
            name: " Jane Doe ".into(),
            email: "jane@example.com".into(),
            address: "1 Main St".into(),
            city: "Jakarta".into(),
            postal_code: "10110".into(),
            country: "Indonesia".into(),
            ..Customer::default()
        }
    }

    #[test]
    fn test_order_create() {
        let items = vec![CartLine::new(widget(1, Decimal::new(20, 0)))];
        let breakdown = price(&items, &PricingRules::default());
        let now = Utc::now();
        let order = Order::create(OrderId::new("ORD1").unwrap(), &customer(), items, &breakdown, PaymentMethod::CashOnDelivery, OrderSource::BuyNow, now);
        assert_eq!(order.customer_name, "Jane Doe");
        assert_eq!(order.shipping_address, "1 Main St, Jakarta, 10110, Indonesia");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.estimated_delivery - order.order_date, Duration::days(5));
        assert_eq!(order.item_count(), 1);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&OrderSource::BuyNow).unwrap(), "\"buy_now\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::CreditCard).unwrap(), "\"credit-card\"");
        let cod: PaymentMethod = serde_json::from_str("\"cod\"").unwrap();
        assert_eq!(cod, PaymentMethod::CashOnDelivery);
    }
}
