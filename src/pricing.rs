//! Pricing
//!
//! Subtotal, shipping and tax for a set of checkout lines. All arithmetic is
//! exact decimal; rounding to cents is a display concern.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::to_cents;

/// Business rules applied on top of the subtotal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRules {
    /// Shipping is free only when the subtotal is strictly greater than this.
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    /// Applied to the subtotal only; shipping is not taxed.
    pub tax_rate: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::new(50, 0),
            flat_shipping_fee: Decimal::new(5, 0),
            tax_rate: Decimal::new(10, 2),
        }
    }
}

impl PricingRules {
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold { Decimal::ZERO } else { self.flat_shipping_fee }
    }

    pub fn tax_for(&self, subtotal: Decimal) -> Decimal { subtotal * self.tax_rate }

    /// How much more must be added before shipping becomes free, if anything.
    ///
    /// Because the threshold is exclusive, a cart sitting exactly on it still
    /// reports a remainder of zero while paying the fee; callers show the
    /// nudge only for positive remainders.
    pub fn amount_to_free_shipping(&self, subtotal: Decimal) -> Option<Decimal> {
        (subtotal <= self.free_shipping_threshold).then(|| self.free_shipping_threshold - subtotal)
    }

    pub fn breakdown(&self, subtotal: Decimal) -> PriceBreakdown {
        let shipping = self.shipping_for(subtotal);
        let tax = self.tax_for(subtotal);
        PriceBreakdown { subtotal, shipping, tax, total: subtotal + shipping + tax }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// Same breakdown rounded to cents for presentation.
    pub fn rounded(&self) -> Self {
        Self { subtotal: to_cents(self.subtotal), shipping: to_cents(self.shipping), tax: to_cents(self.tax), total: to_cents(self.total) }
    }
}

/// Prices a set of lines using the price captured on each line.
pub fn price(items: &[CartLine], rules: &PricingRules) -> PriceBreakdown {
    rules.breakdown(items.iter().map(CartLine::line_total).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;
    use crate::domain::value_objects::Quantity;

    fn line(price: Decimal, qty: i64) -> CartLine {
        let mut l = CartLine::new(widget(1, price));
        l.quantity = Quantity::clamped(qty);
        l
    }

    #[test]
    fn test_widget_scenario() {
        let b = price(&[line(Decimal::new(2000, 2), 2)], &PricingRules::default());
        assert_eq!(b.subtotal, Decimal::new(40, 0));
        assert_eq!(b.shipping, Decimal::new(5, 0));
        assert_eq!(b.tax, Decimal::new(4, 0));
        assert_eq!(b.total, Decimal::new(49, 0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let rules = PricingRules::default();
        assert_eq!(rules.breakdown(Decimal::new(5000, 2)).shipping, Decimal::new(5, 0));
        assert_eq!(rules.breakdown(Decimal::new(5001, 2)).shipping, Decimal::ZERO);
        assert_eq!(rules.amount_to_free_shipping(Decimal::new(5000, 2)), Some(Decimal::ZERO));
        assert_eq!(rules.amount_to_free_shipping(Decimal::new(4000, 2)), Some(Decimal::new(10, 0)));
        assert_eq!(rules.amount_to_free_shipping(Decimal::new(5001, 2)), None);
    }

    #[test]
    fn test_tax_ignores_shipping() {
        let rules = PricingRules::default();
        for cents in [0_i64, 1, 999, 5000, 5001, 123_456] {
            let subtotal = Decimal::new(cents, 2);
            let b = rules.breakdown(subtotal);
            assert_eq!(b.tax, subtotal * Decimal::new(10, 2));
            assert_eq!(b.total, b.subtotal + b.shipping + b.tax);
        }
    }

    #[test]
    fn test_no_float_drift_across_many_lines() {
        let lines: Vec<CartLine> = (0..1000).map(|_| line(Decimal::new(10, 2), 1)).collect();
        assert_eq!(price(&lines, &PricingRules::default()).subtotal, Decimal::new(100, 0));
    }

    #[test]
    fn test_empty_items() {
        let b = price(&[], &PricingRules::default());
        assert_eq!(b.subtotal, Decimal::ZERO);
        assert_eq!(b.shipping, Decimal::new(5, 0));
    }

    #[test]
    fn test_rounded() {
        let b = PricingRules::default().breakdown(Decimal::new(10995, 2)).rounded();
        assert_eq!(b.tax, Decimal::new(1100, 2));
        assert_eq!(b.total, Decimal::new(12095, 2));
    }

    #[test]
    fn test_rounded_serializes_with_cents() {
        let b = PricingRules::default().breakdown(Decimal::new(60, 0)).rounded();
        let json = serde_json::to_value(b).unwrap();
        assert_eq!(json, serde_json::json!({"subtotal": "60.00", "shipping": "0.00", "tax": "6.00", "total": "66.00"}));
    }
}
