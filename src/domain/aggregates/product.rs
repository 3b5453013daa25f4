//! Product Aggregate
//!
//! Catalog records as served by the remote catalog. Read-only locally.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ProductId = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: Rating,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rate: f64,
    pub count: u64,
}

impl Product {
    /// Case-insensitive match against title and description.
    pub fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }

    /// Whole stars shown on the detail view.
    pub fn stars(&self) -> u8 {
        self.rating.rate.clamp(0.0, 5.0).round() as u8
    }
}

#[cfg(test)]
pub(crate) fn widget(id: ProductId, price: Decimal) -> Product {
    Product {
        id,
        title: format!("Widget {id}"),
        price,
        category: "gadgets".into(),
        image: format!("https://img.example/{id}.png"),
        description: "A widget".into(),
        rating: Rating { rate: 4.2, count: 10 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_record() {
        let json = r#"{"id":1,"title":"Fjallraven Backpack","price":109.95,"description":"Your perfect pack",
            "category":"men's clothing","image":"https://fakestoreapi.com/img/1.jpg","rating":{"rate":3.9,"count":120}}"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.price, Decimal::new(10995, 2));
        assert_eq!(p.rating.count, 120);
        assert_eq!(p.stars(), 4);
    }

    #[test]
    fn test_matches() {
        let p = widget(3, Decimal::ONE);
        assert!(p.matches("widget"));
        assert!(p.matches("a wid"));
        assert!(p.matches(""));
        assert!(!p.matches("backpack"));
    }
}
