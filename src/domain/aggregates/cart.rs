//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::product::{Product, ProductId};
use crate::domain::value_objects::Quantity;

/// One product entry with the price, title and image captured when it was added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub quantity: Quantity,
}

impl CartLine {
    pub fn new(product: Product) -> Self { Self { product, quantity: Quantity::one() } }
    pub fn id(&self) -> ProductId { self.product.id }
    pub fn line_total(&self) -> Decimal { self.product.price * Decimal::from(self.quantity) }
}

/// What `Cart::add_item` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Incremented(Quantity),
    /// The line was already at the maximum; quantity is unchanged.
    AtCapacity,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from stored lines, merging duplicate ids.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            match cart.line_mut(line.id()) {
                Some(existing) => {
                    existing.quantity = Quantity::clamped(i64::from(existing.quantity.value()) + i64::from(line.quantity.value()));
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line(&self, id: ProductId) -> Option<&CartLine> { self.lines.iter().find(|l| l.id() == id) }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn is_in_cart(&self, id: ProductId) -> bool { self.line(id).is_some() }

    pub fn add_item(&mut self, product: Product) -> AddOutcome {
        match self.line_mut(product.id) {
            Some(existing) if existing.quantity.is_max() => AddOutcome::AtCapacity,
            Some(existing) => {
                existing.quantity = existing.quantity.increment();
                AddOutcome::Incremented(existing.quantity)
            }
            None => {
                self.lines.push(CartLine::new(product));
                AddOutcome::Inserted
            }
        }
    }

    /// Sets a line's quantity, clamped into range. Returns false when the id is absent.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        match self.line_mut(id) {
            Some(line) => {
                line.quantity = Quantity::clamped(quantity);
                true
            }
            None => false,
        }
    }

    /// Removes a line; returns whether anything was removed.
    pub fn remove_item(&mut self, id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id() != id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    /// What is left once `ordered` has been checked out. Quantities added
    /// after the order snapshot was taken are kept.
    pub fn without_ordered(&self, ordered: &[CartLine]) -> Cart {
        let lines = self
            .lines
            .iter()
            .filter_map(|line| {
                let bought: i64 = ordered.iter().filter(|o| o.id() == line.id()).map(|o| i64::from(o.quantity.value())).sum();
                let left = i64::from(line.quantity.value()) - bought;
                (left > 0).then(|| CartLine { product: line.product.clone(), quantity: Quantity::clamped(left) })
            })
            .collect();
        Cart { lines }
    }

    pub fn total_items(&self) -> u32 { self.lines.iter().map(|l| l.quantity.value()).sum() }

    pub fn total_price(&self) -> Decimal { self.lines.iter().map(CartLine::line_total).sum() }

    fn line_mut(&mut self, id: ProductId) -> Option<&mut CartLine> { self.lines.iter_mut().find(|l| l.id() == id) }
}
