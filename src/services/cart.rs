//! Cart Store
//!
//! Owns the shopper's cart lines. Every mutation is staged on a copy,
//! persisted, and only then made visible, so memory and storage never diverge.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::aggregates::{AddOutcome, Cart, CartLine, Product, ProductId};
use crate::domain::value_objects::Quantity;
use crate::storage::{keys, load_json, save_json, KeyValueStore, StorageError};

#[derive(Debug)]
pub struct CartStore<S> {
    store: Arc<S>,
    cart: Cart,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Loads whatever cart the profile already holds.
    pub fn load(store: Arc<S>) -> Result<Self, StorageError> {
        let lines: Vec<CartLine> = load_json(store.as_ref(), keys::CART)?.unwrap_or_default();
        let cart = Cart::from_lines(lines);
        tracing::debug!(lines = cart.lines().len(), "cart loaded");
        Ok(Self { store, cart })
    }

    /// Re-reads the stored cart, e.g. after a checkout commit cleared it.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        let lines: Vec<CartLine> = load_json(self.store.as_ref(), keys::CART)?.unwrap_or_default();
        self.cart = Cart::from_lines(lines);
        Ok(())
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn lines(&self) -> &[CartLine] { self.cart.lines() }
    pub fn is_in_cart(&self, id: ProductId) -> bool { self.cart.is_in_cart(id) }
    pub fn total_items(&self) -> u32 { self.cart.total_items() }
    pub fn total_price(&self) -> Decimal { self.cart.total_price() }

    pub fn add_item(&mut self, product: Product) -> Result<AddOutcome, StorageError> {
        let id = product.id;
        let outcome = self.mutate(|cart| cart.add_item(product))?;
        match outcome {
            AddOutcome::AtCapacity => tracing::info!(product_id = id, "cart line already at maximum quantity"),
            _ => tracing::debug!(product_id = id, ?outcome, "added to cart"),
        }
        Ok(outcome)
    }

    /// Sets a quantity, clamped into `[1, 10]`. Returns false for an unknown id.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> Result<bool, StorageError> {
        if !self.cart.is_in_cart(id) {
            return Ok(false);
        }
        self.mutate(|cart| cart.update_quantity(id, quantity))
    }

    /// Quantity straight from a form field; non-numeric input becomes 1.
    pub fn update_quantity_input(&mut self, id: ProductId, raw: &str) -> Result<bool, StorageError> {
        self.update_quantity(id, i64::from(Quantity::parse_input(raw).value()))
    }

    pub fn remove_item(&mut self, id: ProductId) -> Result<bool, StorageError> {
        if !self.cart.is_in_cart(id) {
            return Ok(false);
        }
        self.mutate(|cart| cart.remove_item(id))
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.mutate(Cart::clear)
    }

    fn mutate<T>(&mut self, f: impl FnOnce(&mut Cart) -> T) -> Result<T, StorageError> {
        let mut next = self.cart.clone();
        let out = f(&mut next);
        save_json(self.store.as_ref(), keys::CART, next.lines())?;
        self.cart = next;
        Ok(out)
    }
}
