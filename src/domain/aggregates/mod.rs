//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductId, Rating};
pub use order::{Customer, Order, OrderSource, OrderStatus, PaymentMethod, PaymentStatus};
pub use cart::{AddOutcome, Cart, CartLine};
