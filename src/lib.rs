//! Storefront
//!
//! Cart, pricing and checkout core for a single-shopper storefront whose
//! persistence is a profile-local key-value store.
//!
//! ## Features
//! - Cart store with clamped quantities
//! - Buy-now and cart checkout reconciled into one immutable session
//! - Exact-decimal pricing (shipping threshold, flat fee, tax)
//! - Checkout form validation
//! - All-or-nothing order commit
//! - Mocked authentication and route guards
//! - Remote product catalog with search, filter and sort

pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod domain;
pub mod http;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod storage;
pub mod storefront;

use thiserror::Error;

pub use catalog::{CatalogClient, CatalogError, CatalogState, ProductQuery, SortBy};
pub use checkout::{
    CheckoutEntry, CheckoutError, CheckoutMode, CheckoutSession, DirectCheckoutPayload, Redirect,
};
pub use config::Config;
pub use domain::aggregates::{Cart, CartLine, Order, OrderSource, Product};
pub use pricing::{price, PriceBreakdown, PricingRules};
pub use services::auth::{AuthError, Role, User};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use storefront::Storefront;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("No checkout in progress")]
    NoCheckoutSession,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
