//! Persisted stores over a shared key-value backend.
pub mod auth;
pub mod cart;
pub mod orders;

pub use auth::{AuthError, AuthStore, Role, SavedInfo, User};
pub use cart::CartStore;
pub use orders::{LedgerError, OrderFilter, OrderLedger};
