//! Storefront domain model
pub mod aggregates;
pub mod value_objects;
