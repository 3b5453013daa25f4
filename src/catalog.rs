//! Product catalog
//!
//! One `GET` against the remote catalog returning a flat JSON array of
//! products. No retry: a failure is reported and the shopper retries by hand.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::aggregates::{Product, ProductId};

pub const DEFAULT_CATALOG_URL: &str = "https://fakestoreapi.com/products";

/// Message shown to the shopper for any fetch failure.
pub const FETCH_FAILED_MESSAGE: &str = "Please try again later.";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned HTTP {0}")]
    Status(u16),
}

impl CatalogError {
    pub fn user_message(&self) -> &'static str { FETCH_FAILED_MESSAGE }
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { url: url.into(), client })
    }

    pub async fn fetch(&self) -> Result<Vec<Product>, CatalogError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(CatalogError::Status(resp.status().as_u16()));
        }
        let products: Vec<Product> = resp.json().await?;
        tracing::info!(count = products.len(), url = %self.url, "catalog fetched");
        Ok(products)
    }

    /// Fetches into the `{items, isLoading, error}` shape the views consume.
    pub async fn load(&self) -> CatalogState {
        match self.fetch().await {
            Ok(items) => CatalogState { items, is_loading: false, error: None },
            Err(err) => {
                tracing::error!(error = %err, "catalog fetch failed");
                CatalogState { items: Vec::new(), is_loading: false, error: Some(err.user_message().to_string()) }
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    pub items: Vec<Product>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Default,
    PriceLow,
    PriceHigh,
    Rating,
}

/// Product list filters. `category` of `None` or `"all"` means every category.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
}

impl ProductQuery {
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let needle = self.search.as_deref().unwrap_or_default().trim().to_lowercase();
        let category = self.category.as_deref().filter(|c| !c.is_empty() && *c != "all");
        let mut found: Vec<&Product> = products
            .iter()
            .filter(|p| p.matches(&needle))
            .filter(|p| category.map_or(true, |c| p.category == c))
            .collect();
        match self.sort {
            SortBy::Default => {}
            SortBy::PriceLow => found.sort_by(|a, b| a.price.cmp(&b.price)),
            SortBy::PriceHigh => found.sort_by(|a, b| b.price.cmp(&a.price)),
            SortBy::Rating => found.sort_by(|a, b| b.rating.rate.total_cmp(&a.rating.rate)),
        }
        found
    }
}

/// `"all"` followed by each distinct category in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out = vec!["all".to_string()];
    for p in products {
        if !out.iter().any(|c| c == &p.category) {
            out.push(p.category.clone());
        }
    }
    out
}

pub fn find(products: &[Product], id: ProductId) -> Option<&Product> {
    products.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;
    use rust_decimal::Decimal;

    fn shelf() -> Vec<Product> {
        let mut a = widget(1, Decimal::new(30, 0));
        a.category = "electronics".into();
        a.rating.rate = 3.0;
        let mut b = widget(2, Decimal::new(10, 0));
        b.title = "Silver Ring".into();
        b.category = "jewelery".into();
        b.rating.rate = 4.9;
        let c = widget(3, Decimal::new(20, 0));
        vec![a, b, c]
    }

    #[test]
    fn test_search_and_category() {
        let products = shelf();
        let q = ProductQuery { search: Some("RING".into()), ..ProductQuery::default() };
        assert_eq!(q.apply(&products).iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        let q = ProductQuery { category: Some("electronics".into()), ..ProductQuery::default() };
        assert_eq!(q.apply(&products).len(), 1);
        let q = ProductQuery { category: Some("all".into()), ..ProductQuery::default() };
        assert_eq!(q.apply(&products).len(), 3);
    }

    #[test]
    fn test_sorting() {
        let products = shelf();
        let ids = |sort| ProductQuery { sort, ..ProductQuery::default() }.apply(&products).iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(SortBy::Default), vec![1, 2, 3]);
        assert_eq!(ids(SortBy::PriceLow), vec![2, 3, 1]);
        assert_eq!(ids(SortBy::PriceHigh), vec![1, 3, 2]);
        assert_eq!(ids(SortBy::Rating), vec![2, 3, 1]);
    }

    #[test]
    fn test_categories_and_find() {
        let products = shelf();
        assert_eq!(categories(&products), vec!["all", "electronics", "jewelery", "gadgets"]);
        assert_eq!(find(&products, 3).map(|p| p.id), Some(3));
        assert!(find(&products, 99).is_none());
    }

    #[tokio::test]
    async fn test_fetch_from_local_server() {
        use axum::{routing::get, Json, Router};

        let body = serde_json::json!([{
            "id": 1, "title": "Backpack", "price": 109.95, "description": "pack",
            "category": "men's clothing", "image": "https://img/1.jpg", "rating": {"rate": 3.9, "count": 120}
        }]);
        let app = Router::new().route("/products", get(move || async move { Json(body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = CatalogClient::new(format!("http://{addr}/products")).unwrap();
        let state = client.load().await;
        assert!(state.error.is_none());
        assert_eq!(state.items[0].price, Decimal::new(10995, 2));

        let missing = CatalogClient::new(format!("http://{addr}/nope")).unwrap();
        let state = missing.load().await;
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(state.items.is_empty());
    }
}
