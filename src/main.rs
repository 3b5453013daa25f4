//! Storefront - local shell over the cart and checkout core

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::http::{router, AppState, CatalogCache};
use storefront::{CatalogClient, Config, FileStore, Storefront};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let store = Arc::new(FileStore::open(config.data_dir.clone())?);
    let storefront = Storefront::open(store, &config)?;
    let catalog = CatalogCache::remote(CatalogClient::new(&config.catalog_url)?);
    tracing::info!(data_dir = %config.data_dir.display(), catalog = %config.catalog_url, "storefront opened");

    let app = router(AppState::new(storefront, catalog));
    let addr = format!("127.0.0.1:{}", config.port);
    tracing::info!("🛒 Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
