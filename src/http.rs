//! Local HTTP shell
//!
//! JSON routes standing in for the storefront's views. One shopper profile
//! per process; every handler locks the storefront, runs one operation to
//! completion and releases it before any await.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::catalog::{self, CatalogClient, ProductQuery};
use crate::checkout::{CheckoutError, CheckoutForm, CheckoutSession, DirectCheckoutPayload, Redirect};
use crate::domain::aggregates::{AddOutcome, CartLine, Order, Product, ProductId};
use crate::domain::value_objects::{display_amount, to_cents};
use crate::pricing::PriceBreakdown;
use crate::routes::{Access, Route};
use crate::services::auth::{AuthError, Role, User};
use crate::services::orders::OrderFilter;
use crate::storage::KeyValueStore;
use crate::{Storefront, StorefrontError};

/// Catalog fetched on first use and kept for the process lifetime. A failed
/// fetch is not cached, so the next request retries.
#[derive(Debug)]
pub struct CatalogCache {
    client: Option<CatalogClient>,
    cached: tokio::sync::Mutex<Option<Arc<Vec<Product>>>>,
}

impl CatalogCache {
    pub fn remote(client: CatalogClient) -> Self {
        Self { client: Some(client), cached: tokio::sync::Mutex::new(None) }
    }

    /// A fixed product list with no remote source.
    pub fn fixed(products: Vec<Product>) -> Self {
        Self { client: None, cached: tokio::sync::Mutex::new(Some(Arc::new(products))) }
    }

    pub async fn products(&self) -> Result<Arc<Vec<Product>>, StorefrontError> {
        let mut cached = self.cached.lock().await;
        if let Some(products) = cached.as_ref() {
            return Ok(products.clone());
        }
        let Some(client) = &self.client else { return Ok(Arc::new(Vec::new())) };
        let products = Arc::new(client.fetch().await?);
        *cached = Some(products.clone());
        Ok(products)
    }

    async fn product(&self, id: ProductId) -> Result<Product, StorefrontError> {
        let products = self.products().await?;
        catalog::find(&products, id).cloned().ok_or(StorefrontError::ProductNotFound)
    }
}

pub struct AppState<S> {
    pub storefront: Arc<Mutex<Storefront<S>>>,
    pub catalog: Arc<CatalogCache>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self { Self { storefront: self.storefront.clone(), catalog: self.catalog.clone() } }
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(storefront: Storefront<S>, catalog: CatalogCache) -> Self {
        Self { storefront: Arc::new(Mutex::new(storefront)), catalog: Arc::new(catalog) }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Storefront<S>) -> crate::Result<T>) -> Result<T, ApiError> {
        let mut storefront = self.storefront.lock();
        f(&mut *storefront).map_err(ApiError)
    }
}

pub fn router<S: KeyValueStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/products", get(list_products::<S>))
        .route("/api/v1/products/:id", get(get_product::<S>))
        .route("/api/v1/products/:id/buy-now", post(buy_now::<S>))
        .route("/api/v1/cart", get(get_cart::<S>).post(add_to_cart::<S>).delete(clear_cart::<S>))
        .route("/api/v1/cart/:id", put(update_quantity::<S>).delete(remove_from_cart::<S>))
        .route("/api/v1/login", post(login::<S>))
        .route("/api/v1/logout", post(logout::<S>))
        .route("/api/v1/checkout/session", post(enter_checkout::<S>).delete(abandon_checkout::<S>))
        .route("/api/v1/checkout", post(submit_checkout::<S>))
        .route("/api/v1/orders", get(list_orders::<S>))
        .route("/api/v1/orders/last", get(last_order::<S>))
        .route("/api/v1/navigate", post(navigate::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub struct ApiError(pub StorefrontError);

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self { Self(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorefrontError::ProductNotFound => StatusCode::NOT_FOUND,
            StorefrontError::NoCheckoutSession => StatusCode::CONFLICT,
            StorefrontError::Checkout(CheckoutError::Invalid(errors)) => {
                let body = serde_json::json!({"error": self.0.to_string(), "fields": errors});
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
            }
            StorefrontError::Checkout(CheckoutError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            StorefrontError::Auth(AuthError::MissingEmail) => StatusCode::BAD_REQUEST,
            StorefrontError::Auth(AuthError::WrongPassword | AuthError::NotAdmin) => StatusCode::UNAUTHORIZED,
            StorefrontError::Catalog(err) => {
                tracing::error!(error = %err, "catalog unavailable");
                let body = serde_json::json!({"error": err.user_message()});
                return (StatusCode::BAD_GATEWAY, Json(body)).into_response();
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Serialize)]
struct ProductList {
    items: Vec<Product>,
    categories: Vec<String>,
}

async fn list_products<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Query(q): Query<ProductQuery>) -> ApiResult<ProductList> {
    let products = s.catalog.products().await?;
    let items = q.apply(&products).into_iter().cloned().collect();
    Ok(Json(ProductList { items, categories: catalog::categories(&products) }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductDetail {
    product: Product,
    stars: u8,
    in_cart: bool,
}

async fn get_product<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Path(id): Path<ProductId>) -> ApiResult<ProductDetail> {
    let product = s.catalog.product(id).await?;
    let in_cart = s.with(|sf| Ok(sf.cart().is_in_cart(id)))?;
    Ok(Json(ProductDetail { stars: product.stars(), product, in_cart }))
}

async fn buy_now<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Path(id): Path<ProductId>) -> Result<(StatusCode, Json<DirectCheckoutPayload>), ApiError> {
    let product = s.catalog.product(id).await?;
    let payload = s.with(|sf| sf.buy_now(product))?;
    Ok((StatusCode::CREATED, Json(payload)))
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    lines: Vec<CartLine>,
    total_items: u32,
    total_price: Decimal,
    summary: PriceBreakdown,
    amount_to_free_shipping: Option<Decimal>,
    shipping_note: String,
}

fn cart_view<S: KeyValueStore>(sf: &Storefront<S>) -> CartView {
    let cart = sf.cart();
    let rules = sf.rules();
    let subtotal = cart.total_price();
    let remaining = rules.amount_to_free_shipping(subtotal);
    let shipping_note = match remaining {
        Some(more) => format!("Add ${} more to get free shipping", display_amount(more)),
        None => "You qualify for free shipping!".to_string(),
    };
    CartView {
        lines: cart.lines().to_vec(),
        total_items: cart.total_items(),
        total_price: subtotal,
        summary: rules.breakdown(subtotal).rounded(),
        amount_to_free_shipping: remaining.filter(|d| d.is_sign_positive() && !d.is_zero()).map(to_cents),
        shipping_note,
    }
}

async fn get_cart<S: KeyValueStore + 'static>(State(s): State<AppState<S>>) -> ApiResult<CartView> {
    Ok(Json(s.with(|sf| Ok(cart_view(sf)))?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartRequest {
    product_id: ProductId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartResponse {
    at_capacity: bool,
    cart: CartView,
}

async fn add_to_cart<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Json(r): Json<AddToCartRequest>) -> ApiResult<AddToCartResponse> {
    let product = s.catalog.product(r.product_id).await?;
    let resp = s.with(|sf| {
        let outcome = sf.add_to_cart(product)?;
        Ok(AddToCartResponse { at_capacity: outcome == AddOutcome::AtCapacity, cart: cart_view(sf) })
    })?;
    Ok(Json(resp))
}

/// Quantity as typed into the field: a number, or text that may not parse.
#[derive(Debug, Deserialize)]
struct QuantityRequest {
    quantity: serde_json::Value,
}

impl QuantityRequest {
    /// The value as the field would show it; numbers go through the same parse as text.
    fn raw(&self) -> String {
        match &self.quantity {
            serde_json::Value::String(raw) => raw.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}

async fn update_quantity<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Path(id): Path<ProductId>, Json(r): Json<QuantityRequest>) -> ApiResult<CartView> {
    let view = s.with(|sf| {
        if !sf.update_quantity_input(id, &r.raw())? {
            return Err(StorefrontError::ProductNotFound);
        }
        Ok(cart_view(sf))
    })?;
    Ok(Json(view))
}

async fn remove_from_cart<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Path(id): Path<ProductId>) -> ApiResult<CartView> {
    Ok(Json(s.with(|sf| {
        sf.remove_from_cart(id)?;
        Ok(cart_view(sf))
    })?))
}

async fn clear_cart<S: KeyValueStore + 'static>(State(s): State<AppState<S>>) -> Result<StatusCode, ApiError> {
    s.with(|sf| sf.clear_cart())?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    role: Role,
}

async fn login<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Json(r): Json<LoginRequest>) -> ApiResult<User> {
    Ok(Json(s.with(|sf| sf.login(&r.email, &r.password, r.role))?))
}

async fn logout<S: KeyValueStore + 'static>(State(s): State<AppState<S>>) -> Result<StatusCode, ApiError> {
    s.with(|sf| sf.logout())?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct EnterCheckoutRequest {
    #[serde(default)]
    payload: Option<DirectCheckoutPayload>,
    #[serde(default)]
    intent: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EnterCheckoutResponse {
    Ready { session: CheckoutSession, form: CheckoutForm, back: Route },
    Redirect(Redirect),
}

async fn enter_checkout<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, body: Option<Json<EnterCheckoutRequest>>) -> ApiResult<EnterCheckoutResponse> {
    let r = body.map(|Json(r)| r).unwrap_or_default();
    let resp = s.with(|sf| {
        let session = match sf.enter_checkout(r.payload, r.intent)? {
            Ok(session) => session.clone(),
            Err(redirect) => return Ok(EnterCheckoutResponse::Redirect(redirect)),
        };
        let back = session.mode().back_route();
        Ok(EnterCheckoutResponse::Ready { session, form: sf.checkout_form()?, back })
    })?;
    Ok(Json(resp))
}

async fn abandon_checkout<S: KeyValueStore + 'static>(State(s): State<AppState<S>>) -> Result<StatusCode, ApiError> {
    s.with(|sf| sf.abandon_checkout())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_checkout<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Json(form): Json<CheckoutForm>) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = s.with(|sf| sf.submit(&form))?;
    Ok((StatusCode::CREATED, Json(order)))
}

// =============================================================================
// Orders and navigation
// =============================================================================

async fn list_orders<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Query(filter): Query<OrderFilter>) -> ApiResult<Vec<Order>> {
    Ok(Json(s.with(|sf| sf.orders(&filter))?))
}

async fn last_order<S: KeyValueStore + 'static>(State(s): State<AppState<S>>) -> ApiResult<Option<Order>> {
    Ok(Json(s.with(|sf| sf.last_order())?))
}

#[derive(Debug, Deserialize)]
struct NavigateRequest {
    path: String,
}

#[derive(Debug, Serialize)]
struct NavigateResponse {
    route: Route,
    #[serde(flatten)]
    access: Access,
}

async fn navigate<S: KeyValueStore + 'static>(State(s): State<AppState<S>>, Json(r): Json<NavigateRequest>) -> ApiResult<NavigateResponse> {
    let (route, access) = s.with(|sf| sf.navigate(&r.path))?;
    Ok(Json(NavigateResponse { route, access }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::widget;
    use crate::storage::MemoryStore;
    use crate::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let sf = Storefront::open(store, &Config::default()).unwrap();
        let products = vec![widget(1, Decimal::new(20, 0)), widget(2, Decimal::new(60, 0))];
        router(AppState::new(sf, CatalogCache::fixed(products)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn test_cart_routes() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/v1/cart", Some(serde_json::json!({"productId": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cart"]["totalItems"], 1);

        let (_, body) = call(&app, "PUT", "/api/v1/cart/1", Some(serde_json::json!({"quantity": 2}))).await;
        assert_eq!(body["summary"]["total"], "49.00");
        assert_eq!(body["summary"]["subtotal"], "40.00");
        assert_eq!(body["amountToFreeShipping"], "10.00");
        assert_eq!(body["shippingNote"], "Add $10.00 more to get free shipping");

        let (_, body) = call(&app, "PUT", "/api/v1/cart/1", Some(serde_json::json!({"quantity": 3.7}))).await;
        assert_eq!(body["totalItems"], 3);
        assert_eq!(body["shippingNote"], "You qualify for free shipping!");

        let (_, body) = call(&app, "PUT", "/api/v1/cart/1", Some(serde_json::json!({"quantity": "lots"}))).await;
        assert_eq!(body["totalItems"], 1);

        let (status, _) = call(&app, "PUT", "/api/v1/cart/9", Some(serde_json::json!({"quantity": 2}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checkout_requires_login_then_succeeds() {
        let app = app();
        let (_, payload) = call(&app, "POST", "/api/v1/products/2/buy-now", None).await;
        let (_, body) = call(&app, "POST", "/api/v1/checkout/session", None).await;
        assert_eq!(body["redirect"], "login");
        assert_eq!(body["mode"], "buy_now");

        let login = serde_json::json!({"email": "jane@example.com", "password": "customer123"});
        let (status, _) = call(&app, "POST", "/api/v1/login", Some(login)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "POST", "/api/v1/checkout/session", Some(serde_json::json!({"intent": payload["intent"]}))).await;
        assert_eq!(body["session"]["mode"], "buy_now");
        assert_eq!(body["form"]["fullName"], "jane");

        let form = serde_json::json!({
            "fullName": "Jane", "email": "jane@example.com", "address": "1 Main St", "city": "Jakarta",
            "postalCode": "10110", "paymentMethod": "cash-on-delivery"
        });
        let (status, order) = call(&app, "POST", "/api/v1/checkout", Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["source"], "buy_now");
        assert_eq!(order["total"], "66.00");
    }

    #[tokio::test]
    async fn test_invalid_form_reports_fields() {
        let app = app();
        call(&app, "POST", "/api/v1/login", Some(serde_json::json!({"email": "jane@example.com", "password": "customer123"}))).await;
        call(&app, "POST", "/api/v1/cart", Some(serde_json::json!({"productId": 1}))).await;
        call(&app, "POST", "/api/v1/checkout/session", None).await;
        let form = serde_json::json!({
            "fullName": "Jane", "email": "jane@example.com", "address": "1 Main St", "city": "Jakarta",
            "postalCode": "10110", "paymentMethod": "credit-card", "cardNumber": "1234", "cardExpiry": "12/29", "cardCVC": "123"
        });
        let (status, body) = call(&app, "POST", "/api/v1/checkout", Some(form)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"]["cardNumber"], "Card number must be 16 digits");
    }

    #[tokio::test]
    async fn test_navigate_and_unknown_product() {
        let app = app();
        let (_, body) = call(&app, "POST", "/api/v1/navigate", Some(serde_json::json!({"path": "/admin/dashboard"}))).await;
        assert_eq!(body["access"], "redirect");
        assert_eq!(body["to"]["route"], "home");
        call(&app, "POST", "/api/v1/cart", Some(serde_json::json!({"productId": 2}))).await;
        let (_, body) = call(&app, "GET", "/api/v1/products/2", None).await;
        assert_eq!(body["stars"], 4);
        assert_eq!(body["inCart"], true);
        let (status, _) = call(&app, "GET", "/api/v1/products/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = call(&app, "GET", "/api/v1/products?sort=price-high", None).await;
        assert_eq!(body["items"][0]["id"], 2);
    }
}
