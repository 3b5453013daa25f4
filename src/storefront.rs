//! Storefront
//!
//! Explicit application object wiring the stores to one key-value backend.
//! Built once at startup and handed to whatever drives it (the HTTP shell,
//! tests). Operations run to completion one at a time.

use chrono::Duration;
use std::sync::Arc;

use crate::checkout::{
    self, CheckoutEntry, CheckoutForm, CheckoutSession, DirectCheckoutPayload, Placement, Redirect, StoredPayload,
};
use crate::clock::{Clock, OrderIdGenerator, SystemClock, TimestampIds};
use crate::domain::aggregates::{AddOutcome, Order, Product, ProductId};
use crate::pricing::PricingRules;
use crate::routes::{guard, Access, Route};
use crate::services::auth::{AuthStore, Role, User};
use crate::services::cart::CartStore;
use crate::services::orders::{OrderFilter, OrderLedger};
use crate::storage::{keys, save_json, KeyValueStore};
use crate::{Config, Result, StorefrontError};

pub struct Storefront<S> {
    store: Arc<S>,
    cart: CartStore<S>,
    auth: AuthStore<S>,
    orders: OrderLedger<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn OrderIdGenerator>,
    rules: PricingRules,
    direct_ttl: Duration,
    session: Option<CheckoutSession>,
}

impl<S> std::fmt::Debug for Storefront<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront").field("rules", &self.rules).field("session", &self.session).finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> Storefront<S> {
    pub fn open(store: Arc<S>, config: &Config) -> Result<Self> {
        Ok(Self {
            cart: CartStore::load(store.clone())?,
            auth: AuthStore::new(store.clone()),
            orders: OrderLedger::new(store.clone()),
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(TimestampIds),
            rules: config.pricing.clone(),
            direct_ttl: config.direct_checkout_ttl,
            session: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn OrderIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn rules(&self) -> &PricingRules { &self.rules }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    pub fn cart(&self) -> &CartStore<S> { &self.cart }

    pub fn add_to_cart(&mut self, product: Product) -> Result<AddOutcome> { Ok(self.cart.add_item(product)?) }

    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> Result<bool> { Ok(self.cart.update_quantity(id, quantity)?) }

    pub fn update_quantity_input(&mut self, id: ProductId, raw: &str) -> Result<bool> { Ok(self.cart.update_quantity_input(id, raw)?) }

    pub fn remove_from_cart(&mut self, id: ProductId) -> Result<bool> { Ok(self.cart.remove_item(id)?) }

    pub fn clear_cart(&mut self) -> Result<()> { Ok(self.cart.clear()?) }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    pub fn current_user(&self) -> Result<Option<User>> { Ok(self.auth.current_user()?) }

    pub fn login(&mut self, email: &str, password: &str, role: Role) -> Result<User> { Ok(self.auth.login(email, password, role)?) }

    pub fn logout(&mut self) -> Result<()> {
        self.session = None;
        Ok(self.auth.logout()?)
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Stores a single-item payload for `product` and returns it for the
    /// navigation to carry. Replaces any earlier pending payload.
    pub fn buy_now(&mut self, product: Product) -> Result<DirectCheckoutPayload> {
        let payload = DirectCheckoutPayload::buy_now(product, self.clock.now());
        save_json(self.store.as_ref(), keys::DIRECT_CHECKOUT, &payload)?;
        self.session = None;
        tracing::info!(product_id = payload.items.first().map(|l| l.id()), "buy-now payload stored");
        Ok(payload)
    }

    /// Resolves checkout entry once. A successful resolution is kept as the
    /// current session until it is submitted or abandoned.
    pub fn enter_checkout(
        &mut self,
        carried: Option<DirectCheckoutPayload>,
        intent: Option<uuid::Uuid>,
    ) -> Result<std::result::Result<&CheckoutSession, Redirect>> {
        let user = self.auth.current_user()?;
        let stored = StoredPayload::from_raw(self.store.get(keys::DIRECT_CHECKOUT)?.as_deref());
        let entry = CheckoutEntry { carried, intent, stored, cart: self.cart.cart(), user: user.as_ref() };
        let resolution = entry.resolve(&self.rules, self.clock.now(), self.direct_ttl);

        if resolution.discard_stored {
            self.store.remove(keys::DIRECT_CHECKOUT)?;
        }
        match resolution.outcome {
            Ok(session) => {
                let session: &CheckoutSession = self.session.insert(session);
                Ok(Ok(session))
            }
            Err(redirect) => {
                tracing::info!(?redirect, "checkout entry redirected");
                self.session = None;
                Ok(Err(redirect))
            }
        }
    }

    pub fn checkout_session(&self) -> Option<&CheckoutSession> { self.session.as_ref() }

    /// Starting form values for the current shopper.
    pub fn checkout_form(&self) -> Result<CheckoutForm> {
        Ok(self.current_user()?.as_ref().map(CheckoutForm::prefilled).unwrap_or_default())
    }

    /// Places the order for the current session. On any failure nothing is
    /// applied and the session stays open for another attempt.
    pub fn submit(&mut self, form: &CheckoutForm) -> Result<Order> {
        let session = self.session.as_ref().ok_or(StorefrontError::NoCheckoutSession)?;
        let user = self.auth.current_user()?;
        let placement = Placement { ledger: &self.orders, cart: self.cart.cart(), ids: self.ids.as_ref(), now: self.clock.now() };
        let order = checkout::place_order(session, form, user.as_ref(), &placement)?;

        self.session = None;
        self.cart.reload()?;
        Ok(order)
    }

    /// Leaves checkout without ordering; a pending buy-now payload is dropped.
    pub fn abandon_checkout(&mut self) -> Result<()> {
        self.session = None;
        self.store.remove(keys::DIRECT_CHECKOUT)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Applies the access policy for `path`. Leaving the checkout flow for an
    /// unrelated page invalidates any pending buy-now payload.
    pub fn navigate(&mut self, path: &str) -> Result<(Route, Access)> {
        let route = Route::parse(path);
        if !route.keeps_direct_checkout() {
            if self.store.get(keys::DIRECT_CHECKOUT)?.is_some() {
                tracing::debug!(%route, "navigation dropped pending buy-now payload");
            }
            self.abandon_checkout()?;
        }
        let user = self.current_user()?;
        Ok((route, guard(route, user.as_ref())))
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Admins see every order; shoppers see their own.
    pub fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let Some(user) = self.current_user()? else { return Ok(Vec::new()) };
        let mut filter = filter.clone();
        if !user.is_admin() {
            filter.user_id = Some(user.id);
        }
        Ok(self.orders.search(&filter)?)
    }

    pub fn last_order(&self) -> Result<Option<Order>> { Ok(self.orders.last_order()?) }
}
