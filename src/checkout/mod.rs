//! Checkout
//!
//! Checkout entry decides once which items are being bought: a buy-now
//! payload or the cart. The resulting [`CheckoutSession`] is immutable, so
//! nothing the shopper does while filling in the form can change what they
//! pay for. Submission validates the form and commits the order together
//! with its side effects in one storage batch.

pub mod direct;
pub mod form;

pub use direct::{DirectCheckoutPayload, StoredPayload};
pub use form::{CardDetails, CheckoutForm, FieldErrors};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::OrderIdGenerator;
use crate::domain::aggregates::{Cart, CartLine, Order, OrderSource};
use crate::domain::value_objects::{OrderId, OrderIdError};
use crate::pricing::{price, PriceBreakdown, PricingRules};
use crate::routes::Route;
use crate::services::auth::User;
use crate::services::orders::{LedgerError, OrderLedger};
use crate::storage::{keys, KeyValueStore, StorageError, Write};

/// Fresh ids tried before giving up on a colliding generator.
pub const MAX_ID_ATTEMPTS: usize = 5;

pub const NO_ITEMS_ALERT: &str = "No items to checkout. Please try again.";

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("checkout form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    #[error("login required to place an order")]
    Unauthenticated,

    #[error("could not allocate a unique order id after {0} attempts")]
    IdCollision(usize),

    #[error("invalid order id: {0}")]
    OrderId(#[from] OrderIdError),

    #[error("An error occurred. Please try again. ({0})")]
    Storage(#[from] StorageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Cart,
    BuyNow,
}

impl CheckoutMode {
    pub fn source(&self) -> OrderSource {
        match self { Self::Cart => OrderSource::Cart, Self::BuyNow => OrderSource::BuyNow }
    }

    /// Where "back" leads from the checkout screen.
    pub fn back_route(&self) -> Route {
        match self { Self::Cart => Route::Cart, Self::BuyNow => Route::Products }
    }
}

/// Where checkout entry sends the shopper instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "redirect", rename_all = "camelCase")]
pub enum Redirect {
    /// Not signed in. The buy-now payload stays stored, so returning to
    /// `return_to` after login resumes the same mode.
    Login {
        #[serde(rename = "returnTo")]
        return_to: Route,
        mode: CheckoutMode,
        intent: Option<Uuid>,
    },
    /// A buy-now payload with no items.
    Products { alert: &'static str },
    /// Cart mode with an empty cart.
    Cart,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    mode: CheckoutMode,
    items: Vec<CartLine>,
    breakdown: PriceBreakdown,
    started_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn mode(&self) -> CheckoutMode { self.mode }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn breakdown(&self) -> &PriceBreakdown { &self.breakdown }
    pub fn total(&self) -> rust_decimal::Decimal { self.breakdown.total }
}

/// Result of resolving a checkout entry.
#[derive(Debug)]
pub struct Resolution {
    pub outcome: Result<CheckoutSession, Redirect>,
    /// The stored buy-now payload is stale, corrupt or empty and should be deleted.
    pub discard_stored: bool,
}

/// Everything checkout entry looks at, gathered once.
#[derive(Debug)]
pub struct CheckoutEntry<'a> {
    /// Payload carried by the navigation itself.
    pub carried: Option<DirectCheckoutPayload>,
    /// Intent token carried by the navigation, if any.
    pub intent: Option<Uuid>,
    pub stored: StoredPayload,
    pub cart: &'a Cart,
    pub user: Option<&'a User>,
}

impl CheckoutEntry<'_> {
    /// Picks the mode, then applies the login gate, then checks there is
    /// something to buy.
    ///
    /// A stored payload counts only if the navigation carries its intent
    /// token or it is younger than `ttl`. An empty buy-now payload never
    /// falls back to the cart.
    pub fn resolve(self, rules: &PricingRules, now: DateTime<Utc>, ttl: Duration) -> Resolution {
        let mut discard_stored = false;
        let direct = match (self.carried, self.stored) {
            (Some(carried), _) => Some(carried),
            (None, StoredPayload::Present(payload)) => {
                let claimed = self.intent.is_some() && payload.intent == self.intent;
                if claimed || payload.is_fresh(now, ttl) {
                    Some(payload)
                } else {
                    tracing::warn!(created = payload.timestamp, "discarding stale buy-now payload");
                    discard_stored = true;
                    None
                }
            }
            (None, StoredPayload::Corrupt) => {
                discard_stored = true;
                None
            }
            (None, StoredPayload::Absent) => None,
        };

        let mode = if direct.is_some() { CheckoutMode::BuyNow } else { CheckoutMode::Cart };
        tracing::debug!(?mode, "checkout mode resolved");

        if self.user.is_none() {
            let intent = direct.as_ref().and_then(|p| p.intent);
            return Resolution { outcome: Err(Redirect::Login { return_to: Route::Checkout, mode, intent }), discard_stored };
        }

        let items = match direct {
            Some(payload) if payload.is_empty() => {
                tracing::warn!("buy-now payload has no items");
                return Resolution { outcome: Err(Redirect::Products { alert: NO_ITEMS_ALERT }), discard_stored: true };
            }
            Some(payload) => payload.items,
            None if self.cart.is_empty() => return Resolution { outcome: Err(Redirect::Cart), discard_stored },
            None => self.cart.lines().to_vec(),
        };

        let breakdown = price(&items, rules);
        tracing::info!(?mode, lines = items.len(), total = %breakdown.total, "checkout session started");
        Resolution { outcome: Ok(CheckoutSession { mode, items, breakdown, started_at: now }), discard_stored }
    }
}

/// Collaborators needed to place an order.
pub struct Placement<'a, S> {
    pub ledger: &'a OrderLedger<S>,
    /// Live cart at submission; cart mode keeps whatever the order did not take.
    pub cart: &'a Cart,
    pub ids: &'a dyn OrderIdGenerator,
    pub now: DateTime<Utc>,
}

/// Validates `form` and commits the order for `session`.
///
/// The order append, last-order snapshot, optional profile merge, removal of
/// the ordered lines from the cart (cart mode only) and buy-now payload
/// removal are one batch: either all of them land or none do.
pub fn place_order<S: KeyValueStore>(
    session: &CheckoutSession,
    form: &CheckoutForm,
    user: Option<&User>,
    placement: &Placement<'_, S>,
) -> Result<Order, CheckoutError> {
    let errors = form.errors();
    if !errors.is_empty() {
        tracing::debug!(fields = ?errors.fields().collect::<Vec<_>>(), "checkout form rejected");
        return Err(CheckoutError::Invalid(errors));
    }
    let user = user.ok_or(CheckoutError::Unauthenticated)?;

    let mut also = Vec::with_capacity(3);
    if form.save_info {
        also.push(Write::set_json(keys::USER, &user.merged_with(&form.saved_info()))?);
    }
    if session.mode == CheckoutMode::Cart {
        also.push(Write::set_json(keys::CART, placement.cart.without_ordered(&session.items).lines())?);
    }
    also.push(Write::remove(keys::DIRECT_CHECKOUT));

    let customer = form.customer(Some(user.id));
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = OrderId::new(placement.ids.next_id(placement.now))?;
        let order = Order::create(id, &customer, session.items.clone(), &session.breakdown, form.payment_method, session.mode.source(), placement.now);
        match placement.ledger.append_with(&order, also.clone()) {
            Ok(()) => {
                tracing::info!(order_id = %order.id, source = ?order.source, total = %order.total, "order placed");
                return Ok(order);
            }
            Err(LedgerError::DuplicateId(id)) => {
                tracing::warn!(order_id = %id, attempt, "order id collision; retrying");
            }
            Err(LedgerError::Storage(err)) => {
                tracing::error!(error = %err, "order commit failed; nothing applied");
                return Err(err.into());
            }
        }
    }
    Err(CheckoutError::IdCollision(MAX_ID_ATTEMPTS))
}
