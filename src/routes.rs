//! Client-side routes and the access policy applied to them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregates::ProductId;
use crate::services::auth::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", content = "id", rename_all = "camelCase")]
pub enum Route {
    Home,
    Products,
    ProductDetail(ProductId),
    Cart,
    Checkout,
    Login,
    AdminLogin,
    AdminDashboard,
    AdminReports,
}

impl Route {
    /// Unknown paths resolve to `Home`.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Home,
            ["products"] => Self::Products,
            ["products", id] => id.parse().map(Self::ProductDetail).unwrap_or(Self::Home),
            ["cart"] => Self::Cart,
            ["checkout"] => Self::Checkout,
            ["login"] => Self::Login,
            ["login", "admin"] => Self::AdminLogin,
            ["admin", "dashboard"] => Self::AdminDashboard,
            ["admin", "reports"] => Self::AdminReports,
            _ => Self::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::Products => "/products".into(),
            Self::ProductDetail(id) => format!("/products/{id}"),
            Self::Cart => "/cart".into(),
            Self::Checkout => "/checkout".into(),
            Self::Login => "/login".into(),
            Self::AdminLogin => "/login/admin".into(),
            Self::AdminDashboard => "/admin/dashboard".into(),
            Self::AdminReports => "/admin/reports".into(),
        }
    }

    pub fn requires_login(&self) -> bool { matches!(self, Self::Checkout) }
    pub fn requires_admin(&self) -> bool { matches!(self, Self::AdminDashboard | Self::AdminReports) }

    /// Whether a pending buy-now payload survives navigating here. Only the
    /// checkout itself and the login detour on the way to it keep it.
    pub fn keeps_direct_checkout(&self) -> bool { matches!(self, Self::Checkout | Self::Login) }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "access", content = "to", rename_all = "camelCase")]
pub enum Access {
    Allow,
    Redirect(Route),
}

pub fn guard(route: Route, user: Option<&User>) -> Access {
    if route.requires_login() && user.is_none() {
        return Access::Redirect(Route::Login);
    }
    if route.requires_admin() && !user.is_some_and(User::is_admin) {
        return Access::Redirect(Route::Home);
    }
    Access::Allow
}
