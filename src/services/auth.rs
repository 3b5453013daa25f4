//! Mocked authentication.
//!
//! There is no server round-trip: credentials are checked against fixed
//! values and the resulting user record is persisted under `user`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::storage::{keys, load_json, save_json, KeyValueStore, StorageError};

pub const CUSTOMER_PASSWORD: &str = "customer123";
pub const ADMIN_EMAIL: &str = "admin@blibeli.com";
pub const ADMIN_PASSWORD: &str = "admin123";

const ADMIN_ID: u64 = 1;
const CUSTOMER_ID: u64 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Contact fields a shopper may ask to remember from the checkout form.
#[derive(Clone, Debug, Default)]
pub struct SavedInfo<'a> {
    pub phone: &'a str,
    pub address: &'a str,
    pub city: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

impl User {
    /// Non-blank form values replace stored ones; blanks keep what was there.
    pub fn merged_with(&self, info: &SavedInfo<'_>) -> User {
        fn pick(new: &str, old: &Option<String>) -> Option<String> {
            let new = new.trim();
            if new.is_empty() { old.clone() } else { Some(new.to_string()) }
        }
        User {
            phone: pick(info.phone, &self.phone),
            address: pick(info.address, &self.address),
            city: pick(info.city, &self.city),
            postal_code: pick(info.postal_code, &self.postal_code),
            country: pick(info.country, &self.country),
            ..self.clone()
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email is required")]
    MissingEmail,

    #[error("The password you entered is incorrect.")]
    WrongPassword,

    #[error("Invalid admin credentials")]
    NotAdmin,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub struct AuthStore<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> AuthStore<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    pub fn current_user(&self) -> Result<Option<User>, StorageError> {
        load_json(self.store.as_ref(), keys::USER)
    }

    pub fn login(&self, email: &str, password: &str, role: Role) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }
        let user = match role {
            Role::Admin => {
                if email != ADMIN_EMAIL || password != ADMIN_PASSWORD {
                    tracing::warn!(email, "rejected admin login");
                    return Err(AuthError::NotAdmin);
                }
                User { id: ADMIN_ID, email: email.to_string(), name: "Admin User".into(), role, token: "mock-jwt-token-admin".into(), ..blank() }
            }
            Role::Customer => {
                if password != CUSTOMER_PASSWORD {
                    tracing::warn!(email, "rejected customer login");
                    return Err(AuthError::WrongPassword);
                }
                let name = email.split('@').next().unwrap_or(email).to_string();
                User { id: CUSTOMER_ID, email: email.to_string(), name, role, token: "mock-jwt-token-customer".into(), ..blank() }
            }
        };
        save_json(self.store.as_ref(), keys::USER, &user)?;
        tracing::info!(user_id = user.id, role = ?user.role, "logged in");
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), StorageError> {
        self.store.remove(keys::USER)?;
        tracing::info!("logged out");
        Ok(())
    }
}

fn blank() -> User {
    User {
        id: 0,
        email: String::new(),
        name: String::new(),
        role: Role::Customer,
        token: String::new(),
        phone: None,
        address: None,
        city: None,
        postal_code: None,
        country: None,
    }
}
