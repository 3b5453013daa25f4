//! Checkout form and its validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::aggregates::{Customer, PaymentMethod};
use crate::services::auth::{SavedInfo, User};

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));
static CARD_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{16}$").expect("static regex"));
static CARD_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}$").expect("static regex"));
static CARD_CVC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,4}$").expect("static regex"));

pub const DEFAULT_COUNTRY: &str = "Indonesia";

fn default_country() -> String { DEFAULT_COUNTRY.to_string() }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(custom = "required")]
    pub full_name: String,
    #[validate(custom = "email_shape")]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(custom = "required")]
    pub address: String,
    #[validate(custom = "required")]
    pub city: String,
    #[validate(custom = "required")]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Only read when paying by credit card.
    #[serde(flatten)]
    pub card: CardDetails,
    #[serde(default)]
    pub save_info: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CardDetails {
    #[serde(default, rename = "cardNumber")]
    #[validate(custom = "card_number")]
    pub number: String,
    #[serde(default, rename = "cardExpiry")]
    #[validate(custom = "card_expiry")]
    pub expiry: String,
    #[serde(default, rename = "cardCVC")]
    #[validate(custom = "card_cvc")]
    pub cvc: String,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: default_country(),
            payment_method: PaymentMethod::CreditCard,
            card: CardDetails::default(),
            save_info: false,
        }
    }
}

impl CheckoutForm {
    /// Starting values for a signed-in shopper.
    pub fn prefilled(user: &User) -> Self {
        Self {
            full_name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
            city: user.city.clone().unwrap_or_default(),
            postal_code: user.postal_code.clone().unwrap_or_default(),
            country: user.country.clone().unwrap_or_else(default_country),
            ..Self::default()
        }
    }

    /// Field-level errors; empty means the form may be submitted.
    pub fn errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if let Err(found) = self.validate() {
            errors.absorb(&found);
        }
        if self.payment_method == PaymentMethod::CreditCard {
            if let Err(found) = self.card.validate() {
                errors.absorb(&found);
            }
        }
        errors
    }

    pub fn customer(&self, user_id: Option<u64>) -> Customer {
        Customer {
            user_id,
            name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }

    pub fn saved_info(&self) -> SavedInfo<'_> {
        SavedInfo { phone: &self.phone, address: &self.address, city: &self.city, postal_code: &self.postal_code, country: &self.country }
    }
}

/// Form field name (as submitted) to message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn get(&self, field: &str) -> Option<&'static str> { self.0.get(field).copied() }
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ { self.0.keys().copied() }

    fn absorb(&mut self, found: &ValidationErrors) {
        for (field, list) in found.field_errors() {
            if let Some(first) = list.first() {
                let (name, message) = describe(field, &first.code);
                self.0.insert(name, message);
            }
        }
    }
}

fn describe(field: &'static str, code: &str) -> (&'static str, &'static str) {
    match (field, code) {
        ("full_name", _) => ("fullName", "Full name is required"),
        ("email", "required") => ("email", "Email is required"),
        ("email", _) => ("email", "Email is invalid"),
        ("address", _) => ("address", "Address is required"),
        ("city", _) => ("city", "City is required"),
        ("postal_code", _) => ("postalCode", "Postal code is required"),
        // Card fields are reported under their serde names.
        ("cardNumber", _) => ("cardNumber", "Card number must be 16 digits"),
        ("cardExpiry", _) => ("cardExpiry", "Format: MM/YY"),
        ("cardCVC", _) => ("cardCVC", "CVC must be 3-4 digits"),
        (other, _) => (other, "Invalid value"),
    }
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::new("required")) } else { Ok(()) }
}

fn email_shape(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    if EMAIL_SHAPE.is_match(value.trim()) { Ok(()) } else { Err(ValidationError::new("email")) }
}

fn card_number(value: &str) -> Result<(), ValidationError> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if CARD_NUMBER.is_match(&digits) { Ok(()) } else { Err(ValidationError::new("card_number")) }
}

fn card_expiry(value: &str) -> Result<(), ValidationError> {
    if CARD_EXPIRY.is_match(value.trim()) { Ok(()) } else { Err(ValidationError::new("card_expiry")) }
}

fn card_cvc(value: &str) -> Result<(), ValidationError> {
    if CARD_CVC.is_match(value.trim()) { Ok(()) } else { Err(ValidationError::new("card_cvc")) }
}

#[cfg(test)]
pub(crate) fn valid_form() -> CheckoutForm {
    CheckoutForm {
        full_name: "Jane Doe".into(),
        email: "jane@example.com".into(),
        phone: "0812".into(),
        address: "1 Main St".into(),
        city: "Jakarta".into(),
        postal_code: "10110".into(),
        card: CardDetails { number: "4242 4242 4242 4242".into(), expiry: "12/29".into(), cvc: "123".into() },
        ..CheckoutForm::default()
    }
}
