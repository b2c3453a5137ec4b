//! Field validation rules of the user resource
//!
//! The remote system reports violations in a fixed field order: name, gender,
//! status, email. [`expected_violations`] computes the list a compliant server
//! must return for a payload, so negative scenarios can assert on the exact
//! `[{field, message}]` body instead of "some error happened".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::NewUser;

pub const CANT_BE_BLANK: &str = "can't be blank";
pub const GENDER_INVALID: &str = "can't be blank, can be male of female";
pub const EMAIL_INVALID: &str = "is invalid";
pub const EMAIL_TAKEN: &str = "has already been taken";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("static regex"));

/// One entry of a 422 response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Violations the user resource reports for `payload`, in reporting order.
///
/// Gender is an enumeration and is matched as sent; padding makes it
/// invalid. `is_taken` answers whether another resource already owns an
/// e-mail. A duplicate only counts for syntactically valid addresses, so
/// "has already been taken" replaces "is invalid" rather than joining it.
pub fn expected_violations(payload: &NewUser, is_taken: impl Fn(&str) -> bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if payload.name.trim().is_empty() {
        errors.push(FieldError::new("name", CANT_BE_BLANK));
    }
    if Gender::parse(&payload.gender).is_none() {
        errors.push(FieldError::new("gender", GENDER_INVALID));
    }
    if payload.status.trim().is_empty() {
        errors.push(FieldError::new("status", CANT_BE_BLANK));
    }

    let email = payload.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", CANT_BE_BLANK));
    } else if !is_valid_email(email) {
        errors.push(FieldError::new("email", EMAIL_INVALID));
    } else if is_taken(email) {
        errors.push(FieldError::new("email", EMAIL_TAKEN));
    }

    errors
}
