//! Fixture records for the storefront and user-API scenarios

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::api::{NewUser, UserPatch};
use crate::pages::PaymentDetails;
use crate::session::Credentials;

/// A product to buy, addressed by the labels the UI shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub category: &'static str,
    pub name: &'static str,
}

pub const PRODUCTS: &[ProductRef] = &[
    ProductRef {
        category: "Laptops",
        name: "Sony vaio i5",
    },
    ProductRef {
        category: "Phones",
        name: "Samsung galaxy s6",
    },
    ProductRef {
        category: "Monitors",
        name: "Apple monitor 24",
    },
];

pub fn primary_product() -> &'static ProductRef {
    &PRODUCTS[0]
}

pub fn valid_payment() -> PaymentDetails {
    PaymentDetails {
        name: "John Doe".into(),
        country: "Poland".into(),
        city: "Warsaw".into(),
        card: "4111111111111111".into(),
        month: "10".into(),
        year: "2026".into(),
    }
}

/// Non-empty but malformed values the form layer accepts anyway.
pub fn malformed_payment() -> PaymentDetails {
    PaymentDetails {
        name: "323232".into(),
        card: "abggghhhhh".into(),
        ..Default::default()
    }
}

pub fn empty_payment() -> PaymentDetails {
    PaymentDetails::default()
}

/// Account that already exists on the storefront.
pub fn existing_credentials() -> Credentials {
    Credentials::new("testing123", "testing123")
}

/// E-mail already owned by another user resource.
pub const EXISTING_EMAIL: &str = "abc@abc.com";

/// Id no `create` ever issues.
pub const MISSING_USER_ID: u64 = 999_999;

/// `john.doe<millis><random>@gmail.com`
pub fn unique_email(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{prefix}{}{suffix}@gmail.com", Utc::now().timestamp_millis())
}

pub fn valid_user(email: impl Into<String>) -> NewUser {
    NewUser {
        name: "John Doe".into(),
        email: email.into(),
        gender: "male".into(),
        status: "active".into(),
    }
}

/// Gender outside `{male, female}` and a malformed e-mail.
pub fn invalid_user() -> NewUser {
    NewUser {
        name: "Invalid User".into(),
        email: "invalid-email".into(),
        gender: "other".into(),
        status: "inactive".into(),
    }
}

pub fn invalid_email_user() -> NewUser {
    NewUser {
        name: "Invalid User".into(),
        email: "abc@aaan@.com".into(),
        gender: "male".into(),
        status: "active".into(),
    }
}

/// Only the e-mail filled in.
pub fn blank_fields_user(email: impl Into<String>) -> NewUser {
    NewUser {
        name: String::new(),
        email: email.into(),
        gender: String::new(),
        status: String::new(),
    }
}

pub fn rename_patch(email: impl Into<String>) -> UserPatch {
    UserPatch {
        name: Some("John Updated".into()),
        email: Some(email.into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::is_valid_email;

    #[test]
    fn unique_emails_are_valid_and_distinct() {
        let a = unique_email("john.doe");
        let b = unique_email("john.doe");
        assert!(is_valid_email(&a), "{a}");
        assert_ne!(a, b);
        assert!(a.starts_with("john.doe"));
    }

    #[test]
    fn malformed_payment_still_has_required_fields() {
        assert!(malformed_payment().has_required_fields());
        assert!(!empty_payment().has_required_fields());
    }
}
