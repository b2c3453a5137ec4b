//! Cart and checkout workflow
//!
//! Composes page transitions into the purchase journey and checks the cart
//! and confirmation invariants between them.

use chrono::Local;
use tracing::info;

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::ProductRef;
use crate::pages::{
    format_amount, CartPage, CartSnapshot, CheckoutPage, HomePage, OrderConfirmation, PaymentDetails,
    ProductDetails, PurchaseOutcome, Tab,
};

/// Dialog raised when name or card number is empty at submission.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill out Name and Creditcard.";

pub struct CheckoutSequencer {
    today: String,
}

impl CheckoutSequencer {
    /// Expect confirmations dated `today`, already rendered.
    pub fn for_date(today: impl Into<String>) -> Self {
        Self { today: today.into() }
    }

    /// Expect confirmations dated with the local date in `format` (strftime).
    pub fn today(format: &str) -> Self {
        Self::for_date(Local::now().format(format).to_string())
    }

    pub fn expected_date(&self) -> &str {
        &self.today
    }

    /// Home, category, product, then "Add to cart" `quantity` times.
    pub async fn add_items<'a, D: Driver + ?Sized>(
        &self,
        tab: Tab<'a, D>,
        product: &ProductRef,
        quantity: usize,
    ) -> E2eResult<(CartPage<'a, D>, ProductDetails)> {
        let category = tab.open_home().await?.select_category(product.category).await?;
        let mut page = category.select_product(product.name).await?;
        let details = page.details().await?;
        if details.name != product.name {
            return Err(E2eError::assertion(format!(
                "opened '{}' but product page shows '{}'",
                product.name, details.name
            )));
        }
        let cart = page.add_to_cart(quantity).await?;
        info!(product = product.name, quantity, price = %details.price, "items added");
        Ok((cart, details))
    }

    /// Exactly `rows` rows summing to `total`, shown as the storefront formats it.
    pub async fn verify_cart<D: Driver + ?Sized>(
        &self,
        cart: &mut CartPage<'_, D>,
        rows: usize,
        total: u64,
    ) -> E2eResult<CartSnapshot> {
        cart.validate(rows, &format_amount(total)).await
    }

    /// Delete one row. The row count drops by exactly one and the new total
    /// is non-negative and consistent with the remaining lines.
    pub async fn remove_one<D: Driver + ?Sized>(&self, cart: &mut CartPage<'_, D>) -> E2eResult<CartSnapshot> {
        cart.wait_for_rows(1).await?;
        let before = cart.snapshot().await?;
        if before.rows == 0 {
            return Err(E2eError::assertion("cannot remove from an empty cart"));
        }

        let shown = cart.remove_first().await?;
        let after = cart.snapshot().await?;
        if after.rows + 1 != before.rows {
            return Err(E2eError::assertion(format!(
                "removing one row went from {} to {} row(s)",
                before.rows, after.rows
            )));
        }

        if after.rows == 0 {
            cart.expect_empty().await?;
            return Ok(after);
        }

        match shown.as_deref().map(str::parse::<i64>) {
            Some(Ok(total)) if total >= 0 => {}
            other => {
                return Err(E2eError::assertion(format!(
                    "total after removal is {shown:?} ({other:?})"
                )))
            }
        }
        after.check_total()?;
        info!(rows = after.rows, total = ?after.total, "cart row removed");
        Ok(after)
    }

    /// Place the order, submit `details` and check the confirmation against
    /// what was submitted, then close it and return home.
    pub async fn purchase<'a, D: Driver + ?Sized>(
        &self,
        cart: CartPage<'a, D>,
        details: &PaymentDetails,
        expected_amount: Option<&str>,
    ) -> E2eResult<(HomePage<'a, D>, OrderConfirmation)> {
        let checkout = cart.place_order().await?;
        match checkout.complete_purchase(details).await? {
            PurchaseOutcome::Confirmed(mut page) => {
                let confirmation = page.details().await?;
                self.verify_confirmation(&confirmation, details, expected_amount)?;
                let mut home = page.close().await?;
                let url = home.current_url().await?;
                if !url.contains("index.html") {
                    return Err(E2eError::assertion(format!(
                        "closing the confirmation landed on '{url}'"
                    )));
                }
                info!(id = %confirmation.id, amount = %confirmation.amount, "purchase confirmed");
                Ok((home, confirmation))
            }
            PurchaseOutcome::Rejected { message, .. } => Err(E2eError::assertion(format!(
                "purchase was rejected with '{message}'"
            ))),
        }
    }

    /// Submit a form missing a required field. The validation dialog must
    /// appear, the form must stay open and the cart must be unchanged.
    pub async fn reject_incomplete<'a, D: Driver + ?Sized>(
        &self,
        mut cart: CartPage<'a, D>,
        details: &PaymentDetails,
    ) -> E2eResult<CartPage<'a, D>> {
        let before = cart.snapshot().await?;
        let checkout = cart.place_order().await?;

        let mut form: CheckoutPage<'a, D> = match checkout.complete_purchase(details).await? {
            PurchaseOutcome::Rejected { page, message } => {
                if !message.contains(REQUIRED_FIELDS_MESSAGE) {
                    return Err(E2eError::assertion(format!(
                        "expected '{REQUIRED_FIELDS_MESSAGE}', dialog said '{message}'"
                    )));
                }
                page
            }
            PurchaseOutcome::Confirmed(_) => {
                return Err(E2eError::assertion("incomplete payment details were confirmed"));
            }
        };

        if !form.is_open().await? {
            return Err(E2eError::assertion("order form closed after a rejected submission"));
        }

        let mut cart = form.close().await?;
        let after = cart.snapshot().await?;
        if after != before {
            return Err(E2eError::assertion(format!(
                "rejected submission changed the cart: {before:?} -> {after:?}"
            )));
        }
        Ok(cart)
    }

    /// Card number, name and date must echo the submission, and the amount
    /// too when one is expected; the id must be numeric.
    pub fn verify_confirmation(
        &self,
        confirmation: &OrderConfirmation,
        details: &PaymentDetails,
        expected_amount: Option<&str>,
    ) -> E2eResult<()> {
        let checks = [
            ("Amount", confirmation.amount.as_str(), expected_amount),
            ("Card Number", confirmation.card_number.as_str(), Some(details.card.as_str())),
            ("Name", confirmation.name.as_str(), Some(details.name.as_str())),
            ("Date", confirmation.date.as_str(), Some(self.today.as_str())),
        ];
        let mismatches: Vec<String> = checks
            .iter()
            .filter_map(|(field, shown, expected)| expected.map(|expected| (field, shown, expected)))
            .filter(|(_, shown, expected)| **shown != *expected)
            .map(|(field, shown, expected)| format!("{field}: expected '{expected}', shown '{shown}'"))
            .collect();
        if !mismatches.is_empty() {
            return Err(E2eError::assertion(format!(
                "confirmation mismatch ({})",
                mismatches.join("; ")
            )));
        }
        if !confirmation.has_numeric_id() {
            return Err(E2eError::assertion(format!(
                "order id '{}' is not numeric",
                confirmation.id
            )));
        }
        Ok(())
    }
}
