use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use super::{ui, CartPage, HomePage, Tab};
use crate::driver::{click_when_visible, fill_when_visible, Driver, WaitState, POLL_INTERVAL};
use crate::error::{E2eError, E2eResult};

/// Values typed into the order form. Empty fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub name: String,
    pub country: String,
    pub city: String,
    pub card: String,
    pub month: String,
    pub year: String,
}

impl PaymentDetails {
    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("name", &self.name),
            ("country", &self.country),
            ("city", &self.city),
            ("card", &self.card),
            ("month", &self.month),
            ("year", &self.year),
        ]
    }

    /// The storefront refuses to submit without these two.
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty() && !self.card.trim().is_empty()
    }
}

/// Result of pressing "Purchase".
pub enum PurchaseOutcome<'a, D: Driver + ?Sized> {
    Confirmed(ConfirmationPage<'a, D>),
    /// A native dialog refused the form, which stays open.
    Rejected {
        page: CheckoutPage<'a, D>,
        message: String,
    },
}

/// The "Place order" form.
pub struct CheckoutPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> CheckoutPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    async fn fill_form(&mut self, details: &PaymentDetails) -> E2eResult<()> {
        let timeouts = self.tab.timeouts;
        for (field, value) in details.fields() {
            if !value.is_empty() {
                fill_when_visible(&mut *self.tab.driver, &ui::order_field(field), value, timeouts.action()).await?;
            }
        }
        Ok(())
    }

    /// Fill the form and press "Purchase". Either the confirmation renders or
    /// a native dialog rejects the submission; whichever comes first decides.
    pub async fn complete_purchase(mut self, details: &PaymentDetails) -> E2eResult<PurchaseOutcome<'a, D>> {
        self.fill_form(details).await?;

        let timeouts = self.tab.timeouts;
        let driver = &mut *self.tab.driver;
        driver
            .wait_for(&ui::purchase(), WaitState::Visible, timeouts.action())
            .await?;
        driver.expect_dialog().await?;
        driver.click(&ui::purchase()).await?;

        let deadline = Instant::now() + timeouts.dialog().max(timeouts.action());
        loop {
            if let Some(dialog) = driver.poll_dialog().await? {
                warn!(dialog = %dialog.message, "order form rejected");
                return Ok(PurchaseOutcome::Rejected {
                    page: self,
                    message: dialog.message,
                });
            }
            if driver.is_visible(&ui::confirmation()).await? {
                driver.disarm_dialog().await?;
                info!("order confirmed");
                return Ok(PurchaseOutcome::Confirmed(ConfirmationPage::new(self.tab)));
            }
            if Instant::now() >= deadline {
                driver.disarm_dialog().await?;
                return Err(E2eError::timeout(
                    "order confirmation or validation dialog",
                    timeouts.dialog().max(timeouts.action()),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn is_open(&mut self) -> E2eResult<bool> {
        self.tab.driver.is_visible(&ui::order_dialog()).await
    }

    /// Dismiss the form without ordering.
    pub async fn close(self) -> E2eResult<CartPage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        click_when_visible(driver, &ui::close_order(), timeouts.action()).await?;
        driver
            .wait_for(&ui::order_dialog(), WaitState::Hidden, timeouts.action())
            .await?;
        Ok(CartPage::new(Tab::new(driver, timeouts)))
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Id|Amount|Card Number|Name|Date):").expect("static regex"));

/// Fields printed on the purchase confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub id: String,
    /// Amount without the currency suffix
    pub amount: String,
    pub card_number: String,
    pub name: String,
    pub date: String,
}

impl OrderConfirmation {
    /// Parse `Id: 1\nAmount: 790 USD\nCard Number: ..\nName: ..\nDate: ..`.
    /// Line breaks are optional; keys delimit the values.
    pub fn parse(text: &str) -> E2eResult<Self> {
        let marks: Vec<_> = FIELD_RE.find_iter(text).collect();
        let mut parsed = OrderConfirmation::default();
        let mut seen = 0;

        for (i, mark) in marks.iter().enumerate() {
            let end = marks.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
            let value = text[mark.end()..end].trim().to_string();
            match mark.as_str().trim_end_matches(':') {
                "Id" => parsed.id = value,
                "Amount" => parsed.amount = value.trim_end_matches("USD").trim().to_string(),
                "Card Number" => parsed.card_number = value,
                "Name" => parsed.name = value,
                "Date" => parsed.date = value,
                _ => continue,
            }
            seen += 1;
        }

        if seen < 5 {
            return Err(E2eError::assertion(format!(
                "confirmation is missing fields: '{}'",
                text.trim()
            )));
        }
        Ok(parsed)
    }

    pub fn has_numeric_id(&self) -> bool {
        !self.id.is_empty() && self.id.chars().all(|c| c.is_ascii_digit())
    }
}

/// The "Thank you for your purchase!" alert.
pub struct ConfirmationPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> ConfirmationPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    /// Full alert text, heading included.
    pub async fn text(&mut self) -> E2eResult<String> {
        let timeouts = self.tab.timeouts;
        self.tab
            .driver
            .wait_for(&ui::confirmation(), WaitState::Visible, timeouts.action())
            .await?;
        Ok(self.tab.driver.inner_text(&ui::confirmation()).await?.unwrap_or_default())
    }

    pub async fn details(&mut self) -> E2eResult<OrderConfirmation> {
        let timeouts = self.tab.timeouts;
        self.tab
            .driver
            .wait_for(&ui::confirmation_details(), WaitState::Visible, timeouts.action())
            .await?;
        let text = self
            .tab
            .driver
            .inner_text(&ui::confirmation_details())
            .await?
            .unwrap_or_default();
        OrderConfirmation::parse(&text)
    }

    /// Press OK and land back on `/index.html`.
    pub async fn close(self) -> E2eResult<HomePage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        click_when_visible(driver, &ui::confirmation_ok(), timeouts.action()).await?;
        driver
            .wait_for(&ui::confirmation(), WaitState::Hidden, timeouts.action())
            .await?;
        Tab::new(driver, timeouts).goto("/index.html").await
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}
