use std::time::Instant;
use tracing::{debug, info};

use super::{ui, CheckoutPage, Tab};
use crate::driver::{click_when_visible, expect_count, expect_text, Driver, WaitState, POLL_INTERVAL};
use crate::error::{E2eError, E2eResult};

/// One product in the cart. The storefront renders one row per unit, so
/// rows with the same name and price collapse into a line with a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> u64 {
        self.unit_price * u64::from(self.quantity)
    }

    /// Parse a rendered row: `"<img>\tTitle\t790\tDelete"`.
    pub fn parse_row(row: &str) -> E2eResult<(String, u64)> {
        let cells: Vec<&str> = row
            .split('\t')
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "Delete")
            .collect();
        match cells.as_slice() {
            [name, price] => price
                .parse()
                .map(|price| (name.to_string(), price))
                .map_err(|_| E2eError::assertion(format!("cart row price '{price}' is not a whole amount"))),
            _ => Err(E2eError::assertion(format!("unexpected cart row '{}'", row.trim()))),
        }
    }

    /// Collapse per-unit rows into lines, keeping first-seen order.
    pub fn group(rows: impl IntoIterator<Item = (String, u64)>) -> Vec<CartLine> {
        let mut lines: Vec<CartLine> = Vec::new();
        for (name, unit_price) in rows {
            match lines
                .iter_mut()
                .find(|l| l.name == name && l.unit_price == unit_price)
            {
                Some(line) => line.quantity += 1,
                None => lines.push(CartLine {
                    name,
                    unit_price,
                    quantity: 1,
                }),
            }
        }
        lines
    }
}

/// The string the storefront shows for a whole amount.
pub fn format_amount(amount: u64) -> String {
    amount.to_string()
}

/// What the cart page showed at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub rows: usize,
    pub lines: Vec<CartLine>,
    /// `None` while the total element is hidden
    pub total: Option<String>,
}

impl CartSnapshot {
    /// `sum(unit_price * quantity)`, formatted like the page.
    pub fn expected_total(&self) -> String {
        format_amount(self.lines.iter().map(CartLine::subtotal).sum())
    }

    /// The displayed total must equal the sum of the lines, as a string.
    pub fn check_total(&self) -> E2eResult<()> {
        match (&self.total, self.rows) {
            (None, 0) => Ok(()),
            (Some(shown), rows) if rows > 0 => {
                let expected = self.expected_total();
                if *shown == expected {
                    Ok(())
                } else {
                    Err(E2eError::assertion(format!(
                        "cart shows total '{shown}' but lines sum to '{expected}'"
                    )))
                }
            }
            (shown, rows) => Err(E2eError::assertion(format!(
                "cart has {rows} row(s) but total is {shown:?}"
            ))),
        }
    }
}

pub struct CartPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> CartPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    /// Wait until at least `min` rows are rendered.
    pub async fn wait_for_rows(&mut self, min: usize) -> E2eResult<()> {
        if min == 0 {
            return Ok(());
        }
        let timeouts = self.tab.timeouts;
        let deadline = Instant::now() + timeouts.assertion();
        loop {
            let rows = self.tab.driver.count(&ui::cart_rows()).await?;
            if rows >= min {
                self.tab
                    .driver
                    .wait_for(&ui::cart_rows().first(), WaitState::Visible, timeouts.action())
                    .await?;
                self.tab
                    .driver
                    .wait_for(&ui::cart_total(), WaitState::Visible, timeouts.action())
                    .await?;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(E2eError::timeout(
                    format!("cart to list {min} row(s), saw {rows}"),
                    timeouts.assertion(),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Rows and total as currently rendered.
    pub async fn snapshot(&mut self) -> E2eResult<CartSnapshot> {
        let driver = &mut *self.tab.driver;
        let texts = driver.all_inner_texts(&ui::cart_rows()).await?;
        let rows = texts
            .iter()
            .map(|row| CartLine::parse_row(row))
            .collect::<E2eResult<Vec<_>>>()?;

        let total = if driver.is_visible(&ui::cart_total()).await? {
            driver
                .inner_text(&ui::cart_total())
                .await?
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        } else {
            None
        };

        Ok(CartSnapshot {
            rows: texts.len(),
            lines: CartLine::group(rows),
            total,
        })
    }

    /// Assert exactly `expected_rows` rows and a total rendered as `expected_total`.
    pub async fn validate(&mut self, expected_rows: usize, expected_total: &str) -> E2eResult<CartSnapshot> {
        let timeouts = self.tab.timeouts;
        let driver = &mut *self.tab.driver;

        driver
            .wait_for(&ui::cart_rows(), WaitState::Attached, timeouts.action())
            .await?;
        driver
            .wait_for(&ui::cart_rows().first(), WaitState::Visible, timeouts.action())
            .await?;
        expect_count(driver, &ui::cart_rows(), expected_rows, timeouts.assertion()).await?;
        driver
            .wait_for(&ui::cart_total(), WaitState::Visible, timeouts.action())
            .await?;
        expect_text(driver, &ui::cart_total(), expected_total, timeouts.assertion()).await?;

        let snapshot = self.snapshot().await?;
        snapshot.check_total()?;
        info!(rows = snapshot.rows, total = ?snapshot.total, "cart validated");
        Ok(snapshot)
    }

    /// Assert no rows and a hidden total.
    pub async fn expect_empty(&mut self) -> E2eResult<()> {
        let timeouts = self.tab.timeouts;
        let driver = &mut *self.tab.driver;
        expect_count(driver, &ui::cart_rows(), 0, timeouts.assertion()).await?;
        driver
            .wait_for(&ui::cart_total(), WaitState::Hidden, timeouts.assertion())
            .await
    }

    /// Delete the first row and return the re-rendered total, `None` once the
    /// cart is empty.
    pub async fn remove_first(&mut self) -> E2eResult<Option<String>> {
        let timeouts = self.tab.timeouts;
        let driver = &mut *self.tab.driver;

        driver
            .wait_for(&ui::cart_rows().first(), WaitState::Visible, timeouts.action())
            .await?;
        driver
            .wait_for(&ui::cart_total(), WaitState::Attached, timeouts.action())
            .await?;
        driver
            .wait_for(&ui::cart_total(), WaitState::Visible, timeouts.action())
            .await?;

        let before = driver.count(&ui::cart_rows()).await?;
        let remaining = before
            .checked_sub(1)
            .ok_or_else(|| E2eError::assertion("cart emptied before a row could be deleted"))?;
        click_when_visible(driver, &ui::delete_first(), timeouts.action()).await?;
        expect_count(driver, &ui::cart_rows(), remaining, timeouts.assertion()).await?;
        tokio::time::sleep(timeouts.settle()).await;

        let total = if driver.is_visible(&ui::cart_total()).await? {
            driver.inner_text(&ui::cart_total()).await?.map(|t| t.trim().to_string())
        } else {
            None
        };
        debug!(rows = remaining, ?total, "cart row removed");
        Ok(total)
    }

    /// Open the order form.
    pub async fn place_order(self) -> E2eResult<CheckoutPage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        click_when_visible(driver, &ui::place_order(), timeouts.action()).await?;
        driver
            .wait_for(&ui::order_dialog(), WaitState::Visible, timeouts.action())
            .await?;
        driver
            .wait_for(&ui::order_field("name"), WaitState::Visible, timeouts.action())
            .await?;
        Ok(CheckoutPage::new(Tab::new(driver, timeouts)))
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        self.tab.current_url().await
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_parsing_ignores_image_and_delete_cells() {
        let (name, price) = CartLine::parse_row("\tSony vaio i5\t790\tDelete").unwrap();
        assert_eq!(name, "Sony vaio i5");
        assert_eq!(price, 790);
        assert!(CartLine::parse_row("\tDelete").is_err());
    }

    #[test]
    fn repeated_rows_collapse_into_quantity() {
        let lines = CartLine::group(vec![
            ("Sony vaio i5".to_string(), 790),
            ("MacBook air".to_string(), 700),
            ("Sony vaio i5".to_string(), 790),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].subtotal(), 1580);
    }

    #[test]
    fn total_must_match_line_sum_as_string() {
        let lines = CartLine::group(vec![("Sony vaio i5".to_string(), 790); 2]);
        let good = CartSnapshot {
            rows: 2,
            lines: lines.clone(),
            total: Some("1580".into()),
        };
        assert!(good.check_total().is_ok());

        let formatted_differently = CartSnapshot {
            total: Some("1580.00".into()),
            ..good.clone()
        };
        assert!(formatted_differently.check_total().is_err());

        let empty = CartSnapshot {
            rows: 0,
            lines: vec![],
            total: None,
        };
        assert!(empty.check_total().is_ok());
    }
}
