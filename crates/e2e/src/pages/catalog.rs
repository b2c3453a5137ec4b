use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::{ui, CartPage, Tab};
use crate::driver::{click_expecting_dialog, Driver, WaitState};
use crate::error::{E2eError, E2eResult};

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

/// First run of digits in a displayed price, `"$790 *includes tax"` → `"790"`.
pub fn parse_price(text: &str) -> Option<String> {
    PRICE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Product listing of one category.
pub struct CategoryPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
    category: String,
}

impl<'a, D: Driver + ?Sized> CategoryPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>, category: &str) -> Self {
        Self {
            tab,
            category: category.to_string(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Titles currently listed.
    pub async fn product_titles(&mut self) -> E2eResult<Vec<String>> {
        let titles = self.tab.driver.all_inner_texts(&ui::product_titles()).await?;
        Ok(titles.into_iter().map(|t| t.trim().to_string()).collect())
    }

    /// Open the product titled `name`; `NotFound` when the listing has no
    /// such title.
    pub async fn select_product(mut self, name: &str) -> E2eResult<ProductPage<'a, D>> {
        let timeouts = self.tab.timeouts;
        self.tab
            .driver
            .wait_for(&ui::product_titles().first(), WaitState::Visible, timeouts.action())
            .await?;

        let link = ui::product_link(name);
        if let Err(err) = self.tab.driver.wait_for(&link, WaitState::Visible, timeouts.action()).await {
            return match err {
                E2eError::NavigationTimeout { .. } => {
                    let listed = self.product_titles().await?;
                    Err(E2eError::NotFound(format!(
                        "product '{}' in category '{}' (listed: {})",
                        name,
                        self.category,
                        listed.join(", ")
                    )))
                }
                other => Err(other),
            };
        }

        self.tab.driver.click(&link).await?;
        self.tab
            .driver
            .wait_for(&ui::add_to_cart(), WaitState::Visible, timeouts.navigation())
            .await?;
        info!(product = name, "product opened");
        Ok(ProductPage::new(self.tab))
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}

/// Name and price as shown on the product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetails {
    pub name: String,
    /// Digits only, formatted as the cart displays it
    pub price: String,
}

impl ProductDetails {
    pub fn unit_price(&self) -> E2eResult<u64> {
        self.price
            .parse()
            .map_err(|_| E2eError::assertion(format!("price '{}' is not a whole amount", self.price)))
    }
}

pub struct ProductPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> ProductPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    pub async fn details(&mut self) -> E2eResult<ProductDetails> {
        let timeouts = self.tab.timeouts;
        let driver = &mut *self.tab.driver;

        driver.wait_for(&ui::product_name(), WaitState::Visible, timeouts.action()).await?;
        let name = driver
            .inner_text(&ui::product_name())
            .await?
            .unwrap_or_default()
            .trim()
            .to_string();

        let price_text = driver.inner_text(&ui::product_price()).await?.unwrap_or_default();
        let price = parse_price(&price_text)
            .ok_or_else(|| E2eError::assertion(format!("no price in '{}'", price_text.trim())))?;

        Ok(ProductDetails { name, price })
    }

    /// Press "Add to cart" exactly `quantity` times, acknowledging each
    /// confirmation, then open the cart once it lists at least that many rows.
    pub async fn add_to_cart(self, quantity: usize) -> E2eResult<CartPage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;

        for n in 1..=quantity {
            let dialog =
                click_expecting_dialog(driver, &ui::add_to_cart(), timeouts.action(), timeouts.dialog())
                    .await?;
            if !dialog.message.contains("Product added") {
                return Err(E2eError::assertion(format!(
                    "adding item {n}/{quantity} showed '{}'",
                    dialog.message
                )));
            }
            debug!(n, quantity, "item added");
        }

        let mut cart = Tab::new(driver, timeouts).open_cart().await?;
        cart.wait_for_rows(quantity).await?;
        Ok(cart)
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}
