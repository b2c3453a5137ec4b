use tracing::info;

use super::{ui, CategoryPage, Tab};
use crate::driver::{click_when_visible, Driver};
use crate::error::E2eResult;

/// Storefront landing page with the category sidebar.
pub struct HomePage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> HomePage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    /// Show the listing of `category`.
    pub async fn select_category(self, category: &str) -> E2eResult<CategoryPage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        click_when_visible(driver, &ui::category(category), timeouts.action()).await?;
        info!(category, "category selected");
        Ok(CategoryPage::new(Tab::new(driver, timeouts), category))
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        self.tab.current_url().await
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}
