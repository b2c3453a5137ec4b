//! Page-object graph of the storefront
//!
//! Each page is a separate type that mutably borrows the driver. Every
//! transition consumes the current page and returns the one the browser
//! landed on, so a stale page can't be used after navigating away.
//!
//! ```text
//! Home --select_category--> Category --select_product--> Product
//!   ^                                                       |
//!   |                                                  add_to_cart
//! close                                                     v
//!   |                                                     Cart
//! Confirmation <--complete_purchase-- Checkout <--place_order-'
//! ```

mod cart;
mod catalog;
mod checkout;
mod home;
mod login;

pub use cart::{format_amount, CartLine, CartPage, CartSnapshot};
pub use catalog::{parse_price, CategoryPage, ProductDetails, ProductPage};
pub use checkout::{CheckoutPage, ConfirmationPage, OrderConfirmation, PaymentDetails, PurchaseOutcome};
pub use home::HomePage;
pub use login::{LoginPage, SIGN_UP_SUCCESS, USER_EXISTS};

use tracing::debug;

use crate::config::Timeouts;
use crate::driver::{click_when_visible, Driver, WaitState};
use crate::error::E2eResult;

/// Role/text contracts of the storefront UI.
pub(crate) mod ui {
    use crate::driver::{Locator, Role};

    pub fn nav_home() -> Locator {
        Locator::role(Role::Link, "Home")
    }

    pub fn nav_cart() -> Locator {
        Locator::role_exact(Role::Link, "Cart")
    }

    pub fn nav_log_in() -> Locator {
        Locator::role(Role::Link, "Log in")
    }

    pub fn nav_sign_up() -> Locator {
        Locator::role(Role::Link, "Sign up")
    }

    pub fn nav_log_out() -> Locator {
        Locator::role(Role::Link, "Log out")
    }

    pub fn logout_link() -> Locator {
        Locator::id("logout2")
    }

    pub fn welcome_user() -> Locator {
        Locator::id("nameofuser")
    }

    pub fn category(name: &str) -> Locator {
        Locator::role(Role::Link, name)
    }

    pub fn product_titles() -> Locator {
        Locator::class("card-title")
    }

    pub fn product_link(name: &str) -> Locator {
        product_titles().within(Locator::role(Role::Link, name)).first()
    }

    pub fn product_name() -> Locator {
        Locator::class("name")
    }

    pub fn product_price() -> Locator {
        Locator::class("price-container")
    }

    pub fn add_to_cart() -> Locator {
        Locator::role(Role::Link, "Add to cart")
    }

    pub fn cart_heading() -> Locator {
        Locator::role(Role::Heading, "Products")
    }

    pub fn cart_rows() -> Locator {
        Locator::id("tbodyid").within(Locator::any(Role::Row))
    }

    pub fn cart_total() -> Locator {
        Locator::id("totalp")
    }

    pub fn delete_first() -> Locator {
        Locator::role(Role::Link, "Delete").first()
    }

    pub fn place_order() -> Locator {
        Locator::role(Role::Button, "Place Order")
    }

    pub fn order_dialog() -> Locator {
        Locator::role(Role::Dialog, "Place order")
    }

    pub fn order_field(id: &str) -> Locator {
        Locator::id(id)
    }

    pub fn purchase() -> Locator {
        Locator::role(Role::Button, "Purchase")
    }

    pub fn close_order() -> Locator {
        order_dialog().within(Locator::role(Role::Button, "Close"))
    }

    pub fn confirmation() -> Locator {
        Locator::class("sweet-alert")
    }

    pub fn confirmation_details() -> Locator {
        confirmation().within(Locator::class("lead"))
    }

    pub fn confirmation_ok() -> Locator {
        Locator::role(Role::Button, "OK")
    }

    pub fn sign_up_username() -> Locator {
        Locator::role(Role::Textbox, "Username:")
    }

    pub fn sign_up_password() -> Locator {
        Locator::role(Role::Textbox, "Password:")
    }

    pub fn sign_up_submit() -> Locator {
        Locator::role(Role::Button, "Sign up")
    }

    pub fn log_in_username() -> Locator {
        Locator::id("loginusername")
    }

    pub fn log_in_password() -> Locator {
        Locator::id("loginpassword")
    }

    pub fn log_in_submit() -> Locator {
        Locator::role(Role::Button, "Log in")
    }
}

/// A driver plus the bounds every page waits with. The entry point of the
/// graph: the navbar is reachable from any page.
pub struct Tab<'a, D: Driver + ?Sized> {
    pub(crate) driver: &'a mut D,
    pub(crate) timeouts: Timeouts,
}

impl<'a, D: Driver + ?Sized> Tab<'a, D> {
    pub fn new(driver: &'a mut D, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Load the storefront root.
    pub async fn open_home(self) -> E2eResult<HomePage<'a, D>> {
        self.goto("/").await
    }

    /// Load `path` and wait for the navbar to be usable.
    pub async fn goto(self, path: &str) -> E2eResult<HomePage<'a, D>> {
        debug!(path, "navigating");
        self.driver.goto(path).await?;
        self.driver
            .wait_for(&ui::nav_home(), WaitState::Visible, self.timeouts.navigation())
            .await?;
        Ok(HomePage::new(self))
    }

    /// Follow the navbar "Cart" link.
    pub async fn open_cart(self) -> E2eResult<CartPage<'a, D>> {
        click_when_visible(self.driver, &ui::nav_cart(), self.timeouts.action()).await?;
        self.driver
            .wait_for(&ui::cart_heading(), WaitState::Visible, self.timeouts.navigation())
            .await?;
        Ok(CartPage::new(self))
    }

    /// The login/sign-up modals live in the navbar; no navigation happens.
    pub fn open_login(self) -> LoginPage<'a, D> {
        LoginPage::new(self)
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    pub async fn is_logged_in(&mut self) -> E2eResult<bool> {
        self.driver.is_visible(&ui::welcome_user()).await
    }

    /// Wait for the welcome label of an authenticated navbar.
    pub async fn expect_logged_in(&mut self) -> E2eResult<()> {
        self.driver
            .wait_for(&ui::welcome_user(), WaitState::Visible, self.timeouts.navigation())
            .await
    }
}

/// The page a transition landed on.
pub enum PageState<'a, D: Driver + ?Sized> {
    Home(HomePage<'a, D>),
    Category(CategoryPage<'a, D>),
    Product(ProductPage<'a, D>),
    Cart(CartPage<'a, D>),
    Checkout(CheckoutPage<'a, D>),
    Confirmation(ConfirmationPage<'a, D>),
    Login(LoginPage<'a, D>),
}

impl<'a, D: Driver + ?Sized> PageState<'a, D> {
    pub fn name(&self) -> &'static str {
        match self {
            PageState::Home(_) => "home",
            PageState::Category(_) => "category",
            PageState::Product(_) => "product",
            PageState::Cart(_) => "cart",
            PageState::Checkout(_) => "checkout",
            PageState::Confirmation(_) => "confirmation",
            PageState::Login(_) => "login",
        }
    }

    /// Drop the page and keep only the tab.
    pub fn into_tab(self) -> Tab<'a, D> {
        match self {
            PageState::Home(p) => p.into_tab(),
            PageState::Category(p) => p.into_tab(),
            PageState::Product(p) => p.into_tab(),
            PageState::Cart(p) => p.into_tab(),
            PageState::Checkout(p) => p.into_tab(),
            PageState::Confirmation(p) => p.into_tab(),
            PageState::Login(p) => p.into_tab(),
        }
    }
}

macro_rules! page_state_from {
    ($($variant:ident => $page:ident),* $(,)?) => {
        $(
            impl<'a, D: Driver + ?Sized> From<$page<'a, D>> for PageState<'a, D> {
                fn from(page: $page<'a, D>) -> Self {
                    PageState::$variant(page)
                }
            }
        )*
    };
}

page_state_from!(
    Home => HomePage,
    Category => CategoryPage,
    Product => ProductPage,
    Cart => CartPage,
    Checkout => CheckoutPage,
    Confirmation => ConfirmationPage,
    Login => LoginPage,
);

/// Owns a driver between scenario steps. Each step borrows a fresh [`Tab`].
pub struct Storefront<D> {
    driver: D,
    timeouts: Timeouts,
    date_format: String,
}

impl<D: Driver> Storefront<D> {
    pub fn new(driver: D, timeouts: Timeouts, date_format: impl Into<String>) -> Self {
        Self {
            driver,
            timeouts,
            date_format: date_format.into(),
        }
    }

    pub fn tab(&mut self) -> Tab<'_, D> {
        Tab::new(&mut self.driver, self.timeouts)
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// strftime pattern of confirmation dates.
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}
