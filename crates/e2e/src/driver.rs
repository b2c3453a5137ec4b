//! Locator/action adapter
//!
//! The narrow surface the page objects need from a browser: find elements by
//! accessible role and visible text, act on them, and observe native dialogs.
//! Implementations must bound every call by the timeout they are given.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::session::Cookie;

/// Polling interval of the auto-waiting expectations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Accessible roles the storefront pages are located by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Link,
    Button,
    Textbox,
    Dialog,
    Heading,
    Row,
}

/// How to find an element. Role and text first; `Id` only for stable element
/// ids, never structural paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    Role {
        role: Role,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },
    Text {
        text: String,
    },
    Id {
        id: String,
    },
    Class {
        class: String,
    },
    Within {
        scope: Box<Locator>,
        inner: Box<Locator>,
    },
    Nth {
        base: Box<Locator>,
        index: usize,
    },
}

impl Locator {
    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: Some(name.into()),
            exact: false,
        }
    }

    pub fn role_exact(role: Role, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: Some(name.into()),
            exact: true,
        }
    }

    pub fn any(role: Role) -> Self {
        Locator::Role {
            role,
            name: None,
            exact: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text { text: text.into() }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id { id: id.into() }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Locator::Class { class: class.into() }
    }

    /// Restrict `inner` to descendants of `self`.
    pub fn within(self, inner: Locator) -> Self {
        Locator::Within {
            scope: Box::new(self),
            inner: Box::new(inner),
        }
    }

    pub fn nth(self, index: usize) -> Self {
        Locator::Nth {
            base: Box::new(self),
            index,
        }
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Short human label used in logs and timeout errors.
    pub fn describe(&self) -> String {
        match self {
            Locator::Role { role, name: Some(name), .. } => format!("{role:?} '{name}'"),
            Locator::Role { role, name: None, .. } => format!("{role:?}"),
            Locator::Text { text } => format!("text '{text}'"),
            Locator::Id { id } => format!("#{id}"),
            Locator::Class { class } => format!(".{class}"),
            Locator::Within { scope, inner } => format!("{} in {}", inner.describe(), scope.describe()),
            Locator::Nth { base, index } => format!("{}[{index}]", base.describe()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// A native dialog that was observed and acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub message: String,
}

/// Browser primitives consumed by the page objects.
///
/// Dialogs follow an explicit protocol: [`Driver::expect_dialog`] arms the next
/// interruption before the triggering click, and [`Driver::resolve_dialog`]
/// blocks until that dialog was observed and accepted. Dialogs that arrive
/// while nothing is armed are accepted and logged as unexpected.
#[async_trait]
pub trait Driver: Send {
    /// Navigate to a path relative to the storefront origin.
    async fn goto(&mut self, path: &str) -> E2eResult<()>;

    async fn reload(&mut self) -> E2eResult<()>;

    async fn go_back(&mut self) -> E2eResult<()>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Wait until `target` reaches `state`, failing with a timeout past the bound.
    async fn wait_for(&mut self, target: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()>;

    async fn click(&mut self, target: &Locator) -> E2eResult<()>;

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()>;

    /// Number of attached elements matching `target`.
    async fn count(&mut self, target: &Locator) -> E2eResult<usize>;

    async fn is_visible(&mut self, target: &Locator) -> E2eResult<bool>;

    /// Rendered text of the first match, `None` when nothing matches.
    async fn inner_text(&mut self, target: &Locator) -> E2eResult<Option<String>>;

    /// Rendered text of every match, in document order.
    async fn all_inner_texts(&mut self, target: &Locator) -> E2eResult<Vec<String>>;

    /// Arm a one-shot handler for the next native dialog.
    async fn expect_dialog(&mut self) -> E2eResult<()>;

    /// Wait for the armed dialog to be observed and accepted.
    async fn resolve_dialog(&mut self, timeout: Duration) -> E2eResult<Dialog>;

    /// The armed dialog if it already fired; never blocks.
    async fn poll_dialog(&mut self) -> E2eResult<Option<Dialog>>;

    /// Drop an armed handler whose dialog never came. Dialogs raised
    /// afterwards count as unexpected.
    async fn disarm_dialog(&mut self) -> E2eResult<()>;

    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>>;

    async fn add_cookies(&mut self, cookies: &[Cookie]) -> E2eResult<()>;
}

/// Wait for visibility, then click.
pub async fn click_when_visible<D: Driver + ?Sized>(
    driver: &mut D,
    target: &Locator,
    timeout: Duration,
) -> E2eResult<()> {
    driver.wait_for(target, WaitState::Visible, timeout).await?;
    driver.click(target).await
}

/// Wait for visibility, then fill.
pub async fn fill_when_visible<D: Driver + ?Sized>(
    driver: &mut D,
    target: &Locator,
    value: &str,
    timeout: Duration,
) -> E2eResult<()> {
    driver.wait_for(target, WaitState::Visible, timeout).await?;
    driver.fill(target, value).await
}

/// Click something that raises a native dialog and return the dialog once
/// it was acknowledged.
pub async fn click_expecting_dialog<D: Driver + ?Sized>(
    driver: &mut D,
    target: &Locator,
    action_timeout: Duration,
    dialog_timeout: Duration,
) -> E2eResult<Dialog> {
    driver.wait_for(target, WaitState::Visible, action_timeout).await?;
    driver.expect_dialog().await?;
    driver.click(target).await?;
    let dialog = driver.resolve_dialog(dialog_timeout).await?;
    debug!(dialog = %dialog.message, "dialog acknowledged");
    Ok(dialog)
}

/// Poll until `target` renders exactly `expected`.
pub async fn expect_text<D: Driver + ?Sized>(
    driver: &mut D,
    target: &Locator,
    expected: &str,
    timeout: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let actual = driver.inner_text(target).await?;
        if actual.as_deref().map(str::trim) == Some(expected) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(E2eError::assertion(format!(
                "{} expected text '{}', found {:?}",
                target.describe(),
                expected,
                actual
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until `target` matches exactly `expected` elements.
pub async fn expect_count<D: Driver + ?Sized>(
    driver: &mut D,
    target: &Locator,
    expected: usize,
    timeout: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let actual = driver.count(target).await?;
        if actual == expected {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(E2eError::assertion(format!(
                "{} expected {} element(s), found {}",
                target.describe(),
                expected,
                actual
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators_serialize_for_the_bridge() {
        let rows = Locator::id("tbodyid").within(Locator::any(Role::Row)).first();
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json["by"], "nth");
        assert_eq!(json["index"], 0);
        assert_eq!(json["base"]["by"], "within");
        assert_eq!(json["base"]["scope"]["id"], "tbodyid");
        assert_eq!(json["base"]["inner"]["role"], "row");
    }

    #[test]
    fn describe_reads_like_the_ui() {
        let delete = Locator::role(Role::Link, "Delete").first();
        assert_eq!(delete.describe(), "Link 'Delete'[0]");
        let close = Locator::role(Role::Dialog, "Place order").within(Locator::role(Role::Button, "Close"));
        assert_eq!(close.describe(), "Button 'Close' in Dialog 'Place order'");
    }
}
