//! In-memory storefront behind the `Driver` trait
//!
//! A [`FakeStore`] is the server side: accounts, auth tokens and one cart per
//! identity. Each [`FakeBrowser`] is a browsing context with its own cookies,
//! page and dialog handler. Pages are re-rendered into a small element tree
//! on every call and locators resolve against it the way the Playwright
//! bridge resolves them: role locators only see visible elements, id and
//! class locators see everything.

use async_trait::async_trait;
use chrono::Local;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use storecheck_e2e::driver::{Dialog, Driver, Locator, Role, WaitState, POLL_INTERVAL};
use storecheck_e2e::error::{E2eError, E2eResult};
use storecheck_e2e::session::{Cookie, AUTH_COOKIE};
use tracing::warn;

pub const ORIGIN: &str = "https://fake.store";
const DOMAIN: &str = "fake.store";

/// How the storefront prints the purchase date: day and month unpadded.
const CONFIRMATION_DATE: &str = "%-d/%-m/%Y";

struct Product {
    id: u32,
    name: &'static str,
    category: &'static str,
    price: u64,
}

const CATALOG: &[Product] = &[
    Product { id: 1, name: "Samsung galaxy s6", category: "Phones", price: 360 },
    Product { id: 2, name: "Nokia lumia 1520", category: "Phones", price: 820 },
    Product { id: 8, name: "Sony vaio i5", category: "Laptops", price: 790 },
    Product { id: 9, name: "Sony vaio i7", category: "Laptops", price: 790 },
    Product { id: 10, name: "Apple monitor 24", category: "Monitors", price: 400 },
    Product { id: 14, name: "MacBook air", category: "Laptops", price: 700 },
];

const CATEGORIES: &[&str] = &["Phones", "Laptops", "Monitors"];

fn product(id: u32) -> Option<&'static Product> {
    CATALOG.iter().find(|p| p.id == id)
}

/// Deliberate deviations, to check that the suites notice them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    /// Logging out drops the account's cart
    pub forget_cart_on_logout: bool,
    /// Every sign-up answers "This user already exist."
    pub refuse_sign_up: bool,
    /// The cart total is one more than the sum of its rows
    pub total_off_by_one: bool,
}

struct Backend {
    accounts: HashMap<String, String>,
    tokens: HashMap<String, String>,
    carts: HashMap<String, Vec<u32>>,
    orders: u64,
    next_token: u64,
    quirks: Quirks,
}

impl Backend {
    fn total(&self, identity: &str) -> u64 {
        let sum: u64 = self
            .carts
            .get(identity)
            .map(|items| items.iter().filter_map(|id| product(*id)).map(|p| p.price).sum())
            .unwrap_or(0);
        if self.quirks.total_off_by_one && sum > 0 {
            sum + 1
        } else {
            sum
        }
    }
}

#[derive(Clone)]
pub struct FakeStore {
    backend: Arc<Mutex<Backend>>,
    contexts: Arc<AtomicU64>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert("testing123".to_string(), "testing123".to_string());
        Self {
            backend: Arc::new(Mutex::new(Backend {
                accounts,
                tokens: HashMap::new(),
                carts: HashMap::new(),
                orders: 0,
                next_token: 0,
                quirks,
            })),
            contexts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A fresh browsing context: no cookies, blank page.
    pub fn browser(&self) -> FakeBrowser {
        let n = self.contexts.fetch_add(1, Ordering::SeqCst);
        FakeBrowser {
            backend: Arc::clone(&self.backend),
            guest: format!("guest-{n}"),
            cookies: Vec::new(),
            url: "about:blank".to_string(),
            page: Page::Blank,
            history: Vec::new(),
            modal: None,
            inputs: HashMap::new(),
            confirmation: None,
            armed: false,
            fired: None,
            unexpected: Vec::new(),
        }
    }

    pub fn has_account(&self, username: &str) -> bool {
        self.backend.lock().unwrap().accounts.contains_key(username)
    }

    /// Product names in `username`'s cart.
    pub fn cart_of(&self, username: &str) -> Vec<&'static str> {
        let backend = self.backend.lock().unwrap();
        backend
            .carts
            .get(username)
            .map(|items| items.iter().filter_map(|id| product(*id)).map(|p| p.name).collect())
            .unwrap_or_default()
    }

    pub fn orders(&self) -> u64 {
        self.backend.lock().unwrap().orders
    }

    /// Every account created through sign-up.
    pub fn signed_up(&self) -> Vec<String> {
        let backend = self.backend.lock().unwrap();
        backend
            .accounts
            .keys()
            .filter(|name| name.as_str() != "testing123")
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Page {
    Blank,
    Home { category: Option<String> },
    Product(u32),
    Cart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modal {
    SignUp,
    LogIn,
    Order,
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Home,
    Cart,
    Category(&'static str),
    OpenProduct(u32),
    AddToCart(u32),
    DeleteRow(usize),
    Open(Modal),
    CloseModal,
    SignUpSubmit,
    LogInSubmit,
    LogOut,
    Purchase,
    ConfirmOk,
}

#[derive(Debug, Clone)]
struct Node {
    role: Option<Role>,
    name: String,
    text: String,
    id: Option<&'static str>,
    classes: Vec<&'static str>,
    visible: bool,
    action: Option<Action>,
    end: usize,
}

impl Node {
    fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            role: None,
            name: String::new(),
            text,
            id: None,
            classes: Vec::new(),
            visible: true,
            action: None,
            end: 0,
        }
    }

    fn role(role: Role, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            role: Some(role),
            text: name.clone(),
            name,
            ..Self::plain("")
        }
    }

    fn link(name: &str, action: Action) -> Self {
        Self::role(Role::Link, name).act(action)
    }

    fn button(name: &str, action: Action) -> Self {
        Self::role(Role::Button, name).act(action)
    }

    fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    fn shown(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    fn act(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

/// Pre-order element arena; node `i` owns `i + 1..nodes[i].end`.
#[derive(Default)]
struct Dom {
    nodes: Vec<Node>,
    open: Vec<usize>,
}

impl Dom {
    fn push(&mut self, mut node: Node) -> usize {
        if let Some(parent) = self.open.last() {
            node.visible &= self.nodes[*parent].visible;
        }
        let index = self.nodes.len();
        node.end = index + 1;
        self.nodes.push(node);
        index
    }

    fn leaf(&mut self, node: Node) {
        self.push(node);
    }

    fn open(&mut self, node: Node) {
        let index = self.push(node);
        self.open.push(index);
    }

    fn close(&mut self) {
        if let Some(index) = self.open.pop() {
            self.nodes[index].end = self.nodes.len();
        }
    }

    fn find(&self, locator: &Locator) -> Vec<usize> {
        self.resolve(locator, 0..self.nodes.len())
    }

    fn resolve(&self, locator: &Locator, range: Range<usize>) -> Vec<usize> {
        match locator {
            Locator::Role { role, name, exact } => range
                .filter(|&i| {
                    let node = &self.nodes[i];
                    node.visible
                        && node.role == Some(*role)
                        && match name {
                            None => true,
                            Some(name) if *exact => node.name == *name,
                            Some(name) => node.name.to_lowercase().contains(&name.to_lowercase()),
                        }
                })
                .collect(),
            Locator::Text { text } => range
                .filter(|&i| self.nodes[i].visible && self.nodes[i].text.contains(text.as_str()))
                .collect(),
            Locator::Id { id } => range.filter(|&i| self.nodes[i].id == Some(id.as_str())).collect(),
            Locator::Class { class } => range
                .filter(|&i| self.nodes[i].classes.contains(&class.as_str()))
                .collect(),
            Locator::Within { scope, inner } => {
                let mut hits: Vec<usize> = self
                    .resolve(scope, range)
                    .into_iter()
                    .flat_map(|s| self.resolve(inner, s + 1..self.nodes[s].end))
                    .collect();
                hits.sort_unstable();
                hits.dedup();
                hits
            }
            Locator::Nth { base, index } => self.resolve(base, range).get(*index).copied().into_iter().collect(),
        }
    }
}

pub struct FakeBrowser {
    backend: Arc<Mutex<Backend>>,
    guest: String,
    cookies: Vec<Cookie>,
    url: String,
    page: Page,
    history: Vec<String>,
    modal: Option<Modal>,
    inputs: HashMap<&'static str, String>,
    confirmation: Option<String>,
    armed: bool,
    fired: Option<Dialog>,
    unexpected: Vec<String>,
}

impl FakeBrowser {
    fn user(&self, backend: &Backend) -> Option<String> {
        self.cookies
            .iter()
            .find(|c| c.name == AUTH_COOKIE)
            .and_then(|c| backend.tokens.get(&c.value))
            .cloned()
    }

    fn identity(&self, backend: &Backend) -> String {
        self.user(backend).unwrap_or_else(|| self.guest.clone())
    }

    fn load(&mut self, path: &str) -> E2eResult<()> {
        let page = match path.split('?').next().unwrap_or(path) {
            "/" | "/index.html" => Page::Home { category: None },
            "/cart.html" => Page::Cart,
            "/prod.html" => {
                let id = path
                    .split("idp_=")
                    .nth(1)
                    .and_then(|id| id.parse().ok())
                    .filter(|id| product(*id).is_some())
                    .ok_or_else(|| E2eError::Driver(format!("no product at '{path}'")))?;
                Page::Product(id)
            }
            other => return Err(E2eError::Driver(format!("404 for '{other}'"))),
        };
        self.page = page;
        self.url = format!("{ORIGIN}{path}");
        self.modal = None;
        self.confirmation = None;
        self.inputs.clear();
        Ok(())
    }

    fn navigate(&mut self, path: &str) -> E2eResult<()> {
        let previous = self.url.clone();
        self.load(path)?;
        self.history.push(previous);
        Ok(())
    }

    fn raise(&mut self, message: &str) {
        if self.armed {
            self.armed = false;
            self.fired = Some(Dialog {
                message: message.to_string(),
            });
        } else {
            warn!(dialog = message, "unexpected dialog accepted");
            self.unexpected.push(message.to_string());
        }
    }

    fn drop_fired(&mut self) {
        if let Some(dialog) = self.fired.take() {
            warn!(dialog = %dialog.message, "dialog fired but was never read");
            self.unexpected.push(dialog.message);
        }
    }

    /// Messages of dialogs that arrived with no handler armed, or that fired
    /// and were never read.
    pub fn unexpected_dialogs(&self) -> &[String] {
        &self.unexpected
    }

    pub fn dialog_armed(&self) -> bool {
        self.armed
    }

    fn render(&self) -> Dom {
        let backend = self.backend.lock().unwrap();
        let mut dom = Dom::default();
        if self.page == Page::Blank {
            return dom;
        }
        let user = self.user(&backend);
        let logged_in = user.is_some();

        dom.open(Node::plain("").id("navbarExample"));
        dom.leaf(Node::link("Home", Action::Home));
        dom.leaf(Node::link("Cart", Action::Cart).id("cartur"));
        dom.leaf(Node::link("Log in", Action::Open(Modal::LogIn)).id("login2").shown(!logged_in));
        dom.leaf(Node::link("Log out", Action::LogOut).id("logout2").shown(logged_in));
        dom.leaf(
            Node::role(Role::Link, format!("Welcome {}", user.as_deref().unwrap_or_default()))
                .id("nameofuser")
                .shown(logged_in),
        );
        dom.leaf(Node::link("Sign up", Action::Open(Modal::SignUp)).id("signin2").shown(!logged_in));
        dom.close();

        match &self.page {
            Page::Blank => {}
            Page::Home { category } => {
                for name in CATEGORIES {
                    dom.leaf(Node::link(name, Action::Category(*name)));
                }
                let listed = CATALOG
                    .iter()
                    .filter(|p| category.as_deref().map_or(true, |c| c == p.category));
                for p in listed {
                    dom.open(Node::plain("").class("card"));
                    dom.open(Node::plain(p.name).class("card-title"));
                    dom.leaf(Node::link(p.name, Action::OpenProduct(p.id)));
                    dom.close();
                    dom.leaf(Node::plain(format!("${}", p.price)));
                    dom.close();
                }
            }
            Page::Product(id) => {
                if let Some(p) = product(*id) {
                    dom.leaf(Node::role(Role::Heading, p.name).class("name"));
                    dom.leaf(Node::plain(format!("${} *includes tax", p.price)).class("price-container"));
                    dom.leaf(Node::link("Add to cart", Action::AddToCart(p.id)));
                }
            }
            Page::Cart => {
                let identity = self.identity(&backend);
                let items = backend.carts.get(&identity).cloned().unwrap_or_default();
                dom.leaf(Node::role(Role::Heading, "Products"));
                dom.open(Node::plain("").id("tbodyid"));
                for (row, p) in items.iter().filter_map(|id| product(*id)).enumerate() {
                    let text = format!("\t{}\t{}\tDelete", p.name, p.price);
                    dom.open(Node::role(Role::Row, text));
                    dom.leaf(Node::link("Delete", Action::DeleteRow(row)));
                    dom.close();
                }
                dom.close();
                let total = if items.is_empty() {
                    String::new()
                } else {
                    backend.total(&identity).to_string()
                };
                dom.leaf(Node::plain(total).id("totalp").shown(!items.is_empty()));
                dom.leaf(Node::button("Place Order", Action::Open(Modal::Order)));

                dom.open(Node::role(Role::Dialog, "Place order").id("orderModal").shown(self.modal == Some(Modal::Order)));
                for (label, id) in [
                    ("Name:", "name"),
                    ("Country:", "country"),
                    ("City:", "city"),
                    ("Credit card:", "card"),
                    ("Month:", "month"),
                    ("Year:", "year"),
                ] {
                    dom.leaf(Node::role(Role::Textbox, label).id(id));
                }
                dom.leaf(Node::button("Close", Action::CloseModal));
                dom.leaf(Node::button("Purchase", Action::Purchase));
                dom.close();
            }
        }

        dom.open(Node::role(Role::Dialog, "Sign up").id("signInModal").shown(self.modal == Some(Modal::SignUp)));
        dom.leaf(Node::role(Role::Textbox, "Username:").id("sign-username"));
        dom.leaf(Node::role(Role::Textbox, "Password:").id("sign-password"));
        dom.leaf(Node::button("Close", Action::CloseModal));
        dom.leaf(Node::button("Sign up", Action::SignUpSubmit));
        dom.close();

        dom.open(Node::role(Role::Dialog, "Log in").id("logInModal").shown(self.modal == Some(Modal::LogIn)));
        dom.leaf(Node::role(Role::Textbox, "Username:").id("loginusername"));
        dom.leaf(Node::role(Role::Textbox, "Password:").id("loginpassword"));
        dom.leaf(Node::button("Close", Action::CloseModal));
        dom.leaf(Node::button("Log in", Action::LogInSubmit));
        dom.close();

        if let Some(lead) = &self.confirmation {
            dom.open(Node::plain(format!("Thank you for your purchase!\n{lead}\nOK")).class("sweet-alert"));
            dom.leaf(Node::role(Role::Heading, "Thank you for your purchase!"));
            dom.leaf(Node::plain(lead.clone()).class("lead"));
            dom.leaf(Node::button("OK", Action::ConfirmOk));
            dom.close();
        }
        dom
    }

    /// The single visible element `target` resolves to.
    fn single(&self, dom: &Dom, target: &Locator) -> E2eResult<usize> {
        let hits: Vec<usize> = dom.find(target).into_iter().filter(|&i| dom.nodes[i].visible).collect();
        match hits.as_slice() {
            [one] => Ok(*one),
            [] => Err(E2eError::timeout(format!("{} to be actionable", target.describe()), Duration::ZERO)),
            many => Err(E2eError::Driver(format!(
                "strict mode violation: {} resolved to {} elements",
                target.describe(),
                many.len()
            ))),
        }
    }

    fn perform(&mut self, action: Action) -> E2eResult<()> {
        match action {
            Action::Home => self.navigate("/index.html"),
            Action::Cart => self.navigate("/cart.html"),
            Action::Category(name) => {
                self.page = Page::Home {
                    category: Some(name.to_string()),
                };
                Ok(())
            }
            Action::OpenProduct(id) => self.navigate(&format!("/prod.html?idp_={id}")),
            Action::AddToCart(id) => {
                {
                    let mut backend = self.backend.lock().unwrap();
                    let identity = self.identity(&backend);
                    backend.carts.entry(identity).or_default().push(id);
                }
                self.raise("Product added.");
                Ok(())
            }
            Action::DeleteRow(row) => {
                let mut backend = self.backend.lock().unwrap();
                let identity = self.identity(&backend);
                if let Some(items) = backend.carts.get_mut(&identity) {
                    if row < items.len() {
                        items.remove(row);
                    }
                }
                Ok(())
            }
            Action::Open(modal) => {
                self.modal = Some(modal);
                Ok(())
            }
            Action::CloseModal => {
                self.modal = None;
                Ok(())
            }
            Action::SignUpSubmit => {
                let username = self.inputs.get("sign-username").cloned().unwrap_or_default();
                let password = self.inputs.get("sign-password").cloned().unwrap_or_default();
                let message = {
                    let mut backend = self.backend.lock().unwrap();
                    if username.is_empty() || password.is_empty() {
                        "Please fill out Username and Password."
                    } else if backend.quirks.refuse_sign_up || backend.accounts.contains_key(&username) {
                        "This user already exist."
                    } else {
                        backend.accounts.insert(username, password);
                        "Sign up successful."
                    }
                };
                if message == "Sign up successful." {
                    self.modal = None;
                }
                self.raise(message);
                Ok(())
            }
            Action::LogInSubmit => {
                let username = self.inputs.get("loginusername").cloned().unwrap_or_default();
                let password = self.inputs.get("loginpassword").cloned().unwrap_or_default();
                let outcome = {
                    let mut backend = self.backend.lock().unwrap();
                    let known = backend.accounts.get(&username).cloned();
                    match known {
                        None => Err("User does not exist."),
                        Some(expected) if expected != password => Err("Wrong password."),
                        Some(_) => {
                            backend.next_token += 1;
                            let token = format!("token-{}-{}", username, backend.next_token);
                            backend.tokens.insert(token.clone(), username);
                            Ok(token)
                        }
                    }
                };
                match outcome {
                    Ok(token) => {
                        self.cookies.retain(|c| c.name != AUTH_COOKIE);
                        self.cookies.push(Cookie::new(AUTH_COOKIE, token, DOMAIN));
                        self.modal = None;
                    }
                    Err(message) => self.raise(message),
                }
                Ok(())
            }
            Action::LogOut => {
                {
                    let mut backend = self.backend.lock().unwrap();
                    if let Some(user) = self.user(&backend) {
                        if backend.quirks.forget_cart_on_logout {
                            backend.carts.remove(&user);
                        }
                    }
                }
                self.cookies.retain(|c| c.name != AUTH_COOKIE);
                self.navigate("/index.html")
            }
            Action::Purchase => {
                let name = self.inputs.get("name").cloned().unwrap_or_default();
                let card = self.inputs.get("card").cloned().unwrap_or_default();
                if name.is_empty() || card.is_empty() {
                    self.raise("Please fill out Name and Creditcard.");
                    return Ok(());
                }
                let lead = {
                    let mut backend = self.backend.lock().unwrap();
                    let identity = self.identity(&backend);
                    let amount = backend.total(&identity);
                    backend.carts.remove(&identity);
                    backend.orders += 1;
                    format!(
                        "Id: {}\nAmount: {} USD\nCard Number: {}\nName: {}\nDate: {}",
                        4_000_000 + backend.orders,
                        amount,
                        card,
                        name,
                        Local::now().format(CONFIRMATION_DATE)
                    )
                };
                self.modal = None;
                self.confirmation = Some(lead);
                Ok(())
            }
            Action::ConfirmOk => {
                self.confirmation = None;
                Ok(())
            }
        }
    }

    fn state_holds(&self, target: &Locator, state: WaitState) -> bool {
        let dom = self.render();
        let hits = dom.find(target);
        let first_visible = hits.first().map(|&i| dom.nodes[i].visible);
        match state {
            WaitState::Visible => first_visible == Some(true),
            WaitState::Hidden => first_visible != Some(true),
            WaitState::Attached => !hits.is_empty(),
            WaitState::Detached => hits.is_empty(),
        }
    }
}

#[async_trait]
impl Driver for FakeBrowser {
    async fn goto(&mut self, path: &str) -> E2eResult<()> {
        self.navigate(path)
    }

    async fn reload(&mut self) -> E2eResult<()> {
        let path = self.url.trim_start_matches(ORIGIN).to_string();
        if path == "about:blank" {
            return Ok(());
        }
        self.load(&path)
    }

    async fn go_back(&mut self) -> E2eResult<()> {
        match self.history.pop() {
            Some(url) if url != "about:blank" => {
                let path = url.trim_start_matches(ORIGIN).to_string();
                self.load(&path)
            }
            _ => Ok(()),
        }
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(self.url.clone())
    }

    async fn wait_for(&mut self, target: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state_holds(target, state) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(E2eError::timeout(format!("{} to be {:?}", target.describe(), state), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }

    async fn click(&mut self, target: &Locator) -> E2eResult<()> {
        let dom = self.render();
        let index = self.single(&dom, target)?;
        match dom.nodes[index].action.clone() {
            Some(action) => self.perform(action),
            None => Ok(()),
        }
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        let dom = self.render();
        let index = self.single(&dom, target)?;
        let node = &dom.nodes[index];
        match (node.role, node.id) {
            (Some(Role::Textbox), Some(id)) => {
                self.inputs.insert(id, value.to_string());
                Ok(())
            }
            _ => Err(E2eError::Driver(format!("{} is not editable", target.describe()))),
        }
    }

    async fn count(&mut self, target: &Locator) -> E2eResult<usize> {
        Ok(self.render().find(target).len())
    }

    async fn is_visible(&mut self, target: &Locator) -> E2eResult<bool> {
        Ok(self.state_holds(target, WaitState::Visible))
    }

    async fn inner_text(&mut self, target: &Locator) -> E2eResult<Option<String>> {
        let dom = self.render();
        Ok(dom.find(target).first().map(|&i| dom.nodes[i].text.clone()))
    }

    async fn all_inner_texts(&mut self, target: &Locator) -> E2eResult<Vec<String>> {
        let dom = self.render();
        Ok(dom.find(target).into_iter().map(|i| dom.nodes[i].text.clone()).collect())
    }

    async fn expect_dialog(&mut self) -> E2eResult<()> {
        self.drop_fired();
        self.armed = true;
        Ok(())
    }

    async fn resolve_dialog(&mut self, timeout: Duration) -> E2eResult<Dialog> {
        match self.fired.take() {
            Some(dialog) => Ok(dialog),
            None => {
                tokio::time::sleep(timeout).await;
                self.armed = false;
                Err(E2eError::timeout("dialog", timeout))
            }
        }
    }

    async fn poll_dialog(&mut self) -> E2eResult<Option<Dialog>> {
        Ok(self.fired.take())
    }

    async fn disarm_dialog(&mut self) -> E2eResult<()> {
        self.drop_fired();
        self.armed = false;
        Ok(())
    }

    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>> {
        Ok(self.cookies.clone())
    }

    async fn add_cookies(&mut self, cookies: &[Cookie]) -> E2eResult<()> {
        for cookie in cookies {
            self.cookies.retain(|c| c.name != cookie.name);
            self.cookies.push(cookie.clone());
        }
        Ok(())
    }
}
