//! Concrete scenario groups
//!
//! API groups run against a [`UsersClient`]; storefront groups against a
//! [`Storefront`] wrapping any [`Driver`]. The login scenarios depend on one
//! setup group whose [`Session`](crate::session::Session) seeds them.

use tracing::info;

use crate::api::{Auth, NewUser, User, UsersClient, NOT_FOUND_MESSAGE};
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult, UnauthorizedReason};
use crate::fixtures::{self, EXISTING_EMAIL, MISSING_USER_ID};
use crate::pages::{format_amount, PurchaseOutcome, Storefront, USER_EXISTS};
use crate::scenario::{ContextKey, ContextPatch, ScenarioContext, ScenarioGroup, Step, StepFuture};
use crate::sequencer::CheckoutSequencer;
use crate::session::{Credentials, SessionStore};
use crate::validation::expected_violations;

pub const TAG_SMOKE: &str = "smoke";
pub const TAG_REGRESSION: &str = "regression";
pub const TAG_API: &str = "api";
pub const TAG_UI: &str = "ui";

/// Name of the setup group producing the shared storefront session.
pub const LOGIN_SETUP: &str = "login setup";

// ---------------------------------------------------------------------------
// User API
// ---------------------------------------------------------------------------

fn expect_echo(user: &User, payload: &NewUser) -> E2eResult<()> {
    let echoed = (user.name.as_str(), user.email.as_str(), user.gender.as_str(), user.status.as_str());
    let sent = (
        payload.name.as_str(),
        payload.email.as_str(),
        payload.gender.as_str(),
        payload.status.as_str(),
    );
    if echoed != sent {
        return Err(E2eError::assertion(format!("created user {user:?} does not echo {payload:?}")));
    }
    Ok(())
}

async fn create_user(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let payload = fixtures::valid_user(fixtures::unique_email("john.doe"));
    let response = api.create(&payload).await?;
    response.expect_status(201)?;
    let user = response.into_user()?;
    expect_echo(&user, &payload)?;
    info!(id = user.id, email = %user.email, "user created");
    Ok(ContextPatch::none().user_id(user.id).email(user.email))
}

async fn read_user(api: &mut UsersClient, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let id = ctx.user_id()?;
    let response = api.read(id).await?;
    response.expect_status(200)?;
    let user = response.into_user()?;
    if user.id != id || user.email != ctx.email()? {
        return Err(E2eError::assertion(format!(
            "read {id} returned {user:?}, expected e-mail '{}'",
            ctx.email()?
        )));
    }
    Ok(ContextPatch::none())
}

async fn update_user(api: &mut UsersClient, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let id = ctx.user_id()?;
    let patch = fixtures::rename_patch(fixtures::unique_email("john.updated"));
    let response = api.update(id, &patch).await?;
    response.expect_status(200)?;
    let user = response.into_user()?;
    if user.id != id || Some(&user.name) != patch.name.as_ref() || Some(&user.email) != patch.email.as_ref() {
        return Err(E2eError::assertion(format!("update of {id} returned {user:?} for {patch:?}")));
    }
    Ok(ContextPatch::none().email(user.email))
}

async fn delete_user(api: &mut UsersClient, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let id = ctx.user_id()?;
    let response = api.delete(id).await?;
    response.expect_status(204)?;
    if !response.body.is_null() {
        return Err(E2eError::assertion(format!("delete returned a body: {}", response.body)));
    }
    info!(id, "user deleted");
    Ok(ContextPatch::none())
}

async fn expect_not_found(api: &UsersClient, id: u64) -> E2eResult<()> {
    let response = api.read(id).await?;
    response.expect_status(404)?;
    match response.into_error() {
        E2eError::NotFound(message) if message == NOT_FOUND_MESSAGE => Ok(()),
        other => Err(E2eError::assertion(format!("expected '{NOT_FOUND_MESSAGE}', got {other}"))),
    }
}

async fn read_deleted_user(api: &mut UsersClient, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    expect_not_found(api, ctx.user_id()?).await?;
    Ok(ContextPatch::none())
}

async fn read_missing_user(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    expect_not_found(api, MISSING_USER_ID).await?;
    Ok(ContextPatch::none())
}

async fn list_users(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let users = api.list().await?.into_users()?;
    info!(count = users.len(), "users listed");
    Ok(ContextPatch::none())
}

fn expect_unauthorized(error: E2eError, expected: UnauthorizedReason) -> E2eResult<()> {
    match error {
        E2eError::Unauthorized(reason) if reason == expected => Ok(()),
        other => Err(E2eError::assertion(format!("expected 401 '{expected}', got {other}"))),
    }
}

async fn list_with_invalid_token(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let response = api.list_with(Auth::Bearer("Invalid token".into())).await?;
    response.expect_status(401)?;
    expect_unauthorized(response.into_error(), UnauthorizedReason::InvalidToken)?;
    Ok(ContextPatch::none())
}

async fn create_without_token(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let payload = fixtures::valid_user(fixtures::unique_email("john.doe"));
    let response = api.create_with(&payload, Auth::Missing).await?;
    response.expect_status(401)?;
    expect_unauthorized(response.into_error(), UnauthorizedReason::AuthenticationFailed)?;
    Ok(ContextPatch::none())
}

/// Create `payload` and require a 422 listing exactly the violations the
/// oracle predicts, `taken` being the e-mails known to exist.
async fn expect_rejected(api: &UsersClient, payload: &NewUser, taken: &[&str]) -> E2eResult<()> {
    let expected = expected_violations(payload, |email| taken.contains(&email));
    let response = api.create(payload).await?;
    response.expect_status(422)?;
    let actual = response.field_errors()?;
    if actual != expected {
        return Err(E2eError::assertion(format!(
            "expected violations {expected:?}, got {actual:?}"
        )));
    }
    Ok(())
}

async fn create_invalid_user(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    expect_rejected(api, &fixtures::invalid_user(), &[]).await?;
    Ok(ContextPatch::none())
}

async fn create_invalid_email(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    expect_rejected(api, &fixtures::invalid_email_user(), &[]).await?;
    Ok(ContextPatch::none())
}

async fn create_blank_fields(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let payload = fixtures::blank_fields_user(fixtures::unique_email("john.doe"));
    expect_rejected(api, &payload, &[]).await?;
    Ok(ContextPatch::none())
}

async fn create_existing_email(api: &mut UsersClient, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    expect_rejected(api, &fixtures::valid_user(EXISTING_EMAIL), &[EXISTING_EMAIL]).await?;
    Ok(ContextPatch::none())
}

/// Blank name plus an e-mail owned by the user created earlier in the group.
async fn create_blank_name_taken_email(api: &mut UsersClient, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let email = ctx.email()?;
    let payload = NewUser {
        name: String::new(),
        ..fixtures::valid_user(email)
    };
    expect_rejected(api, &payload, &[email]).await?;
    Ok(ContextPatch::none())
}

fn api_group(name: &str) -> ScenarioGroup<UsersClient> {
    ScenarioGroup::new(name).tag(TAG_API)
}

fn api_step(name: &str, run: for<'a> fn(&'a mut UsersClient, &'a ScenarioContext) -> StepFuture<'a>) -> Step<UsersClient> {
    Step::new(name, run)
}

macro_rules! step_fn {
    ($f:path) => {
        |resource, ctx| Box::pin($f(resource, ctx))
    };
}

/// Create, read, update, delete, then read the deleted id.
pub fn user_lifecycle() -> ScenarioGroup<UsersClient> {
    api_group("user lifecycle")
        .tag(TAG_SMOKE)
        .tag(TAG_REGRESSION)
        .step(api_step("create user", step_fn!(create_user)))
        .step(api_step("read user", step_fn!(read_user)).requires(ContextKey::UserId).requires(ContextKey::Email))
        .step(api_step("update user", step_fn!(update_user)).requires(ContextKey::UserId))
        .step(api_step("delete user", step_fn!(delete_user)).requires(ContextKey::UserId))
        .step(api_step("read deleted user", step_fn!(read_deleted_user)).requires(ContextKey::UserId))
}

/// Blank name with an already taken e-mail reports both, in field order.
pub fn combined_violation() -> ScenarioGroup<UsersClient> {
    api_group("blank name with taken e-mail")
        .tag(TAG_REGRESSION)
        .step(api_step("create user", step_fn!(create_user)))
        .step(
            api_step("reject blank name and taken e-mail", step_fn!(create_blank_name_taken_email))
                .requires(ContextKey::Email),
        )
        .step(api_step("delete user", step_fn!(delete_user)).requires(ContextKey::UserId))
}

/// Every user-API group, dependent ones first.
pub fn api_groups() -> Vec<ScenarioGroup<UsersClient>> {
    vec![
        user_lifecycle(),
        combined_violation(),
        api_group("list users")
            .tag(TAG_SMOKE)
            .step(api_step("list users", step_fn!(list_users))),
        api_group("list users with invalid token")
            .tag(TAG_REGRESSION)
            .step(api_step("list with invalid token", step_fn!(list_with_invalid_token))),
        api_group("create user without token")
            .tag(TAG_REGRESSION)
            .step(api_step("create without token", step_fn!(create_without_token))),
        api_group("create user with invalid data")
            .tag(TAG_REGRESSION)
            .step(api_step("reject invalid gender and e-mail", step_fn!(create_invalid_user))),
        api_group("create user with invalid e-mail")
            .tag(TAG_REGRESSION)
            .step(api_step("reject invalid e-mail", step_fn!(create_invalid_email))),
        api_group("create user with blank fields")
            .tag(TAG_REGRESSION)
            .step(api_step("reject blank fields", step_fn!(create_blank_fields))),
        api_group("create user with existing e-mail")
            .tag(TAG_REGRESSION)
            .step(api_step("reject taken e-mail", step_fn!(create_existing_email))),
        api_group("read missing user")
            .tag(TAG_REGRESSION)
            .step(api_step("read missing user", step_fn!(read_missing_user))),
    ]
}

// ---------------------------------------------------------------------------
// Storefront
// ---------------------------------------------------------------------------

fn sequencer<D: Driver>(store: &Storefront<D>) -> CheckoutSequencer {
    CheckoutSequencer::today(store.date_format())
}

async fn add_one_product<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let product = fixtures::primary_product();
    let (mut cart, details) = seq.add_items(store.tab(), product, 1).await?;
    let price = details.unit_price()?;
    seq.verify_cart(&mut cart, 1, price).await?;
    Ok(ContextPatch::none().cart_total(format_amount(price)))
}

async fn purchase_cart<D: Driver>(store: &mut Storefront<D>, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let total = ctx.cart_total()?;
    let cart = store.tab().open_cart().await?;
    seq.purchase(cart, &fixtures::valid_payment(), Some(total)).await?;
    Ok(ContextPatch::none())
}

async fn reject_empty_form<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let cart = store.tab().goto("/cart.html").await?.into_tab().open_cart().await?;
    seq.reject_incomplete(cart, &fixtures::empty_payment()).await?;
    Ok(ContextPatch::none())
}

/// Malformed name and card pass the form; the confirmation echoes them with
/// today's date.
async fn accept_malformed_details<D: Driver>(
    store: &mut Storefront<D>,
    _ctx: &ScenarioContext,
) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let details = fixtures::malformed_payment();
    let checkout = store.tab().open_cart().await?.place_order().await?;
    match checkout.complete_purchase(&details).await? {
        PurchaseOutcome::Confirmed(mut page) => {
            let text = page.text().await?;
            if !text.contains("OK") {
                return Err(E2eError::assertion(format!("confirmation without OK button: '{text}'")));
            }
            let confirmation = page.details().await?;
            seq.verify_confirmation(&confirmation, &details, None)?;
            page.close().await?;
            Ok(ContextPatch::none())
        }
        PurchaseOutcome::Rejected { message, .. } => Err(E2eError::assertion(format!(
            "malformed but complete details were rejected with '{message}'"
        ))),
    }
}

async fn add_product_twice<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let (mut cart, details) = seq.add_items(store.tab(), fixtures::primary_product(), 2).await?;
    let unit = details.unit_price()?;

    let url = cart.current_url().await?;
    if !url.contains("/cart") {
        return Err(E2eError::assertion(format!("expected the cart page, at '{url}'")));
    }
    seq.verify_cart(&mut cart, 2, unit * 2).await?;
    Ok(ContextPatch::none().cart_total(format_amount(unit * 2)))
}

async fn sign_up_and_log_in<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let credentials = Credentials::unique();
    let tab = store.tab().open_home().await?.into_tab();
    let (session, _) = SessionStore::sign_up_and_login(tab, &credentials).await?;
    if session.auth_cookie().is_none() {
        return Err(E2eError::assertion("log in did not set the auth cookie"));
    }
    Ok(ContextPatch::none().session(session))
}

async fn restore_session<D: Driver>(store: &mut Storefront<D>, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let session = ctx.session()?;
    let tab = store.tab().open_home().await?.into_tab();
    let mut tab = SessionStore::restore(tab, session).await?;
    tab.expect_logged_in().await?;
    Ok(ContextPatch::none())
}

/// Add two, remove one, then buy what is left.
async fn remove_then_purchase<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let (mut cart, details) = seq.add_items(store.tab(), fixtures::primary_product(), 2).await?;
    let unit = details.unit_price()?;
    seq.verify_cart(&mut cart, 2, unit * 2).await?;

    let remaining = seq.remove_one(&mut cart).await?;
    let total = remaining
        .total
        .ok_or_else(|| E2eError::assertion("total hidden with one row left"))?;
    seq.purchase(cart, &fixtures::valid_payment(), Some(&total)).await?;
    Ok(ContextPatch::none().cart_total(total))
}

/// Leave one item in the identity's cart, log out, and see an empty cart.
async fn add_then_log_out<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let (cart, details) = seq.add_items(store.tab(), fixtures::primary_product(), 1).await?;
    let home = SessionStore::logout(cart.into_tab()).await?;
    let mut cart = home.into_tab().open_cart().await?;
    cart.expect_empty().await?;
    Ok(ContextPatch::none().cart_total(details.price))
}

async fn relogin_restores_cart<D: Driver>(store: &mut Storefront<D>, ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let session = ctx.session()?;
    let expected_total: u64 = ctx
        .cart_total()?
        .parse()
        .map_err(|_| E2eError::assertion("cart total in context is not a whole amount"))?;

    let tab = store.tab().open_home().await?.into_tab();
    let mut tab = SessionStore::restore(tab, session).await?;
    tab.expect_logged_in().await?;
    let mut cart = tab.open_cart().await?;
    cart.wait_for_rows(1).await?;
    seq.verify_cart(&mut cart, 1, expected_total).await?;
    Ok(ContextPatch::none())
}

async fn empty_cart<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let seq = sequencer(store);
    let mut cart = store.tab().open_cart().await?;
    let after = seq.remove_one(&mut cart).await?;
    if after.rows != 0 {
        return Err(E2eError::assertion(format!("{} row(s) left after emptying", after.rows)));
    }
    Ok(ContextPatch::none())
}

async fn log_out_and_go_back<D: Driver>(store: &mut Storefront<D>, _ctx: &ScenarioContext) -> E2eResult<ContextPatch> {
    let home = SessionStore::logout(store.tab()).await?;
    home.into_tab().open_login().go_back_and_check_logged_out().await?;
    Ok(ContextPatch::none())
}

async fn sign_up_existing_user<D: Driver>(
    store: &mut Storefront<D>,
    _ctx: &ScenarioContext,
) -> E2eResult<ContextPatch> {
    let login = store.tab().open_home().await?.into_tab().open_login();
    match login.sign_up(&fixtures::existing_credentials()).await {
        Err(E2eError::Auth(message)) if message == USER_EXISTS => Ok(ContextPatch::none()),
        Err(other) => Err(E2eError::assertion(format!("expected '{USER_EXISTS}', got {other}"))),
        Ok(_) => Err(E2eError::assertion("signing up an existing user succeeded")),
    }
}

fn ui_group<D: Driver>(name: &str) -> ScenarioGroup<Storefront<D>> {
    ScenarioGroup::new(name).tag(TAG_UI)
}

fn ui_step<D: Driver + 'static>(
    name: &str,
    run: for<'a> fn(&'a mut Storefront<D>, &'a ScenarioContext) -> StepFuture<'a>,
) -> Step<Storefront<D>> {
    Step::new(name, run)
}

/// Storefront groups that need no session.
pub fn storefront_groups<D: Driver + 'static>() -> Vec<ScenarioGroup<Storefront<D>>> {
    vec![
        ui_group("purchase journey")
            .tag(TAG_SMOKE)
            .tag(TAG_REGRESSION)
            .step(ui_step("add product to cart", step_fn!(add_one_product)))
            .step(ui_step("purchase and confirm", step_fn!(purchase_cart)).requires(ContextKey::CartTotal)),
        ui_group("order form edge cases")
            .tag(TAG_SMOKE)
            .tag(TAG_REGRESSION)
            .step(ui_step("empty form is rejected", step_fn!(reject_empty_form)))
            .step(ui_step("malformed details are confirmed", step_fn!(accept_malformed_details))),
        ui_group("cart total for repeated product")
            .tag(TAG_REGRESSION)
            .step(ui_step("add product twice", step_fn!(add_product_twice))),
        ui_group("sign up with existing user")
            .tag(TAG_SMOKE)
            .step(ui_step("sign up existing user", step_fn!(sign_up_existing_user))),
    ]
}

/// One-time sign-up and log-in on a throw-away browsing context.
pub fn login_setup<D: Driver + 'static>() -> ScenarioGroup<Storefront<D>> {
    ui_group(LOGIN_SETUP).step(ui_step("sign up and log in", step_fn!(sign_up_and_log_in)))
}

/// Groups that start from the setup's session, carried in `seed`.
pub fn session_groups<D: Driver + 'static>(seed: ContextPatch) -> Vec<ScenarioGroup<Storefront<D>>> {
    vec![
        ui_group("cart across logout and re-login")
            .tag(TAG_REGRESSION)
            .seeded(seed.clone())
            .step(ui_step("restore session", step_fn!(restore_session)).requires(ContextKey::Session))
            .step(ui_step("remove one item and purchase", step_fn!(remove_then_purchase)))
            .step(ui_step("add item and log out", step_fn!(add_then_log_out)))
            .step(
                ui_step("re-login restores cart", step_fn!(relogin_restores_cart))
                    .requires(ContextKey::Session)
                    .requires(ContextKey::CartTotal),
            )
            .step(ui_step("empty the cart", step_fn!(empty_cart))),
        ui_group("log out")
            .seeded(seed)
            .step(ui_step("restore session", step_fn!(restore_session)).requires(ContextKey::Session))
            .step(ui_step("log out and go back", step_fn!(log_out_and_go_back))),
    ]
}
