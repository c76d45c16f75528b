//! Route table.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{accounts, categories, home, profiles, replies, roles, threads};
use crate::middleware::{standard_layers, track_metrics};
use crate::state::AppState;

const THREAD: &str = "/community/categories/{category}/threads/{thread}";

pub fn router(state: AppState) -> Router {
    let reply_routes = Router::new()
        .route(&format!("{THREAD}/replies"), post(replies::store))
        .route(&format!("{THREAD}/replies/create"), get(replies::create))
        .route(
            &format!("{THREAD}/replies/{{reply}}"),
            get(replies::show).patch(replies::update),
        )
        .route(&format!("{THREAD}/replies/{{reply}}/edit"), get(replies::edit))
        .route("/community/replies/{reply}", delete(replies::destroy))
        .route("/community/replies/{reply}/archive", post(replies::archive))
        .route("/community/replies/{reply}/restore", post(replies::restore));

    let routes = Router::new()
        .route("/", get(home::welcome))
        .route("/home", get(home::home))
        // Accounts
        .route("/login", get(accounts::login_form).post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/register", get(accounts::register_form).post(accounts::register))
        .route("/email/verify", get(accounts::verification_notice))
        .route("/email/verify/{id}/{hash}", get(accounts::verify))
        .route("/email/resend", post(accounts::resend))
        .route("/password/reset", get(accounts::forgot_form).post(accounts::reset))
        .route("/password/email", post(accounts::send_reset_link))
        .route("/password/reset/{token}", get(accounts::reset_form))
        // Profiles & roles
        .route("/profiles", get(profiles::index))
        .route("/profiles/{user}", get(profiles::show).patch(profiles::update))
        .route("/admin/users/{user}/roles", post(roles::assign))
        // Categories
        .route(
            "/community/categories",
            get(categories::index).post(categories::store),
        )
        .route("/community/categories/create", get(categories::create))
        .route(
            "/community/categories/{category}",
            get(categories::show)
                .patch(categories::update)
                .delete(categories::destroy),
        )
        .route("/community/categories/{category}/edit", get(categories::edit))
        .route(
            "/community/categories/{category}/archive",
            post(categories::archive),
        )
        .route(
            "/community/categories/{category}/restore",
            post(categories::restore),
        )
        // Threads
        .route("/community/threads", get(threads::index).post(threads::store))
        .route("/community/threads/create", get(threads::create))
        .route(
            "/community/threads/{thread}",
            delete(threads::destroy),
        )
        .route("/community/threads/{thread}/archive", post(threads::archive))
        .route("/community/threads/{thread}/restore", post(threads::restore))
        .route(
            "/community/categories/{category}/threads",
            get(threads::by_category),
        )
        .route(THREAD, get(threads::show).patch(threads::update))
        .route(&format!("{THREAD}/edit"), get(threads::edit))
        .merge(reply_routes)
        .route("/metrics", get(home::metrics))
        .route_layer(from_fn_with_state(state.clone(), track_metrics))
        .with_state(state);

    standard_layers(routes)
}
