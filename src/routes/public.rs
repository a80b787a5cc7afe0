use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client. These cover the identity gateway (registration, login, token
/// flows), the public reading surface, and the contact form.
///
/// Security Mandate:
/// Every data retrieval handler in this module reads through repository
/// queries that unconditionally apply the publish filter, the
/// approved-organizer filter and the soft-delete tombstone filter. Drafts,
/// hidden organizers and deleted rows are invisible to anonymous clients.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(handlers::health_check))
        // --- Identity gateway ---
        // POST /auth/volunteers/register, POST /auth/organizers/register
        // Account creation. Sends the verification mail; a mail gateway
        // failure is surfaced (502) rather than hidden.
        .route(
            "/auth/volunteers/register",
            post(handlers::identity::register_volunteer),
        )
        .route(
            "/auth/organizers/register",
            post(handlers::identity::register_organizer),
        )
        // POST /auth/{kind}/login
        // One login endpoint per principal kind. Deleted accounts get a
        // distinct error; all other failures collapse into one message.
        .route(
            "/auth/volunteers/login",
            post(handlers::identity::login_volunteer),
        )
        .route(
            "/auth/organizers/login",
            post(handlers::identity::login_organizer),
        )
        .route("/auth/admins/login", post(handlers::identity::login_admin))
        // GET /auth/verify-email?token=...
        // Consumes the single-use verification token.
        .route("/auth/verify-email", get(handlers::identity::verify_email))
        // POST /auth/forgot-password, POST /auth/reset-password
        // Ten-minute reset tokens; the forgot endpoint never reveals whether
        // the email matched an account.
        .route(
            "/auth/forgot-password",
            post(handlers::identity::forgot_password),
        )
        .route(
            "/auth/reset-password",
            post(handlers::identity::reset_password),
        )
        // --- Public reading surface ---
        // GET /articles?category_id=...&search=...
        // Published articles only; the filter is enforced in the repository.
        .route("/articles", get(handlers::content::list_articles))
        .route("/articles/{id}", get(handlers::content::get_article_details))
        .route(
            "/articles/{id}/gallery",
            get(handlers::content::list_article_gallery),
        )
        // GET /events?category_id=...&search=...
        // Upcoming events of currently approved organizers.
        .route("/events", get(handlers::events::list_events))
        .route("/events/{id}", get(handlers::events::get_event_details))
        .route(
            "/events/{id}/gallery",
            get(handlers::events::list_event_gallery),
        )
        // GET /categories?kind=...
        .route("/categories", get(handlers::content::list_categories))
        // POST /contact
        // Relayed to the moderation inbox; delivery failure surfaces (502).
        .route("/contact", post(handlers::identity::contact))
}
