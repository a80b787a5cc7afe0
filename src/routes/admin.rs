use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to principals whose token
/// carries the admin override. The router is nested under `/admin` behind
/// the authentication layer; every handler additionally re-checks the
/// override via the guard, so a routing mistake alone can never expose a
/// moderation endpoint.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Aggregate counters for the moderation dashboard.
        .route("/stats", get(handlers::admin::get_dashboard_stats))
        // --- Organizer moderation ---
        // GET /admin/organizers?status=...
        // The moderation queue; defaults to every status except deleted.
        .route("/organizers", get(handlers::admin::list_organizers))
        // POST /admin/organizers/{id}/approve
        // Pending -> Approved; refused while the email is unverified.
        .route(
            "/organizers/{id}/approve",
            post(handlers::admin::approve_organizer),
        )
        // POST /admin/organizers/{id}/reject
        // Pending -> Rejected with a mandatory reason.
        .route(
            "/organizers/{id}/reject",
            post(handlers::admin::reject_organizer),
        )
        .route(
            "/organizers/{id}/suspend",
            post(handlers::admin::suspend_organizer),
        )
        .route(
            "/organizers/{id}/deactivate",
            post(handlers::admin::deactivate_organizer),
        )
        // DELETE /admin/organizers/{id}
        // Terminal soft delete, mandatory reason.
        .route("/organizers/{id}", delete(handlers::admin::delete_organizer))
        // DELETE /admin/volunteers/{id}
        .route("/volunteers/{id}", delete(handlers::admin::delete_volunteer))
        // --- Full content visibility ---
        // GET /admin/articles, GET /admin/events
        // Everything non-deleted, regardless of publish status or organizer
        // standing.
        .route("/articles", get(handlers::admin::list_all_articles))
        .route("/events", get(handlers::admin::list_all_events))
        // --- Categories ---
        // POST /admin/categories, DELETE /admin/categories/{id}
        // Deletion is blocked while the category is referenced.
        .route("/categories", post(handlers::admin::create_category))
        .route("/categories/{id}", delete(handlers::admin::delete_category))
        // --- Outbound mail ---
        .route("/email", post(handlers::admin::send_direct_email))
        .route("/email/broadcast", post(handlers::admin::broadcast_email))
        // POST /admin/sweep
        // Manual trigger of the completion sweep; safe next to the scheduler.
        .route("/sweep", post(handlers::admin::trigger_sweep))
}
