use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any principal that passed the
/// authentication layer. The `AuthUser` extractor middleware on the router
/// layer above guarantees every handler here receives a validated identity;
/// the finer distinctions (volunteer-only bookmarks, approved-organizer event
/// management, ownership of a specific article or event) are enforced by the
/// guard inside each handler, because they depend on live account state that
/// a route-level layer cannot see.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own profile, shaped per principal kind.
        .route("/me", get(handlers::identity::get_me))
        // PUT /me/organizer
        // Organizer profile update; while rejected this doubles as the
        // resubmission verb.
        .route(
            "/me/organizer",
            put(handlers::identity::update_my_organizer_profile),
        )
        // --- Articles (any principal kind may author) ---
        // POST /articles
        // Creates a draft attributed to the caller's Author row.
        .route("/articles", post(handlers::content::create_article))
        // GET /me/articles
        // Own articles, drafts included.
        .route("/me/articles", get(handlers::content::list_my_articles))
        // PUT/DELETE /articles/{id}
        // Owner-or-admin mutation; admin removal of foreign content demands a
        // reason and notifies the author.
        .route(
            "/articles/{id}",
            put(handlers::content::update_article).delete(handlers::content::delete_article),
        )
        // PATCH /articles/{id}/status
        // Draft/publish flip, freely bidirectional.
        .route(
            "/articles/{id}/status",
            patch(handlers::content::set_article_status),
        )
        // POST /articles/{id}/gallery, DELETE /articles/{id}/gallery/{image_id}
        // Media attachments through the blob store.
        .route(
            "/articles/{id}/gallery",
            post(handlers::content::add_article_gallery_image),
        )
        .route(
            "/articles/{id}/gallery/{image_id}",
            delete(handlers::content::delete_article_gallery_image),
        )
        // --- Events (approved organizers; admins through the override) ---
        .route("/events", post(handlers::events::create_event))
        .route("/me/events", get(handlers::events::list_my_events))
        .route(
            "/events/{id}",
            put(handlers::events::update_event).delete(handlers::events::delete_event),
        )
        // GET /events/{id}/registrations
        // Participant listing, owner or admin only.
        .route(
            "/events/{id}/registrations",
            get(handlers::events::list_event_registrations),
        )
        .route(
            "/events/{id}/gallery",
            post(handlers::events::add_event_gallery_image),
        )
        .route(
            "/events/{id}/gallery/{image_id}",
            delete(handlers::events::delete_event_gallery_image),
        )
        // --- Registration (volunteers) ---
        // POST/DELETE /events/{id}/register
        // The atomic capacity-checked register and its cancellation.
        .route(
            "/events/{id}/register",
            post(handlers::events::register_for_event)
                .delete(handlers::events::cancel_registration),
        )
        // --- Bookmarks (volunteers) ---
        .route(
            "/bookmarks",
            post(handlers::content::add_bookmark).get(handlers::content::list_bookmarks),
        )
        .route("/bookmarks/{id}", delete(handlers::content::remove_bookmark))
}
