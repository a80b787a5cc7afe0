use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod notifier;
pub mod repository;
pub mod storage;
pub mod sweep;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and to the integration tests.
pub use config::AppConfig;
pub use error::ApiError;
pub use notifier::{HttpNotifier, NotifierState, RecordingNotifier};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockBlobStore, S3BlobStore, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every handler decorated with `#[utoipa::path]`
/// and every schema decorated with `#[derive(utoipa::ToSchema)]`. The
/// resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        // Identity
        handlers::identity::register_volunteer, handlers::identity::register_organizer,
        handlers::identity::login_volunteer, handlers::identity::login_organizer,
        handlers::identity::login_admin, handlers::identity::verify_email,
        handlers::identity::forgot_password, handlers::identity::reset_password,
        handlers::identity::get_me, handlers::identity::update_my_organizer_profile,
        handlers::identity::contact,
        // Content
        handlers::content::list_articles, handlers::content::get_article_details,
        handlers::content::create_article, handlers::content::list_my_articles,
        handlers::content::update_article, handlers::content::set_article_status,
        handlers::content::delete_article, handlers::content::add_article_gallery_image,
        handlers::content::list_article_gallery, handlers::content::delete_article_gallery_image,
        handlers::content::list_categories, handlers::content::add_bookmark,
        handlers::content::remove_bookmark, handlers::content::list_bookmarks,
        // Events
        handlers::events::list_events, handlers::events::get_event_details,
        handlers::events::create_event, handlers::events::list_my_events,
        handlers::events::update_event, handlers::events::delete_event,
        handlers::events::list_event_registrations, handlers::events::register_for_event,
        handlers::events::cancel_registration, handlers::events::add_event_gallery_image,
        handlers::events::list_event_gallery, handlers::events::delete_event_gallery_image,
        // Admin
        handlers::admin::get_dashboard_stats, handlers::admin::list_organizers,
        handlers::admin::approve_organizer, handlers::admin::reject_organizer,
        handlers::admin::suspend_organizer, handlers::admin::deactivate_organizer,
        handlers::admin::delete_organizer, handlers::admin::delete_volunteer,
        handlers::admin::list_all_articles, handlers::admin::list_all_events,
        handlers::admin::create_category, handlers::admin::delete_category,
        handlers::admin::send_direct_email, handlers::admin::broadcast_email,
        handlers::admin::trigger_sweep,
    ),
    components(
        schemas(
            models::Article, models::Event, models::Category, models::Bookmark,
            models::GalleryImage, models::EventRegistration, models::RegistrationEntry,
            models::RegisterVolunteerRequest, models::RegisterOrganizerRequest,
            models::LoginRequest, models::LoginResponse, models::UpdateOrganizerProfileRequest,
            models::ReasonRequest, models::CreateArticleRequest, models::UpdateArticleRequest,
            models::SetContentStatusRequest, models::CreateEventRequest,
            models::UpdateEventRequest, models::CreateCategoryRequest,
            models::CreateBookmarkRequest, models::AddGalleryImageRequest,
            models::ContactMessageRequest, models::DirectEmailRequest,
            models::BroadcastEmailRequest, models::BroadcastAudience,
            models::ForgotPasswordRequest, models::ResetPasswordRequest,
            models::AdminDashboardStats, models::ProfileResponse, models::SweepReport,
        )
    ),
    tags(
        (name = "relawan-portal", description = "Community volunteering platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, thread-safe,
/// immutable container holding every application service, shared across all
/// incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage Layer: abstracts S3/MinIO blob access.
    pub storage: StorageState,
    /// Notification Layer: abstracts the outbound mail gateway.
    pub notifier: NotifierState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors and handlers to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for NotifierState {
    fn from_ref(app_state: &AppState) -> NotifierState {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes` (and the nested
/// admin router).
///
/// *Mechanism*: attempts to extract `AuthUser` from the request. Since
/// `AuthUser` implements `FromRequestParts`, any credential failure rejects
/// the request with a 401 before the handler runs; on success the request
/// proceeds and the handler re-extracts the identity for its own checks.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: protected by the auth middleware.
        .merge(authenticated::authenticated_routes().route_layer(
            middleware::from_fn_with_state(state.clone(), auth_middleware),
        ))
        // Admin Routes: nested under '/admin' behind the same authentication
        // layer; the admin-override check is performed inside the handlers.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the whole request/response
                // lifecycle in a span carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the generated
                // x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: extracts the
/// `x-request-id` header (if present) and includes it in the structured
/// logging metadata alongside the HTTP method and URI, so every log line for
/// a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
