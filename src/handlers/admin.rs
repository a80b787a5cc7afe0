use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    guard, lifecycle,
    models::{
        AdminDashboardStats, Article, BroadcastAudience, BroadcastEmailRequest, Category,
        CategoryDeleteOutcome, CreateCategoryRequest, DirectEmailRequest, Event, Organizer,
        OrganizerStatus, ReasonRequest, SweepReport,
    },
    notifier::Notice,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// OrganizerListFilter
#[derive(Deserialize, utoipa::IntoParams)]
pub struct OrganizerListFilter {
    /// Restrict to one moderation status. Without it, every status except
    /// `deleted` is returned.
    pub status: Option<OrganizerStatus>,
}

// --- Dashboard ---

/// get_dashboard_stats
///
/// [Admin Route] Aggregate counters for the moderation dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Counters", body = AdminDashboardStats))
)]
pub async fn get_dashboard_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    guard::require_admin(&user)?;
    let stats = state.repo.get_stats().await?;
    Ok(Json(stats))
}

// --- Organizer moderation ---

/// list_organizers
///
/// [Admin Route] Organizer listing for the moderation queue.
#[utoipa::path(
    get,
    path = "/admin/organizers",
    params(OrganizerListFilter),
    responses((status = 200, description = "Organizers", body = [Organizer]))
)]
pub async fn list_organizers(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<OrganizerListFilter>,
) -> Result<Json<Vec<Organizer>>, ApiError> {
    guard::require_admin(&user)?;
    let organizers = state.repo.list_organizers(filter.status).await?;
    Ok(Json(organizers))
}

/// approve_organizer
///
/// [Admin Route] `Pending` -> `Approved`. Refused while the organizer has
/// not verified their email.
#[utoipa::path(
    post,
    path = "/admin/organizers/{id}/approve",
    responses(
        (status = 200, description = "Approved", body = Organizer),
        (status = 409, description = "Not pending, or email unverified")
    )
)]
pub async fn approve_organizer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Organizer>, ApiError> {
    guard::require_admin(&user)?;
    let organizer = lifecycle::approve_organizer(&state.repo, &state.notifier, id).await?;
    Ok(Json(organizer))
}

/// reject_organizer
///
/// [Admin Route] `Pending` -> `Rejected` with a mandatory reason.
#[utoipa::path(
    post,
    path = "/admin/organizers/{id}/reject",
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Rejected", body = Organizer),
        (status = 400, description = "Missing reason")
    )
)]
pub async fn reject_organizer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<Organizer>, ApiError> {
    guard::require_admin(&user)?;
    let organizer =
        lifecycle::reject_organizer(&state.repo, &state.notifier, id, payload.reason).await?;
    Ok(Json(organizer))
}

/// suspend_organizer
#[utoipa::path(
    post,
    path = "/admin/organizers/{id}/suspend",
    responses((status = 200, description = "Suspended", body = Organizer))
)]
pub async fn suspend_organizer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Organizer>, ApiError> {
    guard::require_admin(&user)?;
    let organizer = lifecycle::suspend_organizer(&state.repo, &state.notifier, id).await?;
    Ok(Json(organizer))
}

/// deactivate_organizer
#[utoipa::path(
    post,
    path = "/admin/organizers/{id}/deactivate",
    responses((status = 200, description = "Deactivated", body = Organizer))
)]
pub async fn deactivate_organizer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Organizer>, ApiError> {
    guard::require_admin(&user)?;
    let organizer = lifecycle::deactivate_organizer(&state.repo, &state.notifier, id).await?;
    Ok(Json(organizer))
}

/// delete_organizer
///
/// [Admin Route] Terminal soft delete with a mandatory reason. The account
/// vanishes from listings and can no longer authenticate.
#[utoipa::path(
    delete,
    path = "/admin/organizers/{id}",
    request_body = ReasonRequest,
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Missing reason")
    )
)]
pub async fn delete_organizer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<StatusCode, ApiError> {
    guard::require_admin(&user)?;
    lifecycle::soft_delete_organizer(&state.repo, &state.notifier, id, payload.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_volunteer
///
/// [Admin Route] Volunteer soft delete with a mandatory reason.
#[utoipa::path(
    delete,
    path = "/admin/volunteers/{id}",
    request_body = ReasonRequest,
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Missing reason")
    )
)]
pub async fn delete_volunteer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<StatusCode, ApiError> {
    guard::require_admin(&user)?;
    lifecycle::soft_delete_volunteer(&state.repo, &state.notifier, id, payload.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Full content listings ---

/// list_all_articles
///
/// [Admin Route] Every non-deleted article regardless of publish status.
#[utoipa::path(
    get,
    path = "/admin/articles",
    responses((status = 200, description = "All articles", body = [Article]))
)]
pub async fn list_all_articles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, ApiError> {
    guard::require_admin(&user)?;
    let articles = state.repo.list_all_articles().await?;
    Ok(Json(articles))
}

/// list_all_events
///
/// [Admin Route] Every non-deleted event regardless of status or organizer
/// standing.
#[utoipa::path(
    get,
    path = "/admin/events",
    responses((status = 200, description = "All events", body = [Event]))
)]
pub async fn list_all_events(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, ApiError> {
    guard::require_admin(&user)?;
    let events = state.repo.list_all_events().await?;
    Ok(Json(events))
}

// --- Categories ---

/// create_category
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses((status = 201, description = "Created", body = Category))
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    guard::require_admin(&user)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("a category name is required".to_string()));
    }
    let category = state.repo.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// delete_category
///
/// [Admin Route] Hard delete, blocked while any article or event still
/// references the category.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    guard::require_admin(&user)?;
    match state.repo.delete_category(id).await? {
        CategoryDeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        CategoryDeleteOutcome::InUse => Err(ApiError::Conflict(
            "this category is still referenced by articles or events".to_string(),
        )),
        CategoryDeleteOutcome::NotFound => {
            Err(ApiError::NotFound("category not found".to_string()))
        }
    }
}

// --- Outbound mail ---

/// send_direct_email
///
/// [Admin Route] One-off mail to a single recipient. Delivery failure
/// surfaces; there is no point pretending a direct mail went out.
#[utoipa::path(
    post,
    path = "/admin/email",
    request_body = DirectEmailRequest,
    responses(
        (status = 200, description = "Sent"),
        (status = 502, description = "Mail gateway failure")
    )
)]
pub async fn send_direct_email(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DirectEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    guard::require_admin(&user)?;
    state
        .notifier
        .send(
            &payload.recipient,
            Notice::Direct {
                subject: payload.subject,
                body: payload.body,
            },
        )
        .await
        .map_err(ApiError::Dependency)?;
    Ok(Json(json!({ "message": "email sent" })))
}

/// broadcast_email
///
/// [Admin Route] Fan-out to all active volunteers, all approved organizers,
/// or both. Individual delivery failures are logged and skipped; the
/// response reports how many sends succeeded.
#[utoipa::path(
    post,
    path = "/admin/email/broadcast",
    request_body = BroadcastEmailRequest,
    responses((status = 200, description = "Broadcast dispatched"))
)]
pub async fn broadcast_email(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<BroadcastEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    guard::require_admin(&user)?;

    let mut recipients = Vec::new();
    if matches!(
        payload.audience,
        BroadcastAudience::All | BroadcastAudience::Volunteers
    ) {
        recipients.extend(state.repo.list_active_volunteer_emails().await?);
    }
    if matches!(
        payload.audience,
        BroadcastAudience::All | BroadcastAudience::Organizers
    ) {
        recipients.extend(state.repo.list_approved_organizer_emails().await?);
    }

    let mut delivered = 0usize;
    for recipient in &recipients {
        match state
            .notifier
            .send(
                recipient,
                Notice::Direct {
                    subject: payload.subject.clone(),
                    body: payload.body.clone(),
                },
            )
            .await
        {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!("broadcast delivery to {recipient} failed: {e}"),
        }
    }

    Ok(Json(json!({
        "recipients": recipients.len(),
        "delivered": delivered,
    })))
}

// --- Maintenance ---

/// trigger_sweep
///
/// [Admin Route] Manual trigger of the event completion sweep, identical to
/// one tick of the scheduler. Safe to call while the scheduler runs: the
/// claim semantics make the two invocations partition the overdue events
/// between them.
#[utoipa::path(
    post,
    path = "/admin/sweep",
    responses((status = 200, description = "Sweep report", body = SweepReport))
)]
pub async fn trigger_sweep(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, ApiError> {
    guard::require_admin(&user)?;
    let today = chrono::Utc::now().date_naive();
    let report = lifecycle::run_completion_sweep(&state.repo, &state.notifier, today).await?;
    Ok(Json(report))
}
