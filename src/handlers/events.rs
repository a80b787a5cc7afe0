use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    guard, lifecycle,
    models::{
        AddGalleryImageRequest, CreateEventRequest, Event, GalleryImage, OrganizerStatus,
        ReasonRequest, RegistrationEntry, UpdateEventRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;
use uuid::Uuid;

/// EventFilter
///
/// Accepted query parameters of the public event listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct EventFilter {
    pub category_id: Option<Uuid>,
    /// Case-insensitive search across title and location.
    pub search: Option<String>,
}

/// mutate_gate
///
/// Organizer event mutation is double-gated: the account must be currently
/// approved *and* own the event. Admins skip the account gate, the ownership
/// gate passes them through the override.
async fn mutate_gate(
    state: &AppState,
    user: &AuthUser,
    event_id: Uuid,
) -> Result<Event, ApiError> {
    if !user.admin_override {
        guard::require_active_organizer(&state.repo, user).await?;
    }
    guard::require_event_owner(&state.repo, user, event_id).await
}

// --- Public reads ---

/// list_events
///
/// [Public Route] Upcoming events of currently approved organizers. An
/// organizer's suspension instantly hides their events from this listing
/// without touching the event rows.
#[utoipa::path(
    get,
    path = "/events",
    params(EventFilter),
    responses((status = 200, description = "Upcoming events", body = [Event]))
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state
        .repo
        .list_public_events(filter.category_id, filter.search)
        .await?;
    Ok(Json(events))
}

/// get_event_details
///
/// [Public Route] Single event detail. Deleted events and events of
/// non-approved organizers read as 404.
#[utoipa::path(
    get,
    path = "/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Event),
        (status = 404, description = "Absent, deleted, or organizer not approved")
    )
)]
pub async fn get_event_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;

    let organizer_approved = state
        .repo
        .get_organizer(event.organizer_id)
        .await?
        .map(|o| o.status == OrganizerStatus::Approved)
        .unwrap_or(false);
    if !organizer_approved {
        return Err(ApiError::NotFound("event not found".to_string()));
    }
    Ok(Json(event))
}

// --- Organizer CRUD ---

/// create_event
///
/// [Organizer Route] Only a currently approved organizer may publish events.
/// New events start `Upcoming` with zero participants.
#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Created", body = Event),
        (status = 403, description = "Organizer not approved")
    )
)]
pub async fn create_event(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let organizer = guard::require_active_organizer(&state.repo, &user).await?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("a title is required".to_string()));
    }
    if payload.max_participants <= 0 {
        return Err(ApiError::Validation(
            "max_participants must be positive".to_string(),
        ));
    }
    if state.repo.get_category(payload.category_id).await?.is_none() {
        return Err(ApiError::Validation("unknown category".to_string()));
    }

    let event = state.repo.create_event(organizer.id, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// list_my_events
///
/// [Organizer Route] The caller's own events, all statuses.
#[utoipa::path(
    get,
    path = "/me/events",
    responses((status = 200, description = "Own events", body = [Event]))
)]
pub async fn list_my_events(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let organizer = guard::require_active_organizer(&state.repo, &user).await?;
    let events = state.repo.list_events_by_organizer(organizer.id).await?;
    Ok(Json(events))
}

/// update_event
///
/// [Organizer Route] Partial update, owner or admin. Shrinking
/// `max_participants` below the current registration count is refused so the
/// capacity invariant keeps holding.
#[utoipa::path(
    put,
    path = "/events/{id}",
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated", body = Event),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = mutate_gate(&state, &user, id).await?;

    if let Some(max) = payload.max_participants {
        if max < event.current_participants {
            return Err(ApiError::Conflict(format!(
                "{} volunteers are already registered; capacity cannot drop below that",
                event.current_participants
            )));
        }
    }
    if let Some(category_id) = payload.category_id {
        if state.repo.get_category(category_id).await?.is_none() {
            return Err(ApiError::Validation("unknown category".to_string()));
        }
    }

    let updated = state
        .repo
        .update_event(id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    Ok(Json(updated))
}

/// delete_event
///
/// [Organizer Route] One-way soft delete with cascade: every registered
/// volunteer is sent a cancellation notice before the tombstone lands. An
/// admin removing someone else's event must supply a reason.
#[utoipa::path(
    delete,
    path = "/events/{id}",
    request_body = ReasonRequest,
    responses(
        (status = 204, description = "Deleted, cancellations sent"),
        (status = 400, description = "Admin removal without a reason"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> Result<StatusCode, ApiError> {
    let event = mutate_gate(&state, &user, id).await?;
    let reason = payload.and_then(|Json(r)| r.reason);
    lifecycle::soft_delete_event(&state.repo, &state.notifier, &user, &event, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_event_registrations
///
/// [Organizer Route] Participant listing, restricted to the owning organizer
/// (or an admin).
#[utoipa::path(
    get,
    path = "/events/{id}/registrations",
    responses(
        (status = 200, description = "Registered volunteers", body = [RegistrationEntry]),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn list_event_registrations(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RegistrationEntry>>, ApiError> {
    guard::require_event_owner(&state.repo, &user, id).await?;
    let registrations = state.repo.list_event_registrations(id).await?;
    Ok(Json(registrations))
}

// --- Volunteer registration ---

/// register_for_event
///
/// [Volunteer Route] Atomic registration against the capacity counter.
/// Closed events conflict as a state error, full events and duplicates as
/// plain conflicts; the organizer gets a best-effort heads-up after commit.
#[utoipa::path(
    post,
    path = "/events/{id}/register",
    responses(
        (status = 201, description = "Registered", body = Event),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Closed, full, or already registered")
    )
)]
pub async fn register_for_event(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let volunteer = guard::require_volunteer(&state.repo, &user).await?;
    let event =
        lifecycle::register_for_event(&state.repo, &state.notifier, &volunteer, id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// cancel_registration
///
/// [Volunteer Route] Frees the caller's slot. Registering again afterwards
/// is allowed.
#[utoipa::path(
    delete,
    path = "/events/{id}/register",
    responses(
        (status = 200, description = "Cancelled", body = Event),
        (status = 404, description = "Event not found or not registered")
    )
)]
pub async fn cancel_registration(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let volunteer = guard::require_volunteer(&state.repo, &user).await?;
    let event =
        lifecycle::cancel_event_registration(&state.repo, &state.notifier, &volunteer, id).await?;
    Ok(Json(event))
}

// --- Event gallery ---

/// add_event_gallery_image
///
/// [Organizer Route] Uploads an image (base64 payload) to the blob store and
/// attaches it to the event.
#[utoipa::path(
    post,
    path = "/events/{id}/gallery",
    request_body = AddGalleryImageRequest,
    responses(
        (status = 201, description = "Stored", body = GalleryImage),
        (status = 502, description = "Blob store failure")
    )
)]
pub async fn add_event_gallery_image(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddGalleryImageRequest>,
) -> Result<(StatusCode, Json<GalleryImage>), ApiError> {
    mutate_gate(&state, &user, id).await?;

    let bytes = BASE64
        .decode(payload.data_base64.as_bytes())
        .map_err(|_| ApiError::Validation("image payload is not valid base64".to_string()))?;
    let key = state
        .storage
        .put(bytes, &payload.filename)
        .await
        .map_err(ApiError::Dependency)?;

    let image = state.repo.add_gallery_image(None, Some(id), &key).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// list_event_gallery
///
/// [Public Route] Gallery of an event.
#[utoipa::path(
    get,
    path = "/events/{id}/gallery",
    responses((status = 200, description = "Gallery images", body = [GalleryImage]))
)]
pub async fn list_event_gallery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GalleryImage>>, ApiError> {
    state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    let images = state.repo.list_event_gallery(id).await?;
    Ok(Json(images))
}

/// delete_event_gallery_image
///
/// [Organizer Route] Removes the row, then issues the idempotent blob
/// delete.
#[utoipa::path(
    delete,
    path = "/events/{id}/gallery/{image_id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_event_gallery_image(
    user: AuthUser,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    mutate_gate(&state, &user, id).await?;

    let image = state
        .repo
        .get_gallery_image(image_id)
        .await?
        .filter(|img| img.event_id == Some(id))
        .ok_or_else(|| ApiError::NotFound("gallery image not found".to_string()))?;

    state.repo.delete_gallery_image(image.id).await?;
    if let Err(e) = state.storage.delete(&image.path).await {
        tracing::warn!("blob delete failed for {}: {e}", image.path);
    }
    Ok(StatusCode::NO_CONTENT)
}
