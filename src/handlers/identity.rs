use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    guard, lifecycle,
    models::{
        ContactMessageRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, Organizer,
        ProfileResponse, RegisterOrganizerRequest, RegisterVolunteerRequest,
        ResetPasswordRequest, Role, TokenPurpose, UpdateOrganizerProfileRequest, Volunteer,
        VolunteerStatus,
    },
    notifier::Notice,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

// --- Input validation helpers ---

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("a valid email address is required".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("a name is required".to_string()));
    }
    Ok(())
}

// --- Registration ---

/// register_volunteer
///
/// [Public Route] Volunteer signup. The account is created unverified; the
/// verification email is **not** best-effort: if the mail gateway refuses the
/// message the endpoint reports a dependency failure even though the account
/// row has already committed (the client is told to retry via forgot-password
/// style re-verification rather than re-registering).
#[utoipa::path(
    post,
    path = "/auth/volunteers/register",
    request_body = RegisterVolunteerRequest,
    responses(
        (status = 201, description = "Account created, verification mail sent"),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Verification mail could not be sent")
    )
)]
pub async fn register_volunteer(
    State(state): State<AppState>,
    Json(payload): Json<RegisterVolunteerRequest>,
) -> Result<(StatusCode, Json<Volunteer>), ApiError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    validate_name(&payload.name)?;

    // Duplicate email is deliberately a distinguishable error, not a collapsed
    // generic failure.
    if state
        .repo
        .get_volunteer_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("this email is already registered".to_string()));
    }

    let volunteer = Volunteer {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: auth::hash_password(&payload.password)?,
        name: payload.name,
        ..Default::default()
    };
    let created = state.repo.create_volunteer(volunteer).await?;

    let token = state
        .repo
        .issue_one_time_token(Role::Volunteer, created.id, TokenPurpose::VerifyEmail)
        .await?;
    state
        .notifier
        .send(&created.email, Notice::VerifyEmail { token: token.token })
        .await
        .map_err(ApiError::Dependency)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// register_organizer
///
/// [Public Route] Organizer signup. New organizers always start in `Pending`
/// and must both verify their email and pass admin review before they can
/// publish events.
#[utoipa::path(
    post,
    path = "/auth/organizers/register",
    request_body = RegisterOrganizerRequest,
    responses(
        (status = 201, description = "Account created, verification mail sent"),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Verification mail could not be sent")
    )
)]
pub async fn register_organizer(
    State(state): State<AppState>,
    Json(payload): Json<RegisterOrganizerRequest>,
) -> Result<(StatusCode, Json<Organizer>), ApiError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    validate_name(&payload.name)?;

    if state
        .repo
        .get_organizer_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("this email is already registered".to_string()));
    }

    let organizer = Organizer {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: auth::hash_password(&payload.password)?,
        name: payload.name,
        phone: payload.phone,
        ..Default::default()
    };
    let created = state.repo.create_organizer(organizer).await?;

    let token = state
        .repo
        .issue_one_time_token(Role::Organizer, created.id, TokenPurpose::VerifyEmail)
        .await?;
    state
        .notifier
        .send(&created.email, Notice::VerifyEmail { token: token.token })
        .await
        .map_err(ApiError::Dependency)?;

    Ok((StatusCode::CREATED, Json(created)))
}

// --- Email verification ---

/// VerifyEmailParams
#[derive(Deserialize, utoipa::IntoParams)]
pub struct VerifyEmailParams {
    /// The single-use token from the verification mail.
    pub token: Uuid,
}

/// verify_email
///
/// [Public Route] Consumes a verification token and flips the account's
/// `is_verified` flag. Single use: presenting the same token twice fails the
/// second time exactly like an expired one.
#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyEmailParams),
    responses(
        (status = 200, description = "Email verified"),
        (status = 401, description = "Invalid, expired or already-used token")
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailParams>,
) -> Result<Json<Value>, ApiError> {
    let (role, principal_id) = state
        .repo
        .consume_one_time_token(params.token, TokenPurpose::VerifyEmail)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    state.repo.mark_verified(role, principal_id).await?;
    Ok(Json(json!({ "message": "email verified" })))
}

// --- Login ---

/// login_volunteer
///
/// [Public Route] Volunteer login. A soft-deleted account gets its own
/// distinct error *before* the credential compare; unknown email and wrong
/// password collapse into one message.
#[utoipa::path(
    post,
    path = "/auth/volunteers/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = LoginResponse),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Account deleted")
    )
)]
pub async fn login_volunteer(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let volunteer = state
        .repo
        .get_volunteer_by_email(&payload.email)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if volunteer.status == VolunteerStatus::Deleted {
        return Err(ApiError::InactiveAccount(
            "this account has been deleted".to_string(),
        ));
    }
    if !auth::verify_password(&payload.password, &volunteer.password_hash) {
        return Err(ApiError::BadCredentials);
    }

    let token = auth::issue_token(&state.config, Role::Volunteer, volunteer.id, false)?;
    Ok(Json(LoginResponse {
        token,
        role: Role::Volunteer.as_str().to_string(),
    }))
}

/// login_organizer
///
/// [Public Route] Organizer login. Pending and rejected organizers may still
/// log in (they need their profile to resubmit); only the deleted tombstone
/// blocks authentication here. Suspended/deactivated accounts are stopped by
/// the guard at the endpoints that matter.
#[utoipa::path(
    post,
    path = "/auth/organizers/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = LoginResponse),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Account deleted")
    )
)]
pub async fn login_organizer(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let organizer = state
        .repo
        .get_organizer_by_email(&payload.email)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if organizer.status == crate::models::OrganizerStatus::Deleted {
        return Err(ApiError::InactiveAccount(
            "this account has been deleted".to_string(),
        ));
    }
    if !auth::verify_password(&payload.password, &organizer.password_hash) {
        return Err(ApiError::BadCredentials);
    }

    let token = auth::issue_token(&state.config, Role::Organizer, organizer.id, false)?;
    Ok(Json(LoginResponse {
        token,
        role: Role::Organizer.as_str().to_string(),
    }))
}

/// login_admin
///
/// [Public Route] Admin login. The issued token carries the elevated
/// privilege flag that satisfies every downstream role and ownership check.
#[utoipa::path(
    post,
    path = "/auth/admins/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login_admin(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin = state
        .repo
        .get_admin_by_email(&payload.email)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if !auth::verify_password(&payload.password, &admin.password_hash) {
        return Err(ApiError::BadCredentials);
    }

    let token = auth::issue_token(&state.config, Role::Admin, admin.id, true)?;
    Ok(Json(LoginResponse {
        token,
        role: Role::Admin.as_str().to_string(),
    }))
}

// --- Password reset ---

/// forgot_password
///
/// [Public Route] Issues a ten-minute reset token and mails it. The response
/// is the same whether or not the email matched an account, so this endpoint
/// cannot be used to enumerate registrations. Issuing a new token purges any
/// older unconsumed reset token for the principal.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset mail sent when the account exists"))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let principal_id = match payload.role {
        Role::Admin => state
            .repo
            .get_admin_by_email(&payload.email)
            .await?
            .map(|a| a.id),
        Role::Organizer => state
            .repo
            .get_organizer_by_email(&payload.email)
            .await?
            .filter(|o| o.status != crate::models::OrganizerStatus::Deleted)
            .map(|o| o.id),
        Role::Volunteer => state
            .repo
            .get_volunteer_by_email(&payload.email)
            .await?
            .filter(|v| v.status != VolunteerStatus::Deleted)
            .map(|v| v.id),
    };

    if let Some(id) = principal_id {
        let token = state
            .repo
            .issue_one_time_token(payload.role, id, TokenPurpose::ResetPassword)
            .await?;
        if let Err(e) = state
            .notifier
            .send(&payload.email, Notice::ResetPassword { token: token.token })
            .await
        {
            // Swallowed: failing loudly here would leak account existence.
            tracing::warn!("reset mail delivery failed: {e}");
        }
    }

    Ok(Json(json!({
        "message": "if that account exists, a reset link has been sent"
    })))
}

/// reset_password
///
/// [Public Route] Consumes a reset token and stores the re-hashed
/// replacement credential. The token is gone after this call, successful or
/// not past the consumption point.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Invalid, expired or already-used token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_password(&payload.new_password)?;

    let (role, principal_id) = state
        .repo
        .consume_one_time_token(payload.token, TokenPurpose::ResetPassword)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    let hash = auth::hash_password(&payload.new_password)?;
    state.repo.update_password(role, principal_id, &hash).await?;
    Ok(Json(json!({ "message": "password updated" })))
}

// --- Profile ---

/// get_me
///
/// [Authenticated Route] The caller's own profile, shaped per principal
/// kind. Organizers additionally see their moderation status and, while
/// rejected, the stored rejection reason.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = ProfileResponse))
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = match user.role {
        Role::Admin => {
            let admin = state
                .repo
                .get_admin(user.id)
                .await?
                .ok_or(ApiError::InvalidToken)?;
            ProfileResponse {
                id: admin.id,
                email: admin.email,
                role: Role::Admin.as_str().to_string(),
                name: admin.name,
                ..Default::default()
            }
        }
        Role::Organizer => {
            let organizer = guard::organizer_profile_access(&state.repo, &user).await?;
            ProfileResponse {
                id: organizer.id,
                email: organizer.email,
                role: Role::Organizer.as_str().to_string(),
                name: organizer.name,
                status: Some(format!("{:?}", organizer.status).to_lowercase()),
                rejection_reason: organizer.rejection_reason,
                is_verified: Some(organizer.is_verified),
            }
        }
        Role::Volunteer => {
            let volunteer = guard::require_volunteer(&state.repo, &user).await?;
            ProfileResponse {
                id: volunteer.id,
                email: volunteer.email,
                role: Role::Volunteer.as_str().to_string(),
                name: volunteer.name,
                is_verified: Some(volunteer.is_verified),
                ..Default::default()
            }
        }
    };
    Ok(Json(profile))
}

/// update_my_organizer_profile
///
/// [Organizer Route] Partial profile update. When the account is currently
/// `Rejected` this doubles as resubmission: the status flips back to
/// `Pending`, the rejection reason is cleared and the moderation inbox is
/// notified. There is no separate resubmission endpoint.
#[utoipa::path(
    put,
    path = "/me/organizer",
    request_body = UpdateOrganizerProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = Organizer),
        (status = 403, description = "Account suspended, deactivated or deleted")
    )
)]
pub async fn update_my_organizer_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateOrganizerProfileRequest>,
) -> Result<Json<Organizer>, ApiError> {
    let organizer = guard::organizer_profile_access(&state.repo, &user).await?;
    let updated = lifecycle::update_organizer_profile(
        &state.repo,
        &state.notifier,
        &state.config.moderation_email,
        &organizer,
        payload,
    )
    .await?;
    Ok(Json(updated))
}

// --- Contact form ---

/// contact
///
/// [Public Route] Relays a contact-form message to the moderation inbox.
/// Unlike the lifecycle side-channel notices this relay is **not**
/// best-effort: the whole point of the endpoint is delivery, so a gateway
/// failure surfaces as a dependency error.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactMessageRequest,
    responses(
        (status = 200, description = "Message relayed"),
        (status = 502, description = "Mail gateway failure")
    )
)]
pub async fn contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_email(&payload.sender_email)?;
    if payload.subject.trim().is_empty() || payload.body.trim().is_empty() {
        return Err(ApiError::Validation("subject and body are required".to_string()));
    }

    state
        .notifier
        .send(
            &state.config.moderation_email,
            Notice::ContactMessage {
                sender_email: payload.sender_email,
                subject: payload.subject,
                body: payload.body,
            },
        )
        .await
        .map_err(ApiError::Dependency)?;

    Ok(Json(json!({ "message": "your message has been sent" })))
}
