//! The authorization guard: every check an endpoint applies after the token
//! extractor has established *who* is calling. Checks compose in a fixed
//! order (role, then live account status, then ownership), and the admin
//! override satisfies role and ownership checks but never substitutes for an
//! account-status check on someone else's account.

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Article, Event, Organizer, OrganizerStatus, Role, Volunteer, VolunteerStatus},
    repository::RepositoryState,
};
use uuid::Uuid;

/// require_role
///
/// Passes when the caller carries the required principal kind, or carries the
/// admin override.
pub fn require_role(user: &AuthUser, role: Role) -> Result<(), ApiError> {
    if user.admin_override || user.role == role {
        Ok(())
    } else {
        Err(ApiError::WrongRole(role.as_str()))
    }
}

/// require_admin
///
/// Admin-only endpoints. The override flag is authoritative; it is only ever
/// set on tokens minted for an admin login.
pub fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.admin_override {
        Ok(())
    } else {
        Err(ApiError::WrongRole("admin"))
    }
}

/// require_volunteer
///
/// Volunteer-only endpoints (bookmarks, event registration). Re-fetches the
/// account so a soft-deleted volunteer with a still-valid token is refused.
pub async fn require_volunteer(
    repo: &RepositoryState,
    user: &AuthUser,
) -> Result<Volunteer, ApiError> {
    if user.role != Role::Volunteer {
        return Err(ApiError::WrongRole("volunteer"));
    }
    let volunteer = repo
        .get_volunteer(user.id)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    if volunteer.status == VolunteerStatus::Deleted {
        return Err(ApiError::InactiveAccount(
            "this account has been deleted".to_string(),
        ));
    }
    Ok(volunteer)
}

/// require_active_organizer
///
/// The gate for privileged organizer actions (creating and managing events).
/// Only a currently `Approved` organizer passes; the status is read live, so
/// a suspension takes effect immediately regardless of token age.
pub async fn require_active_organizer(
    repo: &RepositoryState,
    user: &AuthUser,
) -> Result<Organizer, ApiError> {
    if user.role != Role::Organizer {
        return Err(ApiError::WrongRole("organizer"));
    }
    let organizer = repo
        .get_organizer(user.id)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    match organizer.status {
        OrganizerStatus::Approved => Ok(organizer),
        OrganizerStatus::Pending => Err(ApiError::InactiveAccount(
            "this account is awaiting approval".to_string(),
        )),
        OrganizerStatus::Rejected => Err(ApiError::InactiveAccount(
            "this account's application was rejected".to_string(),
        )),
        OrganizerStatus::Suspended => Err(ApiError::InactiveAccount(
            "this account is suspended".to_string(),
        )),
        OrganizerStatus::Deactivated => Err(ApiError::InactiveAccount(
            "this account is deactivated".to_string(),
        )),
        OrganizerStatus::Deleted => Err(ApiError::InactiveAccount(
            "this account has been deleted".to_string(),
        )),
    }
}

/// organizer_profile_access
///
/// The weaker organizer gate used by the own-profile endpoints. `Pending` and
/// `Rejected` organizers must still reach their profile (resubmission happens
/// through it); `Suspended`, `Deactivated` and `Deleted` accounts must not.
pub async fn organizer_profile_access(
    repo: &RepositoryState,
    user: &AuthUser,
) -> Result<Organizer, ApiError> {
    if user.role != Role::Organizer {
        return Err(ApiError::WrongRole("organizer"));
    }
    let organizer = repo
        .get_organizer(user.id)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    match organizer.status {
        OrganizerStatus::Pending | OrganizerStatus::Rejected | OrganizerStatus::Approved => {
            Ok(organizer)
        }
        OrganizerStatus::Suspended => Err(ApiError::InactiveAccount(
            "this account is suspended".to_string(),
        )),
        OrganizerStatus::Deactivated => Err(ApiError::InactiveAccount(
            "this account is deactivated".to_string(),
        )),
        OrganizerStatus::Deleted => Err(ApiError::InactiveAccount(
            "this account has been deleted".to_string(),
        )),
    }
}

/// require_article_owner
///
/// Ownership check for article mutation. Resolves the article's `Author` row
/// back to its principal and compares it with the caller. The admin override
/// passes without resolution; existence is checked first so a missing article
/// reads as 404 for everyone, owner or not.
pub async fn require_article_owner(
    repo: &RepositoryState,
    user: &AuthUser,
    article_id: Uuid,
) -> Result<Article, ApiError> {
    let article = repo
        .get_article(article_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;

    if user.admin_override {
        return Ok(article);
    }

    let author = repo
        .get_author(article.author_id)
        .await?
        .ok_or(ApiError::NotOwner)?;
    match author.principal() {
        Some((role, id)) if role == user.role && id == user.id => Ok(article),
        _ => Err(ApiError::NotOwner),
    }
}

/// require_event_owner
///
/// Ownership check for event mutation and for the participant listing. Events
/// hang off the organizer directly, so this is a plain id comparison.
pub async fn require_event_owner(
    repo: &RepositoryState,
    user: &AuthUser,
    event_id: Uuid,
) -> Result<Event, ApiError> {
    let event = repo
        .get_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;

    if user.admin_override {
        return Ok(event);
    }
    if user.role == Role::Organizer && event.organizer_id == user.id {
        Ok(event)
    } else {
        Err(ApiError::NotOwner)
    }
}
