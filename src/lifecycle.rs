//! The entity lifecycle engine: every state transition in the system goes
//! through one of these functions. Each transition validates the current
//! state, performs the write through the repository, and owns its
//! notification side effects, so handlers stay thin and no transition can be
//! reproduced ad hoc elsewhere.

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{
        Article, CancellationOutcome, Event, Organizer, OrganizerStatus, RegistrationOutcome,
        Role, SweepReport, UpdateOrganizerProfileRequest, Volunteer,
    },
    notifier::{Notice, NotifierState},
    repository::RepositoryState,
};
use chrono::NaiveDate;
use uuid::Uuid;

/// best_effort
///
/// Side-channel notices must never fail the transition that triggered them:
/// delivery failures are logged and swallowed.
fn best_effort(result: Result<(), String>, context: &str) {
    if let Err(e) = result {
        tracing::warn!("notification failed ({context}): {e}");
    }
}

fn fetch_live_organizer(organizer: Option<Organizer>) -> Result<Organizer, ApiError> {
    let organizer =
        organizer.ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;
    if organizer.status == OrganizerStatus::Deleted {
        return Err(ApiError::NotFound("organizer not found".to_string()));
    }
    Ok(organizer)
}

// --- Organizer approval state machine ---

/// approve_organizer
///
/// `Pending` -> `Approved`. Refused while the organizer has not verified
/// their email; the message is surfaced verbatim to the admin UI.
pub async fn approve_organizer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
) -> Result<Organizer, ApiError> {
    let organizer = fetch_live_organizer(repo.get_organizer(id).await?)?;

    if organizer.status != OrganizerStatus::Pending {
        return Err(ApiError::State(format!(
            "cannot approve an organizer in the {:?} state",
            organizer.status
        )));
    }
    if !organizer.is_verified {
        return Err(ApiError::State(
            "Gagal. Organizer ini belum memverifikasi emailnya.".to_string(),
        ));
    }

    let updated = repo
        .set_organizer_status(id, OrganizerStatus::Approved, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;

    best_effort(
        notifier.send(&updated.email, Notice::OrganizerApproved).await,
        "organizer approved",
    );
    Ok(updated)
}

/// reject_organizer
///
/// `Pending` -> `Rejected`. The reason is mandatory: it is persisted on the
/// account, shown to the organizer on their profile, and carried in the
/// notification.
pub async fn reject_organizer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
    reason: Option<String>,
) -> Result<Organizer, ApiError> {
    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("a rejection reason is required".to_string()))?;

    let organizer = fetch_live_organizer(repo.get_organizer(id).await?)?;
    if organizer.status != OrganizerStatus::Pending {
        return Err(ApiError::State(format!(
            "cannot reject an organizer in the {:?} state",
            organizer.status
        )));
    }

    let updated = repo
        .set_organizer_status(id, OrganizerStatus::Rejected, Some(reason.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;

    best_effort(
        notifier
            .send(&updated.email, Notice::OrganizerRejected { reason })
            .await,
        "organizer rejected",
    );
    Ok(updated)
}

/// suspend_organizer
///
/// Admin action, permitted from any live state.
pub async fn suspend_organizer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
) -> Result<Organizer, ApiError> {
    let _ = fetch_live_organizer(repo.get_organizer(id).await?)?;
    let updated = repo
        .set_organizer_status(id, OrganizerStatus::Suspended, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;
    best_effort(
        notifier
            .send(&updated.email, Notice::OrganizerSuspended)
            .await,
        "organizer suspended",
    );
    Ok(updated)
}

/// deactivate_organizer
pub async fn deactivate_organizer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
) -> Result<Organizer, ApiError> {
    let _ = fetch_live_organizer(repo.get_organizer(id).await?)?;
    let updated = repo
        .set_organizer_status(id, OrganizerStatus::Deactivated, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;
    best_effort(
        notifier
            .send(&updated.email, Notice::OrganizerDeactivated)
            .await,
        "organizer deactivated",
    );
    Ok(updated)
}

/// soft_delete_organizer
///
/// Terminal transition. The reason is mandatory and stored with the
/// tombstone; the account disappears from listings and can no longer log in.
pub async fn soft_delete_organizer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
    reason: Option<String>,
) -> Result<(), ApiError> {
    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("a deletion reason is required".to_string()))?;

    let organizer = fetch_live_organizer(repo.get_organizer(id).await?)?;
    repo.set_organizer_status(id, OrganizerStatus::Deleted, Some(reason.clone()))
        .await?;

    best_effort(
        notifier
            .send(&organizer.email, Notice::AccountDeleted { reason })
            .await,
        "organizer deleted",
    );
    Ok(())
}

/// soft_delete_volunteer
pub async fn soft_delete_volunteer(
    repo: &RepositoryState,
    notifier: &NotifierState,
    id: Uuid,
    reason: Option<String>,
) -> Result<(), ApiError> {
    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("a deletion reason is required".to_string()))?;

    let volunteer = repo
        .get_volunteer(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("volunteer not found".to_string()))?;
    let deleted = repo.soft_delete_volunteer(id, &reason).await?;
    if !deleted {
        return Err(ApiError::NotFound("volunteer not found".to_string()));
    }

    best_effort(
        notifier
            .send(&volunteer.email, Notice::AccountDeleted { reason })
            .await,
        "volunteer deleted",
    );
    Ok(())
}

/// update_organizer_profile
///
/// Profile edit with the resubmission side effect: when the account is
/// currently `Rejected`, the same write flips it back to `Pending`, clears
/// the stored rejection reason, and pings the moderation inbox. There is no
/// separate resubmission verb.
pub async fn update_organizer_profile(
    repo: &RepositoryState,
    notifier: &NotifierState,
    moderation_email: &str,
    organizer: &Organizer,
    req: UpdateOrganizerProfileRequest,
) -> Result<Organizer, ApiError> {
    let resubmission = organizer.status == OrganizerStatus::Rejected;

    let updated = repo
        .update_organizer_profile(organizer.id, req, resubmission)
        .await?
        .ok_or_else(|| ApiError::NotFound("organizer not found".to_string()))?;

    if resubmission {
        best_effort(
            notifier
                .send(
                    moderation_email,
                    Notice::ResubmissionReceived {
                        organizer_name: updated.name.clone(),
                        organizer_email: updated.email.clone(),
                    },
                )
                .await,
            "organizer resubmission",
        );
    }
    Ok(updated)
}

// --- Content soft deletion ---

/// soft_delete_article
///
/// One-way tombstone. An owner deleting their own article is silent. An
/// admin deleting someone else's must give a reason, which is mailed to the
/// resolved author; the notice is suppressed when the deleting admin happens
/// to be the author themselves.
pub async fn soft_delete_article(
    repo: &RepositoryState,
    notifier: &NotifierState,
    user: &AuthUser,
    article: &Article,
    reason: Option<String>,
) -> Result<(), ApiError> {
    let author = repo.get_author(article.author_id).await?;
    let author_principal = author.as_ref().and_then(|a| a.principal());
    let caller_is_author = author_principal == Some((user.role, user.id));

    let notify_reason = if user.admin_override && !caller_is_author {
        Some(
            reason
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::Validation("a reason is required to remove another author's content".to_string())
                })?,
        )
    } else {
        None
    };

    let deleted = repo.soft_delete_article(article.id).await?;
    if !deleted {
        return Err(ApiError::NotFound("article not found".to_string()));
    }

    if let Some(reason) = notify_reason {
        if let Some(email) = repo.get_author_email(article.author_id).await? {
            best_effort(
                notifier
                    .send(
                        &email,
                        Notice::ContentRemoved {
                            title: article.title.clone(),
                            reason,
                        },
                    )
                    .await,
                "article removed by admin",
            );
        }
    }
    Ok(())
}

/// soft_delete_event
///
/// Same ownership rules as articles, plus the cascade: every registered
/// volunteer gets a cancellation notice carrying the supplied reason, when
/// one was given. The notices go out before the tombstone lands so the
/// registration list is still readable.
pub async fn soft_delete_event(
    repo: &RepositoryState,
    notifier: &NotifierState,
    user: &AuthUser,
    event: &Event,
    reason: Option<String>,
) -> Result<(), ApiError> {
    let caller_is_owner = user.role == Role::Organizer && event.organizer_id == user.id;
    let reason = reason.filter(|r| !r.trim().is_empty());

    let admin_removal = user.admin_override && !caller_is_owner;
    if admin_removal && reason.is_none() {
        return Err(ApiError::Validation(
            "a reason is required to remove another organizer's event".to_string(),
        ));
    }

    let registrations = repo.list_event_registrations(event.id).await?;
    for entry in &registrations {
        best_effort(
            notifier
                .send(
                    &entry.volunteer_email,
                    Notice::EventCancelled {
                        event_title: event.title.clone(),
                        reason: reason.clone(),
                    },
                )
                .await,
            "event cancellation",
        );
    }

    let deleted = repo.soft_delete_event(event.id).await?;
    if !deleted {
        return Err(ApiError::NotFound("event not found".to_string()));
    }

    if let Some(reason) = reason.filter(|_| admin_removal) {
        if let Some(organizer) = repo.get_organizer(event.organizer_id).await? {
            best_effort(
                notifier
                    .send(
                        &organizer.email,
                        Notice::ContentRemoved {
                            title: event.title.clone(),
                            reason,
                        },
                    )
                    .await,
                "event removed by admin",
            );
        }
    }
    Ok(())
}

// --- Registration & capacity ---

/// register_for_event
///
/// Maps the repository's transactional outcome onto the error taxonomy. The
/// heads-up to the organizer is sent only after the transaction committed
/// and is strictly best-effort.
pub async fn register_for_event(
    repo: &RepositoryState,
    notifier: &NotifierState,
    volunteer: &Volunteer,
    event_id: Uuid,
) -> Result<Event, ApiError> {
    let event = match repo.register_volunteer(event_id, volunteer.id).await? {
        RegistrationOutcome::Registered(event) => event,
        RegistrationOutcome::EventNotFound => {
            return Err(ApiError::NotFound("event not found".to_string()));
        }
        RegistrationOutcome::RegistrationClosed => {
            return Err(ApiError::State(
                "registration is closed for this event".to_string(),
            ));
        }
        RegistrationOutcome::EventFull => {
            return Err(ApiError::Conflict("this event is at full capacity".to_string()));
        }
        RegistrationOutcome::AlreadyRegistered => {
            return Err(ApiError::Conflict(
                "you are already registered for this event".to_string(),
            ));
        }
    };

    if let Some(organizer) = repo.get_organizer(event.organizer_id).await? {
        best_effort(
            notifier
                .send(
                    &organizer.email,
                    Notice::NewRegistration {
                        event_title: event.title.clone(),
                        volunteer_name: volunteer.name.clone(),
                    },
                )
                .await,
            "new registration",
        );
    }
    Ok(event)
}

/// cancel_event_registration
///
/// Frees the slot inside the repository transaction, then tells the
/// organizer. As with registration, the heads-up is best-effort and goes out
/// only after the commit.
pub async fn cancel_event_registration(
    repo: &RepositoryState,
    notifier: &NotifierState,
    volunteer: &Volunteer,
    event_id: Uuid,
) -> Result<Event, ApiError> {
    let event = match repo.cancel_registration(event_id, volunteer.id).await? {
        CancellationOutcome::Cancelled(event) => event,
        CancellationOutcome::EventNotFound => {
            return Err(ApiError::NotFound("event not found".to_string()));
        }
        CancellationOutcome::NotRegistered => {
            return Err(ApiError::NotFound(
                "you are not registered for this event".to_string(),
            ));
        }
    };

    if let Some(organizer) = repo.get_organizer(event.organizer_id).await? {
        best_effort(
            notifier
                .send(
                    &organizer.email,
                    Notice::RegistrationCancelled {
                        event_title: event.title.clone(),
                        volunteer_name: volunteer.name.clone(),
                    },
                )
                .await,
            "registration cancelled",
        );
    }
    Ok(event)
}

// --- Completion sweep ---

/// run_completion_sweep
///
/// Transitions every overdue upcoming event to `Completed` and thanks each
/// participant. The repository's claim semantics guarantee that two
/// concurrent sweeps never see the same event, so no participant is thanked
/// twice.
pub async fn run_completion_sweep(
    repo: &RepositoryState,
    notifier: &NotifierState,
    today: NaiveDate,
) -> Result<SweepReport, ApiError> {
    let completed = repo.claim_completed_events(today).await?;

    let mut thank_you_notices = 0usize;
    for event in &completed {
        let registrations = repo.list_event_registrations(event.id).await?;
        for entry in &registrations {
            best_effort(
                notifier
                    .send(
                        &entry.volunteer_email,
                        Notice::EventThankYou {
                            event_title: event.title.clone(),
                        },
                    )
                    .await,
                "event thank-you",
            );
            thank_you_notices += 1;
        }
    }

    if !completed.is_empty() {
        tracing::info!(
            events = completed.len(),
            notices = thank_you_notices,
            "completion sweep transitioned events"
        );
    }

    Ok(SweepReport {
        events_completed: completed.len(),
        thank_you_notices,
    })
}
