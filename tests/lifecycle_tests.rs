mod common;

use common::test_backends;
use relawan_portal::{
    ApiError,
    auth::AuthUser,
    lifecycle,
    models::{
        CategoryKind, ContentStatus, EventStatus, OrganizerStatus, Role,
        UpdateOrganizerProfileRequest,
    },
    notifier::Notice,
};
use uuid::Uuid;

fn admin_user() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        role: Role::Admin,
        admin_override: true,
    }
}

// --- Organizer approval state machine ---

#[tokio::test]
async fn approving_unverified_organizer_is_refused() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, false);

    let result = lifecycle::approve_organizer(&repo, &notifier, organizer.id).await;

    match result {
        Err(ApiError::State(msg)) => assert!(msg.contains("memverifikasi")),
        other => panic!("expected state error, got {other:?}"),
    }
    // No notification goes out for a refused transition.
    assert!(rec.recorded().is_empty());
    let unchanged = repo.get_organizer(organizer.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, OrganizerStatus::Pending);
}

#[tokio::test]
async fn approving_verified_pending_organizer_succeeds_with_one_notice() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, true);

    let approved = lifecycle::approve_organizer(&repo, &notifier, organizer.id)
        .await
        .unwrap();

    assert_eq!(approved.status, OrganizerStatus::Approved);
    assert!(approved.approved_at.is_some());
    let sent = rec.recorded();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "org@example.com");
    assert_eq!(sent[0].1, Notice::OrganizerApproved);
}

#[tokio::test]
async fn approving_non_pending_organizer_is_a_state_error() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);

    let result = lifecycle::approve_organizer(&repo, &notifier, organizer.id).await;
    assert!(matches!(result, Err(ApiError::State(_))));
}

#[tokio::test]
async fn rejecting_without_reason_is_a_validation_error() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, true);

    let missing = lifecycle::reject_organizer(&repo, &notifier, organizer.id, None).await;
    assert!(matches!(missing, Err(ApiError::Validation(_))));

    let blank =
        lifecycle::reject_organizer(&repo, &notifier, organizer.id, Some("   ".to_string()))
            .await;
    assert!(matches!(blank, Err(ApiError::Validation(_))));
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn rejection_persists_the_reason_and_notifies() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, true);

    let rejected = lifecycle::reject_organizer(
        &repo,
        &notifier,
        organizer.id,
        Some("incomplete registration documents".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(rejected.status, OrganizerStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("incomplete registration documents")
    );
    let sent = rec.recorded();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0].1, Notice::OrganizerRejected { .. }));
}

#[tokio::test]
async fn profile_update_while_rejected_resubmits_and_pings_moderation() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, true);
    lifecycle::reject_organizer(&repo, &notifier, organizer.id, Some("too vague".to_string()))
        .await
        .unwrap();
    let rejected = repo.get_organizer(organizer.id).await.unwrap().unwrap();

    let updated = lifecycle::update_organizer_profile(
        &repo,
        &notifier,
        "moderation@relawan.test",
        &rejected,
        UpdateOrganizerProfileRequest {
            name: Some("Yayasan Hijau".to_string()),
            phone: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.status, OrganizerStatus::Pending);
    assert!(updated.rejection_reason.is_none());
    assert_eq!(updated.name, "Yayasan Hijau");

    let sent = rec.recorded();
    // One rejection notice to the organizer, one resubmission ping to the
    // moderation inbox.
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].0, "moderation@relawan.test");
    assert!(matches!(sent[1].1, Notice::ResubmissionReceived { .. }));
}

#[tokio::test]
async fn profile_update_while_approved_does_not_ping_moderation() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);

    let updated = lifecycle::update_organizer_profile(
        &repo,
        &notifier,
        "moderation@relawan.test",
        &organizer,
        UpdateOrganizerProfileRequest {
            name: None,
            phone: Some("+62-811-000".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.status, OrganizerStatus::Approved);
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn organizer_soft_delete_requires_a_reason_and_is_terminal() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);

    let missing = lifecycle::soft_delete_organizer(&repo, &notifier, organizer.id, None).await;
    assert!(matches!(missing, Err(ApiError::Validation(_))));

    lifecycle::soft_delete_organizer(
        &repo,
        &notifier,
        organizer.id,
        Some("repeated policy violations".to_string()),
    )
    .await
    .unwrap();

    let stored = repo.get_organizer(organizer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrganizerStatus::Deleted);
    assert_eq!(
        stored.deleted_reason.as_deref(),
        Some("repeated policy violations")
    );
    // Gone from the default listing.
    let listed = repo.list_organizers(None).await.unwrap();
    assert!(listed.iter().all(|o| o.id != organizer.id));
    assert_eq!(rec.recorded().len(), 1);
}

// --- Content soft deletion ---

#[tokio::test]
async fn owner_deleting_their_own_article_is_silent() {
    let (mem, repo, rec, notifier) = test_backends();
    let volunteer = mem.seed_volunteer("vol@example.com");
    let category = mem.seed_category("Environment", CategoryKind::Article);
    let author_id = mem.author_id_for(Role::Volunteer, volunteer.id);
    let article = mem.seed_article(author_id, category.id, ContentStatus::Publish);

    let owner = AuthUser {
        id: volunteer.id,
        role: Role::Volunteer,
        admin_override: false,
    };
    lifecycle::soft_delete_article(&repo, &notifier, &owner, &article, None)
        .await
        .unwrap();

    assert!(repo.get_article(article.id).await.unwrap().is_none());
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn admin_deleting_foreign_article_needs_reason_and_notifies_author_once() {
    let (mem, repo, rec, notifier) = test_backends();
    let volunteer = mem.seed_volunteer("vol@example.com");
    let category = mem.seed_category("Environment", CategoryKind::Article);
    let author_id = mem.author_id_for(Role::Volunteer, volunteer.id);
    let article = mem.seed_article(author_id, category.id, ContentStatus::Publish);
    let admin = admin_user();

    let missing =
        lifecycle::soft_delete_article(&repo, &notifier, &admin, &article, None).await;
    assert!(matches!(missing, Err(ApiError::Validation(_))));
    // The refused attempt must not tombstone anything.
    assert!(repo.get_article(article.id).await.unwrap().is_some());

    lifecycle::soft_delete_article(
        &repo,
        &notifier,
        &admin,
        &article,
        Some("violates content policy".to_string()),
    )
    .await
    .unwrap();

    let sent = rec.recorded();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "vol@example.com");
    assert!(matches!(sent[0].1, Notice::ContentRemoved { .. }));
}

#[tokio::test]
async fn admin_deleting_their_own_article_sends_no_notice() {
    let (mem, repo, rec, notifier) = test_backends();
    let admin_row = mem.seed_admin("admin@example.com");
    let category = mem.seed_category("Announcements", CategoryKind::Article);
    let author_id = mem.author_id_for(Role::Admin, admin_row.id);
    let article = mem.seed_article(author_id, category.id, ContentStatus::Draft);

    let caller = AuthUser {
        id: admin_row.id,
        role: Role::Admin,
        admin_override: true,
    };
    lifecycle::soft_delete_article(&repo, &notifier, &caller, &article, None)
        .await
        .unwrap();

    assert!(repo.get_article(article.id).await.unwrap().is_none());
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn event_deletion_cascades_one_cancellation_per_registration() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 10, today, EventStatus::Upcoming);

    let v1 = mem.seed_volunteer("a@example.com");
    let v2 = mem.seed_volunteer("b@example.com");
    repo.register_volunteer(event.id, v1.id).await.unwrap();
    repo.register_volunteer(event.id, v2.id).await.unwrap();

    let owner = AuthUser {
        id: organizer.id,
        role: Role::Organizer,
        admin_override: false,
    };
    lifecycle::soft_delete_event(&repo, &notifier, &owner, &event, None)
        .await
        .unwrap();

    assert!(repo.get_event(event.id).await.unwrap().is_none());
    let cancellations: Vec<_> = rec
        .recorded()
        .into_iter()
        .filter(|(_, n)| matches!(n, Notice::EventCancelled { .. }))
        .collect();
    assert_eq!(cancellations.len(), 2);
}

#[tokio::test]
async fn admin_event_removal_reason_reaches_every_registrant() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 10, today, EventStatus::Upcoming);

    let v1 = mem.seed_volunteer("a@example.com");
    let v2 = mem.seed_volunteer("b@example.com");
    repo.register_volunteer(event.id, v1.id).await.unwrap();
    repo.register_volunteer(event.id, v2.id).await.unwrap();

    lifecycle::soft_delete_event(
        &repo,
        &notifier,
        &admin_user(),
        &event,
        Some("venue flooded".to_string()),
    )
    .await
    .unwrap();

    let cancellations: Vec<_> = rec
        .recorded()
        .into_iter()
        .filter_map(|(_, n)| match n {
            Notice::EventCancelled { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(cancellations.len(), 2);
    for reason in cancellations {
        assert_eq!(reason.as_deref(), Some("venue flooded"));
    }

    // The owning organizer is told why their event was removed.
    let removal: Vec<_> = rec
        .recorded()
        .into_iter()
        .filter(|(to, n)| to == "org@example.com" && matches!(n, Notice::ContentRemoved { .. }))
        .collect();
    assert_eq!(removal.len(), 1);
}

// --- Registration & capacity ---

#[tokio::test]
async fn last_slot_goes_to_exactly_one_volunteer() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 1, today, EventStatus::Upcoming);

    let v1 = mem.seed_volunteer("a@example.com");
    let v2 = mem.seed_volunteer("b@example.com");

    let first = lifecycle::register_for_event(&repo, &notifier, &v1, event.id)
        .await
        .unwrap();
    assert_eq!(first.current_participants, 1);

    let second = lifecycle::register_for_event(&repo, &notifier, &v2, event.id).await;
    assert!(matches!(second, Err(ApiError::Conflict(_))));

    let stored = repo.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.current_participants, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_registrations_never_oversell_the_last_slot() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 1, today, EventStatus::Upcoming);

    let v1 = mem.seed_volunteer("a@example.com");
    let v2 = mem.seed_volunteer("b@example.com");

    let task = |volunteer| {
        let repo = repo.clone();
        let notifier = notifier.clone();
        let event_id = event.id;
        tokio::spawn(async move {
            lifecycle::register_for_event(&repo, &notifier, &volunteer, event_id).await
        })
    };
    let first = task(v1);
    let second = task(v2);

    let results = [first.await.unwrap(), second.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one registration may claim the last slot");
    let loss = results.into_iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(loss, Err(ApiError::Conflict(_))));

    let stored = repo.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.current_participants, 1);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 5, today, EventStatus::Upcoming);
    let volunteer = mem.seed_volunteer("a@example.com");

    lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();
    let again = lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id).await;
    assert!(matches!(again, Err(ApiError::Conflict(_))));
}

#[tokio::test]
async fn cancel_frees_the_slot_and_allows_re_registration() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 1, today, EventStatus::Upcoming);
    let volunteer = mem.seed_volunteer("a@example.com");

    lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();
    let cancelled = lifecycle::cancel_event_registration(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();
    assert_eq!(cancelled.current_participants, 0);

    let re_registered = lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();
    assert_eq!(re_registered.current_participants, 1);
}

#[tokio::test]
async fn cancellation_sends_one_heads_up_to_the_organizer() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 5, today, EventStatus::Upcoming);
    let volunteer = mem.seed_volunteer("a@example.com");

    lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();
    lifecycle::cancel_event_registration(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();

    let heads_ups: Vec<_> = rec
        .recorded()
        .into_iter()
        .filter(|(_, n)| matches!(n, Notice::RegistrationCancelled { .. }))
        .collect();
    assert_eq!(heads_ups.len(), 1);
    assert_eq!(heads_ups[0].0, "org@example.com");
    assert_eq!(
        heads_ups[0].1,
        Notice::RegistrationCancelled {
            event_title: event.title.clone(),
            volunteer_name: volunteer.name.clone(),
        }
    );
}

#[tokio::test]
async fn cancelling_without_registration_is_not_found() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 5, today, EventStatus::Upcoming);
    let volunteer = mem.seed_volunteer("a@example.com");

    let result = lifecycle::cancel_event_registration(&repo, &notifier, &volunteer, event.id).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
    // A refused cancellation tells nobody.
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn registering_for_completed_event_is_a_state_error() {
    let (mem, repo, _rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let yesterday = chrono::Utc::now().date_naive().pred_opt().unwrap();
    let event = mem.seed_event(organizer.id, category.id, 5, yesterday, EventStatus::Completed);
    let volunteer = mem.seed_volunteer("a@example.com");

    let result = lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id).await;
    assert!(matches!(result, Err(ApiError::State(_))));
}

#[tokio::test]
async fn registration_sends_one_heads_up_to_the_organizer() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let event = mem.seed_event(organizer.id, category.id, 5, today, EventStatus::Upcoming);
    let volunteer = mem.seed_volunteer("a@example.com");

    lifecycle::register_for_event(&repo, &notifier, &volunteer, event.id)
        .await
        .unwrap();

    let sent = rec.recorded();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "org@example.com");
    assert!(matches!(sent[0].1, Notice::NewRegistration { .. }));
}

// --- Completion sweep ---

#[tokio::test]
async fn sweep_completes_overdue_events_and_thanks_each_participant_once() {
    let (mem, repo, rec, notifier) = test_backends();
    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Approved, true);
    let category = mem.seed_category("Cleanup", CategoryKind::Event);
    let today = chrono::Utc::now().date_naive();
    let yesterday = today.pred_opt().unwrap();

    let overdue = mem.seed_event(organizer.id, category.id, 5, yesterday, EventStatus::Upcoming);
    let future = mem.seed_event(organizer.id, category.id, 5, today, EventStatus::Upcoming);

    let v1 = mem.seed_volunteer("a@example.com");
    let v2 = mem.seed_volunteer("b@example.com");
    repo.register_volunteer(overdue.id, v1.id).await.unwrap();
    repo.register_volunteer(overdue.id, v2.id).await.unwrap();

    let report = lifecycle::run_completion_sweep(&repo, &notifier, today)
        .await
        .unwrap();
    assert_eq!(report.events_completed, 1);
    assert_eq!(report.thank_you_notices, 2);

    let stored = repo.get_event(overdue.id).await.unwrap().unwrap();
    assert_eq!(stored.status, EventStatus::Completed);
    let untouched = repo.get_event(future.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, EventStatus::Upcoming);

    // A second sweep finds nothing to claim: thank-you notices stay
    // at-most-once per (event, volunteer).
    let repeat = lifecycle::run_completion_sweep(&repo, &notifier, today)
        .await
        .unwrap();
    assert_eq!(repeat.events_completed, 0);
    assert_eq!(repeat.thank_you_notices, 0);

    let thank_yous: Vec<_> = rec
        .recorded()
        .into_iter()
        .filter(|(_, n)| matches!(n, Notice::EventThankYou { .. }))
        .collect();
    assert_eq!(thank_yous.len(), 2);
}

#[tokio::test]
async fn failed_notices_never_fail_the_transition() {
    let (mem, repo, _rec, _n) = test_backends();
    let failing = std::sync::Arc::new(relawan_portal::RecordingNotifier::failing());
    let notifier = failing.clone() as relawan_portal::NotifierState;

    let organizer = mem.seed_organizer("org@example.com", OrganizerStatus::Pending, true);
    let approved = lifecycle::approve_organizer(&repo, &notifier, organizer.id)
        .await
        .unwrap();
    assert_eq!(approved.status, OrganizerStatus::Approved);
}
