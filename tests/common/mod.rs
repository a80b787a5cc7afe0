#![allow(dead_code)]

//! Shared test fixtures: an in-memory `Repository` implementation plus
//! builders for the app state, so every test runs hermetically without
//! Postgres, MinIO or a mail gateway.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use relawan_portal::{
    AppConfig, AppState, create_router,
    auth,
    models::{
        AdminDashboardStats, Admin, Article, Author, Bookmark, CancellationOutcome, Category,
        CategoryDeleteOutcome, CategoryKind, ContentStatus, CreateArticleRequest,
        CreateBookmarkRequest, CreateCategoryRequest, CreateEventRequest, Event,
        EventRegistration, EventStatus, GalleryImage, OneTimeToken, Organizer, OrganizerStatus,
        RegistrationEntry, RegistrationOutcome, Role, TokenPurpose, UpdateArticleRequest,
        UpdateEventRequest, UpdateOrganizerProfileRequest, Volunteer, VolunteerStatus,
    },
    notifier::{NotifierState, RecordingNotifier},
    repository::{Repository, RepositoryState},
    storage::MockBlobStore,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    admins: Vec<Admin>,
    organizers: Vec<Organizer>,
    volunteers: Vec<Volunteer>,
    authors: Vec<Author>,
    articles: Vec<Article>,
    events: Vec<Event>,
    registrations: Vec<EventRegistration>,
    categories: Vec<Category>,
    bookmarks: Vec<Bookmark>,
    gallery: Vec<GalleryImage>,
    tokens: Vec<OneTimeToken>,
}

/// InMemoryRepository
///
/// Faithful in-memory implementation of the `Repository` contract. The whole
/// store sits behind one mutex, which makes every multi-step operation
/// (registration, claim) atomic exactly like its transactional counterpart.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seed helpers ---

    pub fn seed_admin(&self, email: &str) -> Admin {
        let admin = Admin {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "seeded".to_string(),
            name: "Test Admin".to_string(),
        };
        let mut inner = self.inner.lock().unwrap();
        inner.authors.push(Author {
            id: Uuid::new_v4(),
            admin_id: Some(admin.id),
            ..Default::default()
        });
        inner.admins.push(admin.clone());
        admin
    }

    pub fn seed_admin_with_password(&self, email: &str, password: &str) -> Admin {
        let mut admin = self.seed_admin(email);
        admin.password_hash = auth::hash_password(password).unwrap();
        let mut inner = self.inner.lock().unwrap();
        let stored = inner.admins.iter_mut().find(|a| a.id == admin.id).unwrap();
        stored.password_hash = admin.password_hash.clone();
        admin
    }

    pub fn seed_organizer(
        &self,
        email: &str,
        status: OrganizerStatus,
        is_verified: bool,
    ) -> Organizer {
        let organizer = Organizer {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "seeded".to_string(),
            name: "Test Organizer".to_string(),
            is_verified,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        let mut inner = self.inner.lock().unwrap();
        inner.authors.push(Author {
            id: Uuid::new_v4(),
            organizer_id: Some(organizer.id),
            ..Default::default()
        });
        inner.organizers.push(organizer.clone());
        organizer
    }

    pub fn seed_organizer_with_password(&self, email: &str, password: &str) -> Organizer {
        let organizer = self.seed_organizer(email, OrganizerStatus::Approved, true);
        let hash = auth::hash_password(password).unwrap();
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .organizers
            .iter_mut()
            .find(|o| o.id == organizer.id)
            .unwrap();
        stored.password_hash = hash;
        stored.clone()
    }

    pub fn seed_volunteer(&self, email: &str) -> Volunteer {
        let volunteer = Volunteer {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "seeded".to_string(),
            name: "Test Volunteer".to_string(),
            is_verified: true,
            status: VolunteerStatus::Active,
            created_at: Utc::now(),
            ..Default::default()
        };
        let mut inner = self.inner.lock().unwrap();
        inner.authors.push(Author {
            id: Uuid::new_v4(),
            volunteer_id: Some(volunteer.id),
            ..Default::default()
        });
        inner.volunteers.push(volunteer.clone());
        volunteer
    }

    pub fn seed_volunteer_with_password(&self, email: &str, password: &str) -> Volunteer {
        let volunteer = self.seed_volunteer(email);
        let hash = auth::hash_password(password).unwrap();
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .volunteers
            .iter_mut()
            .find(|v| v.id == volunteer.id)
            .unwrap();
        stored.password_hash = hash;
        stored.clone()
    }

    pub fn seed_category(&self, name: &str, kind: CategoryKind) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
        };
        self.inner.lock().unwrap().categories.push(category.clone());
        category
    }

    pub fn seed_event(
        &self,
        organizer_id: Uuid,
        category_id: Uuid,
        max_participants: i32,
        event_date: NaiveDate,
        status: EventStatus,
    ) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: "Beach Cleanup".to_string(),
            description: "Bring gloves".to_string(),
            category_id,
            event_date,
            event_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            location: "North Beach".to_string(),
            max_participants,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        self.inner.lock().unwrap().events.push(event.clone());
        event
    }

    pub fn seed_article(&self, author_id: Uuid, category_id: Uuid, status: ContentStatus) -> Article {
        let article = Article {
            id: Uuid::new_v4(),
            author_id,
            title: "River Restoration Recap".to_string(),
            summary: "What we did".to_string(),
            content: "Long form".to_string(),
            category_id,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        self.inner.lock().unwrap().articles.push(article.clone());
        article
    }

    pub fn author_id_for(&self, role: Role, principal_id: Uuid) -> Uuid {
        let inner = self.inner.lock().unwrap();
        inner
            .authors
            .iter()
            .find(|a| match role {
                Role::Admin => a.admin_id == Some(principal_id),
                Role::Organizer => a.organizer_id == Some(principal_id),
                Role::Volunteer => a.volunteer_id == Some(principal_id),
            })
            .map(|a| a.id)
            .unwrap()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create_organizer(&self, organizer: Organizer) -> Result<Organizer, sqlx::Error> {
        let mut created = organizer;
        created.status = OrganizerStatus::Pending;
        created.is_verified = false;
        created.created_at = Utc::now();
        created.updated_at = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        inner.authors.push(Author {
            id: Uuid::new_v4(),
            organizer_id: Some(created.id),
            ..Default::default()
        });
        inner.organizers.push(created.clone());
        Ok(created)
    }

    async fn get_organizer(&self, id: Uuid) -> Result<Option<Organizer>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .organizers
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn get_organizer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .organizers
            .iter()
            .find(|o| o.email == email)
            .cloned())
    }

    async fn list_organizers(
        &self,
        status: Option<OrganizerStatus>,
    ) -> Result<Vec<Organizer>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .organizers
            .iter()
            .filter(|o| match status {
                Some(s) => o.status == s,
                None => o.status != OrganizerStatus::Deleted,
            })
            .cloned()
            .collect())
    }

    async fn update_organizer_profile(
        &self,
        id: Uuid,
        req: UpdateOrganizerProfileRequest,
        reset_to_pending: bool,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(organizer) = inner.organizers.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            organizer.name = name;
        }
        if let Some(phone) = req.phone {
            organizer.phone = Some(phone);
        }
        if reset_to_pending {
            organizer.status = OrganizerStatus::Pending;
            organizer.rejection_reason = None;
        }
        organizer.updated_at = Utc::now();
        Ok(Some(organizer.clone()))
    }

    async fn set_organizer_status(
        &self,
        id: Uuid,
        status: OrganizerStatus,
        reason: Option<String>,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(organizer) = inner.organizers.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        organizer.status = status;
        match status {
            OrganizerStatus::Approved => organizer.approved_at = Some(Utc::now()),
            OrganizerStatus::Rejected => organizer.rejection_reason = reason,
            OrganizerStatus::Deleted => organizer.deleted_reason = reason,
            _ => {}
        }
        organizer.updated_at = Utc::now();
        Ok(Some(organizer.clone()))
    }

    async fn create_volunteer(&self, volunteer: Volunteer) -> Result<Volunteer, sqlx::Error> {
        let mut created = volunteer;
        created.status = VolunteerStatus::Active;
        created.is_verified = false;
        created.created_at = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        inner.authors.push(Author {
            id: Uuid::new_v4(),
            volunteer_id: Some(created.id),
            ..Default::default()
        });
        inner.volunteers.push(created.clone());
        Ok(created)
    }

    async fn get_volunteer(&self, id: Uuid) -> Result<Option<Volunteer>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .volunteers
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn get_volunteer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Volunteer>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .volunteers
            .iter()
            .find(|v| v.email == email)
            .cloned())
    }

    async fn soft_delete_volunteer(&self, id: Uuid, reason: &str) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(volunteer) = inner
            .volunteers
            .iter_mut()
            .find(|v| v.id == id && v.status == VolunteerStatus::Active)
        else {
            return Ok(false);
        };
        volunteer.status = VolunteerStatus::Deleted;
        volunteer.deleted_reason = Some(reason.to_string());
        Ok(true)
    }

    async fn mark_verified(&self, role: Role, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        match role {
            Role::Organizer => {
                if let Some(o) = inner.organizers.iter_mut().find(|o| o.id == id) {
                    o.is_verified = true;
                    return Ok(true);
                }
            }
            Role::Volunteer => {
                if let Some(v) = inner.volunteers.iter_mut().find(|v| v.id == id) {
                    v.is_verified = true;
                    return Ok(true);
                }
            }
            Role::Admin => {}
        }
        Ok(false)
    }

    async fn update_password(
        &self,
        role: Role,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let updated = match role {
            Role::Admin => inner.admins.iter_mut().find(|a| a.id == id).map(|a| {
                a.password_hash = password_hash.to_string();
            }),
            Role::Organizer => inner.organizers.iter_mut().find(|o| o.id == id).map(|o| {
                o.password_hash = password_hash.to_string();
            }),
            Role::Volunteer => inner.volunteers.iter_mut().find(|v| v.id == id).map(|v| {
                v.password_hash = password_hash.to_string();
            }),
        };
        Ok(updated.is_some())
    }

    async fn list_active_volunteer_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .volunteers
            .iter()
            .filter(|v| v.status == VolunteerStatus::Active)
            .map(|v| v.email.clone())
            .collect())
    }

    async fn list_approved_organizer_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .organizers
            .iter()
            .filter(|o| o.status == OrganizerStatus::Approved)
            .map(|o| o.email.clone())
            .collect())
    }

    async fn get_author_for(
        &self,
        role: Role,
        principal_id: Uuid,
    ) -> Result<Option<Author>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .authors
            .iter()
            .find(|a| match role {
                Role::Admin => a.admin_id == Some(principal_id),
                Role::Organizer => a.organizer_id == Some(principal_id),
                Role::Volunteer => a.volunteer_id == Some(principal_id),
            })
            .cloned())
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .authors
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn get_author_email(&self, author_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        let Some(author) = inner.authors.iter().find(|a| a.id == author_id) else {
            return Ok(None);
        };
        if let Some(id) = author.admin_id {
            return Ok(inner.admins.iter().find(|a| a.id == id).map(|a| a.email.clone()));
        }
        if let Some(id) = author.organizer_id {
            return Ok(inner
                .organizers
                .iter()
                .find(|o| o.id == id)
                .map(|o| o.email.clone()));
        }
        if let Some(id) = author.volunteer_id {
            return Ok(inner
                .volunteers
                .iter()
                .find(|v| v.id == id)
                .map(|v| v.email.clone()));
        }
        Ok(None)
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<Article, sqlx::Error> {
        let article = Article {
            id: Uuid::new_v4(),
            author_id,
            title: req.title,
            summary: req.summary,
            content: req.content,
            category_id: req.category_id,
            main_image: req.main_image,
            status: ContentStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        self.inner.lock().unwrap().articles.push(article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .iter()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .cloned())
    }

    async fn list_published_articles(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let needle = search.map(|s| s.to_lowercase());
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .iter()
            .filter(|a| a.status == ContentStatus::Publish && a.deleted_at.is_none())
            .filter(|a| category_id.map_or(true, |c| a.category_id == c))
            .filter(|a| {
                needle.as_ref().map_or(true, |n| {
                    a.title.to_lowercase().contains(n) || a.summary.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect())
    }

    async fn list_articles_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<Article>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .iter()
            .filter(|a| a.author_id == author_id && a.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_all_articles(&self) -> Result<Vec<Article>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .articles
            .iter()
            .filter(|a| a.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_article(
        &self,
        id: Uuid,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(article) = inner
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
        else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            article.title = title;
        }
        if let Some(summary) = req.summary {
            article.summary = summary;
        }
        if let Some(content) = req.content {
            article.content = content;
        }
        if let Some(category_id) = req.category_id {
            article.category_id = category_id;
        }
        if let Some(main_image) = req.main_image {
            article.main_image = Some(main_image);
        }
        article.updated_at = Utc::now();
        Ok(Some(article.clone()))
    }

    async fn set_article_status(
        &self,
        id: Uuid,
        status: ContentStatus,
    ) -> Result<Option<Article>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(article) = inner
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
        else {
            return Ok(None);
        };
        article.status = status;
        article.updated_at = Utc::now();
        Ok(Some(article.clone()))
    }

    async fn soft_delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(article) = inner
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
        else {
            return Ok(false);
        };
        article.deleted_at = Some(Utc::now());
        Ok(true)
    }

    async fn create_event(
        &self,
        organizer_id: Uuid,
        req: CreateEventRequest,
    ) -> Result<Event, sqlx::Error> {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: req.title,
            description: req.description,
            category_id: req.category_id,
            event_date: req.event_date,
            event_time: req.event_time,
            location: req.location,
            latitude: req.latitude,
            longitude: req.longitude,
            max_participants: req.max_participants,
            current_participants: 0,
            status: EventStatus::Upcoming,
            main_image: req.main_image,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        self.inner.lock().unwrap().events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .cloned())
    }

    async fn list_public_events(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        let needle = search.map(|s| s.to_lowercase());
        Ok(inner
            .events
            .iter()
            .filter(|e| e.status == EventStatus::Upcoming && e.deleted_at.is_none())
            .filter(|e| {
                inner
                    .organizers
                    .iter()
                    .any(|o| o.id == e.organizer_id && o.status == OrganizerStatus::Approved)
            })
            .filter(|e| category_id.map_or(true, |c| e.category_id == c))
            .filter(|e| {
                needle.as_ref().map_or(true, |n| {
                    e.title.to_lowercase().contains(n) || e.location.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect())
    }

    async fn list_events_by_organizer(
        &self,
        organizer_id: Uuid,
    ) -> Result<Vec<Event>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.organizer_id == organizer_id && e.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_all_events(&self) -> Result<Vec<Event>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_event(
        &self,
        id: Uuid,
        req: UpdateEventRequest,
    ) -> Result<Option<Event>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(event) = inner
            .events
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
        else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            event.title = title;
        }
        if let Some(description) = req.description {
            event.description = description;
        }
        if let Some(category_id) = req.category_id {
            event.category_id = category_id;
        }
        if let Some(event_date) = req.event_date {
            event.event_date = event_date;
        }
        if let Some(event_time) = req.event_time {
            event.event_time = event_time;
        }
        if let Some(location) = req.location {
            event.location = location;
        }
        if let Some(max) = req.max_participants {
            event.max_participants = max;
        }
        if let Some(main_image) = req.main_image {
            event.main_image = Some(main_image);
        }
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn soft_delete_event(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(event) = inner
            .events
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
        else {
            return Ok(false);
        };
        event.deleted_at = Some(Utc::now());
        Ok(true)
    }

    async fn register_volunteer(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<RegistrationOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let duplicate = inner
            .registrations
            .iter()
            .any(|r| r.event_id == event_id && r.volunteer_id == volunteer_id);

        let Some(event) = inner
            .events
            .iter_mut()
            .find(|e| e.id == event_id && e.deleted_at.is_none())
        else {
            return Ok(RegistrationOutcome::EventNotFound);
        };
        if event.status != EventStatus::Upcoming {
            return Ok(RegistrationOutcome::RegistrationClosed);
        }
        if event.current_participants >= event.max_participants {
            return Ok(RegistrationOutcome::EventFull);
        }
        if duplicate {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        event.current_participants += 1;
        let updated = event.clone();
        inner.registrations.push(EventRegistration {
            id: Uuid::new_v4(),
            event_id,
            volunteer_id,
            created_at: Utc::now(),
        });
        Ok(RegistrationOutcome::Registered(updated))
    }

    async fn cancel_registration(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<CancellationOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        if !inner
            .events
            .iter()
            .any(|e| e.id == event_id && e.deleted_at.is_none())
        {
            return Ok(CancellationOutcome::EventNotFound);
        }

        let before = inner.registrations.len();
        inner
            .registrations
            .retain(|r| !(r.event_id == event_id && r.volunteer_id == volunteer_id));
        if inner.registrations.len() == before {
            return Ok(CancellationOutcome::NotRegistered);
        }

        let event = inner
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .expect("checked above");
        event.current_participants -= 1;
        Ok(CancellationOutcome::Cancelled(event.clone()))
    }

    async fn list_event_registrations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<RegistrationEntry>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .filter_map(|r| {
                inner
                    .volunteers
                    .iter()
                    .find(|v| v.id == r.volunteer_id)
                    .map(|v| RegistrationEntry {
                        volunteer_id: v.id,
                        volunteer_name: v.name.clone(),
                        volunteer_email: v.email.clone(),
                        registered_at: r.created_at,
                    })
            })
            .collect())
    }

    async fn claim_completed_events(&self, today: NaiveDate) -> Result<Vec<Event>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let mut claimed = Vec::new();
        for event in inner.events.iter_mut() {
            if event.status == EventStatus::Upcoming
                && event.deleted_at.is_none()
                && event.event_date < today
            {
                event.status = EventStatus::Completed;
                event.updated_at = Utc::now();
                claimed.push(event.clone());
            }
        }
        Ok(claimed)
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, sqlx::Error> {
        let category = Category {
            id: Uuid::new_v4(),
            name: req.name,
            kind: req.kind,
        };
        self.inner.lock().unwrap().categories.push(category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_categories(
        &self,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Category>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .categories
            .iter()
            .filter(|c| kind.map_or(true, |k| c.kind == k))
            .cloned()
            .collect())
    }

    async fn delete_category(&self, id: Uuid) -> Result<CategoryDeleteOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let referenced = inner.articles.iter().any(|a| a.category_id == id)
            || inner.events.iter().any(|e| e.category_id == id);
        if referenced {
            return Ok(CategoryDeleteOutcome::InUse);
        }
        let before = inner.categories.len();
        inner.categories.retain(|c| c.id != id);
        Ok(if inner.categories.len() < before {
            CategoryDeleteOutcome::Deleted
        } else {
            CategoryDeleteOutcome::NotFound
        })
    }

    async fn add_bookmark(
        &self,
        volunteer_id: Uuid,
        req: CreateBookmarkRequest,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let duplicate = inner.bookmarks.iter().any(|b| {
            b.volunteer_id == volunteer_id
                && ((req.article_id.is_some() && b.article_id == req.article_id)
                    || (req.event_id.is_some() && b.event_id == req.event_id))
        });
        if duplicate {
            return Ok(None);
        }
        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            volunteer_id,
            article_id: req.article_id,
            event_id: req.event_id,
            created_at: Utc::now(),
        };
        inner.bookmarks.push(bookmark.clone());
        Ok(Some(bookmark))
    }

    async fn remove_bookmark(&self, id: Uuid, volunteer_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.bookmarks.len();
        inner
            .bookmarks
            .retain(|b| !(b.id == id && b.volunteer_id == volunteer_id));
        Ok(inner.bookmarks.len() < before)
    }

    async fn list_bookmarks(&self, volunteer_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookmarks
            .iter()
            .filter(|b| b.volunteer_id == volunteer_id)
            .cloned()
            .collect())
    }

    async fn add_gallery_image(
        &self,
        article_id: Option<Uuid>,
        event_id: Option<Uuid>,
        path: &str,
    ) -> Result<GalleryImage, sqlx::Error> {
        let image = GalleryImage {
            id: Uuid::new_v4(),
            article_id,
            event_id,
            path: path.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().gallery.push(image.clone());
        Ok(image)
    }

    async fn get_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .gallery
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn list_article_gallery(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<GalleryImage>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .gallery
            .iter()
            .filter(|g| g.article_id == Some(article_id))
            .cloned()
            .collect())
    }

    async fn list_event_gallery(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<GalleryImage>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .gallery
            .iter()
            .filter(|g| g.event_id == Some(event_id))
            .cloned()
            .collect())
    }

    async fn delete_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner.gallery.iter().position(|g| g.id == id) else {
            return Ok(None);
        };
        Ok(Some(inner.gallery.remove(pos)))
    }

    async fn issue_one_time_token(
        &self,
        role: Role,
        principal_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<OneTimeToken, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        if purpose == TokenPurpose::ResetPassword {
            inner.tokens.retain(|t| {
                !(t.principal_role == role
                    && t.principal_id == principal_id
                    && t.purpose == TokenPurpose::ResetPassword)
            });
        }
        let token = OneTimeToken {
            id: Uuid::new_v4(),
            token: Uuid::new_v4(),
            principal_role: role,
            principal_id,
            purpose,
            expires_at: Utc::now() + Duration::seconds(purpose.ttl_secs()),
        };
        inner.tokens.push(token.clone());
        Ok(token)
    }

    async fn consume_one_time_token(
        &self,
        token: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<(Role, Uuid)>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner
            .tokens
            .iter()
            .position(|t| t.token == token && t.purpose == purpose && t.expires_at > Utc::now())
        else {
            return Ok(None);
        };
        let consumed = inner.tokens.remove(pos);
        Ok(Some((consumed.principal_role, consumed.principal_id)))
    }

    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(AdminDashboardStats {
            total_volunteers: inner
                .volunteers
                .iter()
                .filter(|v| v.status == VolunteerStatus::Active)
                .count() as i64,
            total_organizers: inner
                .organizers
                .iter()
                .filter(|o| o.status != OrganizerStatus::Deleted)
                .count() as i64,
            pending_organizers: inner
                .organizers
                .iter()
                .filter(|o| o.status == OrganizerStatus::Pending)
                .count() as i64,
            total_articles: inner
                .articles
                .iter()
                .filter(|a| a.deleted_at.is_none())
                .count() as i64,
            total_events: inner
                .events
                .iter()
                .filter(|e| e.deleted_at.is_none())
                .count() as i64,
        })
    }
}

/// TestContext
///
/// Bundles the router with concrete handles on the mocks so assertions can
/// look inside after requests complete.
pub struct TestContext {
    pub app: axum::Router,
    pub repo: Arc<InMemoryRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<MockBlobStore>,
}

/// test_context
///
/// Builds the full application against the in-memory backends. The default
/// config runs in `Env::Local`, which enables the `x-act-as` header bypass
/// for exercising authenticated routes without minting JWTs.
pub fn test_context() -> TestContext {
    let repo = Arc::new(InMemoryRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let storage = Arc::new(MockBlobStore::new());

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: storage.clone(),
        notifier: notifier.clone() as NotifierState,
        config: AppConfig::default(),
    };
    TestContext {
        app: create_router(state),
        repo,
        notifier,
        storage,
    }
}

/// Plain state handles for tests that drive the lifecycle engine directly.
pub fn test_backends() -> (Arc<InMemoryRepository>, RepositoryState, Arc<RecordingNotifier>, NotifierState)
{
    let repo = Arc::new(InMemoryRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    (
        repo.clone(),
        repo as RepositoryState,
        notifier.clone(),
        notifier as NotifierState,
    )
}
