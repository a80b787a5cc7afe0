use crate::models::{
    AdminDashboardStats, Admin, Article, Author, Bookmark, CancellationOutcome, Category,
    CategoryDeleteOutcome, CategoryKind, ContentStatus, CreateArticleRequest,
    CreateBookmarkRequest, CreateCategoryRequest, CreateEventRequest, Event, EventStatus,
    GalleryImage, OneTimeToken, Organizer, OrganizerStatus, RegistrationEntry,
    RegistrationOutcome, Role, TokenPurpose, UpdateArticleRequest, UpdateEventRequest,
    UpdateOrganizerProfileRequest, Volunteer, VolunteerStatus,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

// Column lists shared by every query touching these tables, so no read path can
// accidentally diverge from the struct shape.
const ORGANIZER_COLS: &str = "id, email, password_hash, name, phone, is_verified, status, \
     rejection_reason, approved_at, deleted_reason, created_at, updated_at";
const VOLUNTEER_COLS: &str =
    "id, email, password_hash, name, is_verified, status, deleted_reason, created_at";
const ARTICLE_COLS: &str = "id, author_id, title, summary, content, category_id, main_image, \
     status, deleted_at, created_at, updated_at";
const EVENT_COLS: &str = "id, organizer_id, title, description, category_id, event_date, \
     event_time, location, latitude, longitude, max_participants, current_participants, status, \
     main_image, deleted_at, created_at, updated_at";

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers, guards and
/// the lifecycle engine interact with the data layer only through this trait,
/// so tests substitute an in-memory implementation without touching Postgres.
///
/// Soft-delete discipline: every retrieval method filters `deleted_at IS NULL`
/// (or the status-level tombstone for principals) *inside* the implementation.
/// There is deliberately no "include deleted" flag on any read path; the only
/// methods that see tombstoned rows are the by-id principal fetches used by
/// login and the guard, which must distinguish "deleted" from "absent".
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Admins ---
    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, sqlx::Error>;
    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, sqlx::Error>;

    // --- Organizers ---
    /// Inserts the organizer and its Author row in one transaction.
    async fn create_organizer(&self, organizer: Organizer) -> Result<Organizer, sqlx::Error>;
    /// By-id fetch. Returns tombstoned rows too (login must see `Deleted`).
    async fn get_organizer(&self, id: Uuid) -> Result<Option<Organizer>, sqlx::Error>;
    async fn get_organizer_by_email(&self, email: &str)
    -> Result<Option<Organizer>, sqlx::Error>;
    /// Listing; excludes `Deleted` unless that status is requested explicitly.
    async fn list_organizers(
        &self,
        status: Option<OrganizerStatus>,
    ) -> Result<Vec<Organizer>, sqlx::Error>;
    /// Partial profile update. With `reset_to_pending` the status flips to
    /// `Pending` and the stored rejection reason is cleared in the same write.
    async fn update_organizer_profile(
        &self,
        id: Uuid,
        req: UpdateOrganizerProfileRequest,
        reset_to_pending: bool,
    ) -> Result<Option<Organizer>, sqlx::Error>;
    /// Status transition write. Stamps `approved_at` on `Approved`, stores the
    /// reason in `rejection_reason` for `Rejected` and in `deleted_reason` for
    /// `Deleted`. Transition *legality* is the lifecycle engine's concern.
    async fn set_organizer_status(
        &self,
        id: Uuid,
        status: OrganizerStatus,
        reason: Option<String>,
    ) -> Result<Option<Organizer>, sqlx::Error>;

    // --- Volunteers ---
    async fn create_volunteer(&self, volunteer: Volunteer) -> Result<Volunteer, sqlx::Error>;
    async fn get_volunteer(&self, id: Uuid) -> Result<Option<Volunteer>, sqlx::Error>;
    async fn get_volunteer_by_email(&self, email: &str)
    -> Result<Option<Volunteer>, sqlx::Error>;
    async fn soft_delete_volunteer(&self, id: Uuid, reason: &str) -> Result<bool, sqlx::Error>;

    // --- Shared principal writes ---
    async fn mark_verified(&self, role: Role, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn update_password(
        &self,
        role: Role,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>;
    /// Live recipient lists for admin broadcasts.
    async fn list_active_volunteer_emails(&self) -> Result<Vec<String>, sqlx::Error>;
    async fn list_approved_organizer_emails(&self) -> Result<Vec<String>, sqlx::Error>;

    // --- Author resolution ---
    async fn get_author_for(
        &self,
        role: Role,
        principal_id: Uuid,
    ) -> Result<Option<Author>, sqlx::Error>;
    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, sqlx::Error>;
    /// Resolves the email of the principal behind an Author row.
    async fn get_author_email(&self, author_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    // --- Articles ---
    async fn create_article(
        &self,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<Article, sqlx::Error>;
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error>;
    async fn list_published_articles(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Article>, sqlx::Error>;
    async fn list_articles_by_author(&self, author_id: Uuid)
    -> Result<Vec<Article>, sqlx::Error>;
    async fn list_all_articles(&self) -> Result<Vec<Article>, sqlx::Error>;
    async fn update_article(
        &self,
        id: Uuid,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, sqlx::Error>;
    async fn set_article_status(
        &self,
        id: Uuid,
        status: ContentStatus,
    ) -> Result<Option<Article>, sqlx::Error>;
    async fn soft_delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Events ---
    async fn create_event(
        &self,
        organizer_id: Uuid,
        req: CreateEventRequest,
    ) -> Result<Event, sqlx::Error>;
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error>;
    /// Public listing: upcoming events whose organizer is currently approved.
    async fn list_public_events(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Event>, sqlx::Error>;
    async fn list_events_by_organizer(
        &self,
        organizer_id: Uuid,
    ) -> Result<Vec<Event>, sqlx::Error>;
    async fn list_all_events(&self) -> Result<Vec<Event>, sqlx::Error>;
    async fn update_event(
        &self,
        id: Uuid,
        req: UpdateEventRequest,
    ) -> Result<Option<Event>, sqlx::Error>;
    async fn soft_delete_event(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Registrations & Capacity ---
    /// The atomic register step: row-locks the event, re-checks state, capacity
    /// and uniqueness under the lock, then inserts the join row and increments
    /// the counter in the same transaction.
    async fn register_volunteer(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<RegistrationOutcome, sqlx::Error>;
    /// The atomic cancel step: deletes the join row and decrements the counter
    /// under the same lock.
    async fn cancel_registration(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<CancellationOutcome, sqlx::Error>;
    async fn list_event_registrations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<RegistrationEntry>, sqlx::Error>;
    /// Claim-and-transition for the completion sweep: flips every overdue
    /// upcoming event to `Completed` and returns exactly the rows *this call*
    /// transitioned, so notification fan-out cannot double-send.
    async fn claim_completed_events(&self, today: NaiveDate) -> Result<Vec<Event>, sqlx::Error>;

    // --- Categories ---
    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, sqlx::Error>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error>;
    async fn list_categories(
        &self,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Category>, sqlx::Error>;
    async fn delete_category(&self, id: Uuid) -> Result<CategoryDeleteOutcome, sqlx::Error>;

    // --- Bookmarks ---
    /// Returns `None` on a duplicate (volunteer, target) pair.
    async fn add_bookmark(
        &self,
        volunteer_id: Uuid,
        req: CreateBookmarkRequest,
    ) -> Result<Option<Bookmark>, sqlx::Error>;
    async fn remove_bookmark(&self, id: Uuid, volunteer_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn list_bookmarks(&self, volunteer_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error>;

    // --- Gallery Images ---
    async fn add_gallery_image(
        &self,
        article_id: Option<Uuid>,
        event_id: Option<Uuid>,
        path: &str,
    ) -> Result<GalleryImage, sqlx::Error>;
    async fn get_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error>;
    async fn list_article_gallery(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<GalleryImage>, sqlx::Error>;
    async fn list_event_gallery(&self, event_id: Uuid)
    -> Result<Vec<GalleryImage>, sqlx::Error>;
    /// Removes the row and hands back the record so the caller can issue the
    /// blob-store delete.
    async fn delete_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error>;

    // --- Single-use Tokens ---
    /// Issues a fresh token. For `ResetPassword` every prior unconsumed reset
    /// token of the same principal is purged first.
    async fn issue_one_time_token(
        &self,
        role: Role,
        principal_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<OneTimeToken, sqlx::Error>;
    /// Atomically consumes (deletes) a live token, returning its principal.
    /// Expired or already-consumed tokens yield `None`.
    async fn consume_one_time_token(
        &self,
        token: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<(Role, Uuid)>, sqlx::Error>;

    // --- Dashboard ---
    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the app state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// All queries use runtime binding so the crate compiles without a live
/// database connection.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ADMINS ---

    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>("SELECT id, email, password_hash, name FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, name FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    // --- ORGANIZERS ---

    /// create_organizer
    ///
    /// Principal and Author are born together: both inserts share one
    /// transaction so an Author can never be missing for a live Organizer.
    async fn create_organizer(&self, organizer: Organizer) -> Result<Organizer, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Organizer>(&format!(
            "INSERT INTO organizers (id, email, password_hash, name, phone, is_verified, status, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, false, 'pending', NOW(), NOW()) \
             RETURNING {ORGANIZER_COLS}"
        ))
        .bind(organizer.id)
        .bind(&organizer.email)
        .bind(&organizer.password_hash)
        .bind(&organizer.name)
        .bind(&organizer.phone)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO authors (id, organizer_id) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_organizer(&self, id: Uuid) -> Result<Option<Organizer>, sqlx::Error> {
        sqlx::query_as::<_, Organizer>(&format!(
            "SELECT {ORGANIZER_COLS} FROM organizers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_organizer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        sqlx::query_as::<_, Organizer>(&format!(
            "SELECT {ORGANIZER_COLS} FROM organizers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_organizers(
        &self,
        status: Option<OrganizerStatus>,
    ) -> Result<Vec<Organizer>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {ORGANIZER_COLS} FROM organizers WHERE "));
        match status {
            Some(s) => {
                builder.push("status = ");
                builder.push_bind(s);
            }
            // Default listing hides tombstoned accounts.
            None => {
                builder.push("status <> ");
                builder.push_bind(OrganizerStatus::Deleted);
            }
        }
        builder.push(" ORDER BY created_at DESC");
        builder
            .build_query_as::<Organizer>()
            .fetch_all(&self.pool)
            .await
    }

    async fn update_organizer_profile(
        &self,
        id: Uuid,
        req: UpdateOrganizerProfileRequest,
        reset_to_pending: bool,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        if reset_to_pending {
            // Resubmission: the profile edit, the status flip and the reason
            // clearing are one write.
            sqlx::query_as::<_, Organizer>(&format!(
                "UPDATE organizers SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
                 status = 'pending', rejection_reason = NULL, updated_at = NOW() \
                 WHERE id = $1 RETURNING {ORGANIZER_COLS}"
            ))
            .bind(id)
            .bind(req.name)
            .bind(req.phone)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Organizer>(&format!(
                "UPDATE organizers SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
                 updated_at = NOW() WHERE id = $1 RETURNING {ORGANIZER_COLS}"
            ))
            .bind(id)
            .bind(req.name)
            .bind(req.phone)
            .fetch_optional(&self.pool)
            .await
        }
    }

    async fn set_organizer_status(
        &self,
        id: Uuid,
        status: OrganizerStatus,
        reason: Option<String>,
    ) -> Result<Option<Organizer>, sqlx::Error> {
        sqlx::query_as::<_, Organizer>(&format!(
            "UPDATE organizers SET status = $2, \
             approved_at = CASE WHEN $2 = 'approved'::organizer_status THEN NOW() ELSE approved_at END, \
             rejection_reason = CASE WHEN $2 = 'rejected'::organizer_status THEN $3 ELSE rejection_reason END, \
             deleted_reason = CASE WHEN $2 = 'deleted'::organizer_status THEN $3 ELSE deleted_reason END, \
             updated_at = NOW() WHERE id = $1 RETURNING {ORGANIZER_COLS}"
        ))
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    // --- VOLUNTEERS ---

    async fn create_volunteer(&self, volunteer: Volunteer) -> Result<Volunteer, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Volunteer>(&format!(
            "INSERT INTO volunteers (id, email, password_hash, name, is_verified, status, created_at) \
             VALUES ($1, $2, $3, $4, false, 'active', NOW()) RETURNING {VOLUNTEER_COLS}"
        ))
        .bind(volunteer.id)
        .bind(&volunteer.email)
        .bind(&volunteer.password_hash)
        .bind(&volunteer.name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO authors (id, volunteer_id) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_volunteer(&self, id: Uuid) -> Result<Option<Volunteer>, sqlx::Error> {
        sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLS} FROM volunteers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_volunteer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Volunteer>, sqlx::Error> {
        sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLS} FROM volunteers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn soft_delete_volunteer(&self, id: Uuid, reason: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE volunteers SET status = 'deleted', deleted_reason = $2 \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- SHARED PRINCIPAL WRITES ---

    async fn mark_verified(&self, role: Role, id: Uuid) -> Result<bool, sqlx::Error> {
        let query = match role {
            Role::Organizer => "UPDATE organizers SET is_verified = true WHERE id = $1",
            Role::Volunteer => "UPDATE volunteers SET is_verified = true WHERE id = $1",
            // Admins carry no verification flag.
            Role::Admin => return Ok(false),
        };
        let result = sqlx::query(query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password(
        &self,
        role: Role,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = match role {
            Role::Admin => "UPDATE admins SET password_hash = $2 WHERE id = $1",
            Role::Organizer => "UPDATE organizers SET password_hash = $2 WHERE id = $1",
            Role::Volunteer => "UPDATE volunteers SET password_hash = $2 WHERE id = $1",
        };
        let result = sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active_volunteer_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT email FROM volunteers WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_approved_organizer_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT email FROM organizers WHERE status = 'approved'")
            .fetch_all(&self.pool)
            .await
    }

    // --- AUTHOR RESOLUTION ---

    async fn get_author_for(
        &self,
        role: Role,
        principal_id: Uuid,
    ) -> Result<Option<Author>, sqlx::Error> {
        let query = match role {
            Role::Admin => {
                "SELECT id, admin_id, organizer_id, volunteer_id FROM authors WHERE admin_id = $1"
            }
            Role::Organizer => {
                "SELECT id, admin_id, organizer_id, volunteer_id FROM authors WHERE organizer_id = $1"
            }
            Role::Volunteer => {
                "SELECT id, admin_id, organizer_id, volunteer_id FROM authors WHERE volunteer_id = $1"
            }
        };
        sqlx::query_as::<_, Author>(query)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, sqlx::Error> {
        sqlx::query_as::<_, Author>(
            "SELECT id, admin_id, organizer_id, volunteer_id FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_author_email(&self, author_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let email = sqlx::query_scalar::<_, Option<String>>(
            "SELECT COALESCE(ad.email, o.email, v.email) FROM authors au \
             LEFT JOIN admins ad ON au.admin_id = ad.id \
             LEFT JOIN organizers o ON au.organizer_id = o.id \
             LEFT JOIN volunteers v ON au.volunteer_id = v.id \
             WHERE au.id = $1",
        )
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(email.flatten())
    }

    // --- ARTICLES ---

    async fn create_article(
        &self,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<Article, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles (id, author_id, title, summary, content, category_id, \
             main_image, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', NOW(), NOW()) RETURNING {ARTICLE_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.summary)
        .bind(&req.content)
        .bind(req.category_id)
        .bind(&req.main_image)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLS} FROM articles WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// list_published_articles
    ///
    /// Public listing with filtering via QueryBuilder for safe parameterization.
    /// Unconditionally restricted to published, non-deleted rows.
    async fn list_published_articles(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLS} FROM articles WHERE status = 'publish' AND deleted_at IS NULL"
        ));

        if let Some(cat) = category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(cat);
        }

        if let Some(s) = search {
            // Case-insensitive search across title and summary.
            let pattern = format!("%{}%", s);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR summary ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC");
        builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await
    }

    async fn list_articles_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLS} FROM articles WHERE author_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_all_articles(&self) -> Result<Vec<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLS} FROM articles WHERE deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn update_article(
        &self,
        id: Uuid,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET title = COALESCE($2, title), summary = COALESCE($3, summary), \
             content = COALESCE($4, content), category_id = COALESCE($5, category_id), \
             main_image = COALESCE($6, main_image), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {ARTICLE_COLS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.summary)
        .bind(req.content)
        .bind(req.category_id)
        .bind(req.main_image)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_article_status(
        &self,
        id: Uuid,
        status: ContentStatus,
    ) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {ARTICLE_COLS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn soft_delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE articles SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- EVENTS ---

    async fn create_event(
        &self,
        organizer_id: Uuid,
        req: CreateEventRequest,
    ) -> Result<Event, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (id, organizer_id, title, description, category_id, event_date, \
             event_time, location, latitude, longitude, max_participants, current_participants, \
             status, main_image, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, 'upcoming', $12, NOW(), NOW()) \
             RETURNING {EVENT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(organizer_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.category_id)
        .bind(req.event_date)
        .bind(req.event_time)
        .bind(&req.location)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(req.max_participants)
        .bind(&req.main_image)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// list_public_events
    ///
    /// Public listing: upcoming, non-deleted events whose organizer is still
    /// approved at read time.
    async fn list_public_events(
        &self,
        category_id: Option<Uuid>,
        search: Option<String>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let cols = EVENT_COLS
            .split(", ")
            .map(|c| format!("e.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {cols} FROM events e JOIN organizers o ON e.organizer_id = o.id \
             WHERE e.status = 'upcoming' AND e.deleted_at IS NULL AND o.status = 'approved'"
        ));

        if let Some(cat) = category_id {
            builder.push(" AND e.category_id = ");
            builder.push_bind(cat);
        }
        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            builder.push(" AND (e.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR e.location ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY e.event_date ASC, e.event_time ASC");
        builder.build_query_as::<Event>().fetch_all(&self.pool).await
    }

    async fn list_events_by_organizer(
        &self,
        organizer_id: Uuid,
    ) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE organizer_id = $1 AND deleted_at IS NULL \
             ORDER BY event_date DESC"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_all_events(&self) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE deleted_at IS NULL ORDER BY event_date DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn update_event(
        &self,
        id: Uuid,
        req: UpdateEventRequest,
    ) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET title = COALESCE($2, title), \
             description = COALESCE($3, description), category_id = COALESCE($4, category_id), \
             event_date = COALESCE($5, event_date), event_time = COALESCE($6, event_time), \
             location = COALESCE($7, location), max_participants = COALESCE($8, max_participants), \
             main_image = COALESCE($9, main_image), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {EVENT_COLS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category_id)
        .bind(req.event_date)
        .bind(req.event_time)
        .bind(req.location)
        .bind(req.max_participants)
        .bind(req.main_image)
        .fetch_optional(&self.pool)
        .await
    }

    async fn soft_delete_event(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- REGISTRATIONS & CAPACITY ---

    /// register_volunteer
    ///
    /// The one hard consistency requirement in the system. `SELECT ... FOR
    /// UPDATE` serializes concurrent registrations for the same event, so the
    /// capacity re-check under the lock can never let two callers take the
    /// last slot.
    async fn register_volunteer(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<RegistrationOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(event) = event else {
            return Ok(RegistrationOutcome::EventNotFound);
        };
        if event.status != EventStatus::Upcoming {
            return Ok(RegistrationOutcome::RegistrationClosed);
        }
        if event.current_participants >= event.max_participants {
            return Ok(RegistrationOutcome::EventFull);
        }

        let already = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND volunteer_id = $2",
        )
        .bind(event_id)
        .bind(volunteer_id)
        .fetch_one(&mut *tx)
        .await?;
        if already > 0 {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        sqlx::query(
            "INSERT INTO event_registrations (id, event_id, volunteer_id, created_at) \
             VALUES ($1, $2, $3, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(volunteer_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET current_participants = current_participants + 1, \
             updated_at = NOW() WHERE id = $1 RETURNING {EVENT_COLS}"
        ))
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RegistrationOutcome::Registered(updated))
    }

    async fn cancel_registration(
        &self,
        event_id: Uuid,
        volunteer_id: Uuid,
    ) -> Result<CancellationOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(_) = event else {
            return Ok(CancellationOutcome::EventNotFound);
        };

        let removed = sqlx::query(
            "DELETE FROM event_registrations WHERE event_id = $1 AND volunteer_id = $2",
        )
        .bind(event_id)
        .bind(volunteer_id)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Ok(CancellationOutcome::NotRegistered);
        }

        // A decrement below zero would mean a registration row existed without
        // its counter increment; that is a logic error, not a runtime state.
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET current_participants = current_participants - 1, \
             updated_at = NOW() WHERE id = $1 RETURNING {EVENT_COLS}"
        ))
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CancellationOutcome::Cancelled(updated))
    }

    async fn list_event_registrations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<RegistrationEntry>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationEntry>(
            "SELECT r.volunteer_id, v.name AS volunteer_name, v.email AS volunteer_email, \
             r.created_at AS registered_at \
             FROM event_registrations r JOIN volunteers v ON r.volunteer_id = v.id \
             WHERE r.event_id = $1 ORDER BY r.created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    /// claim_completed_events
    ///
    /// One UPDATE both transitions and claims: callers only ever see the rows
    /// their own invocation flipped, which is what makes the thank-you fan-out
    /// at-most-once even under concurrent sweeps.
    async fn claim_completed_events(&self, today: NaiveDate) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET status = 'completed', updated_at = NOW() \
             WHERE status = 'upcoming' AND deleted_at IS NULL AND event_date < $1 \
             RETURNING {EVENT_COLS}"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
    }

    // --- CATEGORIES ---

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, kind) VALUES ($1, $2, $3) RETURNING id, name, kind",
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(req.kind)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, kind FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_categories(
        &self,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT id, name, kind FROM categories");
        if let Some(k) = kind {
            builder.push(" WHERE kind = ");
            builder.push_bind(k);
        }
        builder.push(" ORDER BY name ASC");
        builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await
    }

    /// delete_category
    ///
    /// Deletion is blocked while any article or event (even a soft-deleted one,
    /// which still holds the reference) points at the category.
    async fn delete_category(&self, id: Uuid) -> Result<CategoryDeleteOutcome, sqlx::Error> {
        let references = sqlx::query_scalar::<_, i64>(
            "SELECT (SELECT COUNT(*) FROM articles WHERE category_id = $1) + \
                    (SELECT COUNT(*) FROM events WHERE category_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if references > 0 {
            return Ok(CategoryDeleteOutcome::InUse);
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(if result.rows_affected() > 0 {
            CategoryDeleteOutcome::Deleted
        } else {
            CategoryDeleteOutcome::NotFound
        })
    }

    // --- BOOKMARKS ---

    /// add_bookmark
    ///
    /// `ON CONFLICT DO NOTHING` against the unique (volunteer, target) index
    /// makes the insert idempotent; a duplicate surfaces as `None`.
    async fn add_bookmark(
        &self,
        volunteer_id: Uuid,
        req: CreateBookmarkRequest,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "INSERT INTO bookmarks (id, volunteer_id, article_id, event_id, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT DO NOTHING \
             RETURNING id, volunteer_id, article_id, event_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(volunteer_id)
        .bind(req.article_id)
        .bind(req.event_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn remove_bookmark(&self, id: Uuid, volunteer_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND volunteer_id = $2")
            .bind(id)
            .bind(volunteer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bookmarks(&self, volunteer_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "SELECT id, volunteer_id, article_id, event_id, created_at FROM bookmarks \
             WHERE volunteer_id = $1 ORDER BY created_at DESC",
        )
        .bind(volunteer_id)
        .fetch_all(&self.pool)
        .await
    }

    // --- GALLERY IMAGES ---

    async fn add_gallery_image(
        &self,
        article_id: Option<Uuid>,
        event_id: Option<Uuid>,
        path: &str,
    ) -> Result<GalleryImage, sqlx::Error> {
        sqlx::query_as::<_, GalleryImage>(
            "INSERT INTO gallery_images (id, article_id, event_id, path, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, article_id, event_id, path, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(article_id)
        .bind(event_id)
        .bind(path)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImage>(
            "SELECT id, article_id, event_id, path, created_at FROM gallery_images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_article_gallery(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<GalleryImage>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImage>(
            "SELECT id, article_id, event_id, path, created_at FROM gallery_images \
             WHERE article_id = $1 ORDER BY created_at ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_event_gallery(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<GalleryImage>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImage>(
            "SELECT id, article_id, event_id, path, created_at FROM gallery_images \
             WHERE event_id = $1 ORDER BY created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_gallery_image(&self, id: Uuid) -> Result<Option<GalleryImage>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImage>(
            "DELETE FROM gallery_images WHERE id = $1 \
             RETURNING id, article_id, event_id, path, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    // --- SINGLE-USE TOKENS ---

    async fn issue_one_time_token(
        &self,
        role: Role,
        principal_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<OneTimeToken, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // A new reset token supersedes every outstanding one for the principal.
        if purpose == TokenPurpose::ResetPassword {
            sqlx::query(
                "DELETE FROM one_time_tokens WHERE principal_role = $1 AND principal_id = $2 \
                 AND purpose = $3",
            )
            .bind(role)
            .bind(principal_id)
            .bind(purpose)
            .execute(&mut *tx)
            .await?;
        }

        let expires_at = Utc::now() + Duration::seconds(purpose.ttl_secs());
        let created = sqlx::query_as::<_, OneTimeToken>(
            "INSERT INTO one_time_tokens (id, token, principal_role, principal_id, purpose, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, token, principal_role, principal_id, purpose, expires_at",
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::new_v4())
        .bind(role)
        .bind(principal_id)
        .bind(purpose)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// consume_one_time_token
    ///
    /// Delete-returning in one statement: consumption is atomic, so a token
    /// presented twice can only ever succeed once.
    async fn consume_one_time_token(
        &self,
        token: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<(Role, Uuid)>, sqlx::Error> {
        let row = sqlx::query_as::<_, OneTimeToken>(
            "DELETE FROM one_time_tokens WHERE token = $1 AND purpose = $2 AND expires_at > NOW() \
             RETURNING id, token, principal_role, principal_id, purpose, expires_at",
        )
        .bind(token)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|t| (t.principal_role, t.principal_id)))
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// Compiles the moderation dashboard counters. Soft-deleted rows are
    /// excluded the same way every listing excludes them.
    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error> {
        let total_volunteers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM volunteers WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await?;
        let total_organizers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM organizers WHERE status <> 'deleted'",
        )
        .fetch_one(&self.pool)
        .await?;
        let pending_organizers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM organizers WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;
        let total_articles =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        let total_events =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(AdminDashboardStats {
            total_volunteers,
            total_organizers,
            pending_organizers,
            total_articles,
            total_events,
        })
    }
}
