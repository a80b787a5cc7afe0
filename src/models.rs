use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Principal Kinds & Status Enums ---

/// Role
///
/// The closed set of principal kinds. The Authorization Guard and the Author
/// resolution both dispatch on this tag with exhaustive matching; there is no
/// trait-object polymorphism between principal kinds anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "principal_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    Volunteer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Volunteer => "volunteer",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Volunteer
    }
}

/// OrganizerStatus
///
/// Lifecycle states of an organizer account. Only `Approved` grants access to
/// privileged organizer actions; `Deleted` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "organizer_status", rename_all = "lowercase")]
pub enum OrganizerStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
    Deactivated,
    Deleted,
}

/// VolunteerStatus
///
/// Volunteers have no approval workflow: active until soft-deleted by an admin,
/// irreversible through the API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "volunteer_status", rename_all = "lowercase")]
pub enum VolunteerStatus {
    #[default]
    Active,
    Deleted,
}

/// ContentStatus
///
/// Publication state of an article or event description. Draft and publish are
/// freely bidirectional for the owner (and admins); soft deletion is tracked
/// separately via the `deleted_at` tombstone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "content_status", rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Publish,
}

/// EventStatus
///
/// Scheduling state of an event. The transition to `Completed` happens only in
/// the maintenance sweep, never as a read side effect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Completed,
}

/// CategoryKind
///
/// Categories are partitioned by the content type they may be attached to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Article,
    Event,
}

/// TokenPurpose
///
/// The two single-use token flows. TTLs differ: verification links live for an
/// hour, password resets for ten minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    /// Validity window in seconds.
    pub fn ttl_secs(&self) -> i64 {
        match self {
            TokenPurpose::VerifyEmail => 3600,
            TokenPurpose::ResetPassword => 600,
        }
    }
}

// --- Principals ---

/// Admin
///
/// Administrators have no lifecycle status field: an admin row is always
/// active. Their tokens carry the elevated-privilege flag.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    // Never serialized out; responses use the profile payloads below.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
}

/// Organizer
///
/// An organization account subject to the approval state machine. The
/// `rejection_reason` survives until the organizer resubmits (any profile
/// update while `Rejected` clears it and flips the status back to `Pending`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Organizer {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    // Email verification is independent of moderation approval.
    pub is_verified: bool,
    pub status: OrganizerStatus,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub deleted_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Volunteer
///
/// An individual contributor account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Volunteer {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub is_verified: bool,
    pub status: VolunteerStatus,
    pub deleted_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Author
///
/// The unified attribution identity. Exactly one of the three foreign
/// references is non-null; the row is created in the same transaction as its
/// principal, so resolution failures are defensive-only paths.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Author {
    pub id: Uuid,
    pub admin_id: Option<Uuid>,
    pub organizer_id: Option<Uuid>,
    pub volunteer_id: Option<Uuid>,
}

impl Author {
    /// The (kind, id) pair behind this author. Exactly one reference is set by
    /// construction; a fully-null row indicates corrupted data.
    pub fn principal(&self) -> Option<(Role, Uuid)> {
        if let Some(id) = self.admin_id {
            Some((Role::Admin, id))
        } else if let Some(id) = self.organizer_id {
            Some((Role::Organizer, id))
        } else {
            self.volunteer_id.map(|id| (Role::Volunteer, id))
        }
    }
}

// --- Content Entities ---

/// Article
///
/// Attributed to an `Author` (any principal kind). Soft-deleted rows keep their
/// data but are invisible to every retrieval path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category_id: Uuid,
    // Object-store key of the cover image (scalar path, not a gallery row).
    pub main_image: Option<String>,
    pub status: ContentStatus,
    // Soft-delete tombstone. Every repository read filters on this being NULL.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event
///
/// Owned by an `Organizer` directly (a distinct ownership axis from articles).
/// `current_participants` is the only contended counter in the system and is
/// only ever mutated inside the registration/cancellation transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    #[schema(value_type = String)]
    pub event_date: NaiveDate,
    #[schema(value_type = String)]
    pub event_time: NaiveTime,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub status: EventStatus,
    pub main_image: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// EventRegistration
///
/// Join row between a volunteer and an event, unique per pair. Creation and
/// deletion always travel with the capacity counter in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub volunteer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// RegistrationEntry
///
/// A registration enriched with the volunteer's contact details, used for the
/// organizer's participant listing and for cancellation/thank-you fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct RegistrationEntry {
    pub volunteer_id: Uuid,
    pub volunteer_name: String,
    pub volunteer_email: String,
    pub registered_at: DateTime<Utc>,
}

/// Category
///
/// Referenced by articles or events, never owned; deletion is blocked while any
/// reference exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
}

/// Bookmark
///
/// Volunteer-private pin on an article or an event, exactly one target set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Bookmark {
    pub id: Uuid,
    pub volunteer_id: Uuid,
    pub article_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// GalleryImage
///
/// A media attachment owned by exactly one article or event. The `path` is the
/// blob-store key returned by `BlobStore::put`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct GalleryImage {
    pub id: Uuid,
    pub article_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// OneTimeToken
///
/// Single-use, time-bounded token bound to one principal. Consumption deletes
/// the row; issuing a new reset token purges older unconsumed reset tokens for
/// the same principal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OneTimeToken {
    pub id: Uuid,
    pub token: Uuid,
    pub principal_role: Role,
    pub principal_id: Uuid,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

// --- Transactional Outcomes ---

/// RegistrationOutcome
///
/// Result of the atomic register step. The decision is made inside the
/// repository transaction (under the event row lock) so that two concurrent
/// registrations cannot both observe the last free slot.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered(Event),
    EventNotFound,
    RegistrationClosed,
    EventFull,
    AlreadyRegistered,
}

/// CancellationOutcome
///
/// Result of the atomic cancel step.
#[derive(Debug, Clone)]
pub enum CancellationOutcome {
    Cancelled(Event),
    EventNotFound,
    NotRegistered,
}

/// CategoryDeleteOutcome
///
/// Category deletion is refused while any article or event references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryDeleteOutcome {
    Deleted,
    InUse,
    NotFound,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterVolunteerRequest
///
/// Input for volunteer signup. The password is hashed before persistence and
/// never stored or logged in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterVolunteerRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// RegisterOrganizerRequest
///
/// Input for organizer signup. New organizers always start in `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterOrganizerRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// The signed bearer token plus the resolved role for frontend routing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

/// UpdateOrganizerProfileRequest
///
/// Partial profile update. Submitting this while the account is `Rejected`
/// doubles as the resubmission verb: status flips back to `Pending` and the
/// stored rejection reason is cleared.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateOrganizerProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// ReasonRequest
///
/// Shared payload for moderation actions that carry a reason (rejection,
/// account soft-deletion, admin content removal).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

/// CreateArticleRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateArticleRequest {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category_id: Uuid,
    pub main_image: Option<String>,
}

/// UpdateArticleRequest
///
/// Partial update; only provided fields are written (COALESCE in the query).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
}

/// SetContentStatusRequest
///
/// Draft/publish flip for articles and events' description pages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SetContentStatusRequest {
    pub status: ContentStatus,
}

/// CreateEventRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    #[schema(value_type = String)]
    pub event_date: NaiveDate,
    #[schema(value_type = String)]
    pub event_time: NaiveTime,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_participants: i32,
    pub main_image: Option<String>,
}

/// UpdateEventRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = String)]
    pub event_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = String)]
    pub event_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
}

/// CreateCategoryRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub kind: CategoryKind,
}

/// CreateBookmarkRequest
///
/// Exactly one of the two targets must be set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateBookmarkRequest {
    pub article_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
}

/// AddGalleryImageRequest
///
/// Raw image bytes arrive base64-encoded; the handler pushes them through the
/// blob store and persists the returned key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AddGalleryImageRequest {
    pub filename: String,
    pub data_base64: String,
}

/// ContactMessageRequest
///
/// Public contact form relayed to the moderation inbox. Unlike most
/// notifications this relay is not best-effort: delivery failure surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ContactMessageRequest {
    pub sender_email: String,
    pub subject: String,
    pub body: String,
}

/// DirectEmailRequest
///
/// Admin-to-principal direct mail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct DirectEmailRequest {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// BroadcastEmailRequest
///
/// Admin broadcast to all volunteers, all organizers, or both.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct BroadcastEmailRequest {
    pub audience: BroadcastAudience,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastAudience {
    #[default]
    All,
    Volunteers,
    Organizers,
}

/// ForgotPasswordRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub role: Role,
}

/// ResetPasswordRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ResetPasswordRequest {
    pub token: Uuid,
    pub new_password: String,
}

// --- Dashboard & Profile Schemas (Output) ---

/// AdminDashboardStats
///
/// Aggregate counters for the moderation dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AdminDashboardStats {
    pub total_volunteers: i64,
    pub total_organizers: i64,
    pub pending_organizers: i64,
    pub total_articles: i64,
    pub total_events: i64,
}

/// ProfileResponse
///
/// The authenticated caller's own profile, shaped per principal kind.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub name: String,
    // Organizer-only fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

/// SweepReport
///
/// Outcome of one completion-sweep invocation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SweepReport {
    pub events_completed: usize,
    pub thank_you_notices: usize,
}
