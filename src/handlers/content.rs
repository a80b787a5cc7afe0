use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    guard, lifecycle,
    models::{
        AddGalleryImageRequest, Article, Author, Bookmark, Category, CategoryKind, ContentStatus,
        CreateArticleRequest, CreateBookmarkRequest, GalleryImage, ReasonRequest,
        SetContentStatusRequest, UpdateArticleRequest,
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

// --- Filter Structs ---

/// ArticleFilter
///
/// Accepted query parameters of the public article listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ArticleFilter {
    /// Restrict to one category.
    pub category_id: Option<Uuid>,
    /// Case-insensitive search across title and summary.
    pub search: Option<String>,
}

/// CategoryFilter
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CategoryFilter {
    pub kind: Option<CategoryKind>,
}

/// resolve_author
///
/// Maps the caller to their `Author` row. The row is created together with
/// the principal, so a miss here is a data problem surfaced as an
/// authorization failure rather than a panic.
async fn resolve_author(state: &AppState, user: &AuthUser) -> Result<Author, ApiError> {
    state
        .repo
        .get_author_for(user.role, user.id)
        .await?
        .ok_or_else(|| {
            ApiError::InactiveAccount("no author identity exists for this account".to_string())
        })
}

// --- Public article reads ---

/// list_articles
///
/// [Public Route] Published, non-deleted articles with optional category and
/// search filtering. The publish/tombstone filters are applied
/// unconditionally in the repository, so drafts can never leak here.
#[utoipa::path(
    get,
    path = "/articles",
    params(ArticleFilter),
    responses((status = 200, description = "Published articles", body = [Article]))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let articles = state
        .repo
        .list_published_articles(filter.category_id, filter.search)
        .await?;
    Ok(Json(articles))
}

/// get_article_details
///
/// [Public Route] Single published article. Drafts and soft-deleted rows
/// both read as 404 to anonymous callers.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "Absent, draft, or deleted")
    )
)]
pub async fn get_article_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .filter(|a| a.status == ContentStatus::Publish)
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    Ok(Json(article))
}

// --- Authenticated article CRUD ---

/// create_article
///
/// [Authenticated Route] Any principal kind may author articles; the article
/// is attributed to the caller's `Author` row and starts as a draft.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses((status = 201, description = "Created as draft", body = Article))
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("a title is required".to_string()));
    }
    if state.repo.get_category(payload.category_id).await?.is_none() {
        return Err(ApiError::Validation("unknown category".to_string()));
    }

    let author = resolve_author(&state, &user).await?;
    let article = state.repo.create_article(author.id, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// list_my_articles
///
/// [Authenticated Route] The caller's own articles, drafts included.
#[utoipa::path(
    get,
    path = "/me/articles",
    responses((status = 200, description = "Own articles", body = [Article]))
)]
pub async fn list_my_articles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let author = resolve_author(&state, &user).await?;
    let articles = state.repo.list_articles_by_author(author.id).await?;
    Ok(Json(articles))
}

/// update_article
///
/// [Authenticated Route] Partial update, owner or admin only.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<Article>, ApiError> {
    guard::require_article_owner(&state.repo, &user, id).await?;
    if let Some(category_id) = payload.category_id {
        if state.repo.get_category(category_id).await?.is_none() {
            return Err(ApiError::Validation("unknown category".to_string()));
        }
    }
    let updated = state
        .repo
        .update_article(id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    Ok(Json(updated))
}

/// set_article_status
///
/// [Authenticated Route] Draft/publish flip, freely bidirectional for the
/// owner (and admins).
#[utoipa::path(
    patch,
    path = "/articles/{id}/status",
    request_body = SetContentStatusRequest,
    responses((status = 200, description = "Status changed", body = Article))
)]
pub async fn set_article_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetContentStatusRequest>,
) -> Result<Json<Article>, ApiError> {
    guard::require_article_owner(&state.repo, &user, id).await?;
    let updated = state
        .repo
        .set_article_status(id, payload.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    Ok(Json(updated))
}

/// delete_article
///
/// [Authenticated Route] One-way soft delete. Owners delete silently; an
/// admin removing someone else's article must supply a reason, which is
/// mailed to the author.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    request_body = ReasonRequest,
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Admin removal without a reason"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> Result<StatusCode, ApiError> {
    let article = guard::require_article_owner(&state.repo, &user, id).await?;
    let reason = payload.and_then(|Json(r)| r.reason);
    lifecycle::soft_delete_article(&state.repo, &state.notifier, &user, &article, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Article gallery ---

/// add_article_gallery_image
///
/// [Authenticated Route] Uploads an image (base64 payload) to the blob store
/// and attaches it to the article. Owner or admin only.
#[utoipa::path(
    post,
    path = "/articles/{id}/gallery",
    request_body = AddGalleryImageRequest,
    responses(
        (status = 201, description = "Stored", body = GalleryImage),
        (status = 502, description = "Blob store failure")
    )
)]
pub async fn add_article_gallery_image(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddGalleryImageRequest>,
) -> Result<(StatusCode, Json<GalleryImage>), ApiError> {
    guard::require_article_owner(&state.repo, &user, id).await?;

    let bytes = BASE64
        .decode(payload.data_base64.as_bytes())
        .map_err(|_| ApiError::Validation("image payload is not valid base64".to_string()))?;
    let key = state
        .storage
        .put(bytes, &payload.filename)
        .await
        .map_err(ApiError::Dependency)?;

    let image = state.repo.add_gallery_image(Some(id), None, &key).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// list_article_gallery
///
/// [Public Route] Gallery of a published article.
#[utoipa::path(
    get,
    path = "/articles/{id}/gallery",
    responses((status = 200, description = "Gallery images", body = [GalleryImage]))
)]
pub async fn list_article_gallery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GalleryImage>>, ApiError> {
    state
        .repo
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    let images = state.repo.list_article_gallery(id).await?;
    Ok(Json(images))
}

/// delete_article_gallery_image
///
/// [Authenticated Route] Removes the row, then issues the idempotent blob
/// delete. A blob-store hiccup after the row is gone is logged, not fatal:
/// the orphaned object is unreachable either way.
#[utoipa::path(
    delete,
    path = "/articles/{id}/gallery/{image_id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article_gallery_image(
    user: AuthUser,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    guard::require_article_owner(&state.repo, &user, id).await?;

    let image = state
        .repo
        .get_gallery_image(image_id)
        .await?
        .filter(|img| img.article_id == Some(id))
        .ok_or_else(|| ApiError::NotFound("gallery image not found".to_string()))?;

    state.repo.delete_gallery_image(image.id).await?;
    if let Err(e) = state.storage.delete(&image.path).await {
        tracing::warn!("blob delete failed for {}: {e}", image.path);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Categories (public read) ---

/// list_categories
///
/// [Public Route] Category listing, optionally filtered by kind.
#[utoipa::path(
    get,
    path = "/categories",
    params(CategoryFilter),
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.repo.list_categories(filter.kind).await?;
    Ok(Json(categories))
}

// --- Bookmarks (volunteer) ---

/// add_bookmark
///
/// [Volunteer Route] Pins an article or an event (exactly one target). A
/// duplicate pin on the same target conflicts instead of silently
/// duplicating.
#[utoipa::path(
    post,
    path = "/bookmarks",
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "Bookmarked", body = Bookmark),
        (status = 409, description = "Already bookmarked")
    )
)]
pub async fn add_bookmark(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let volunteer = guard::require_volunteer(&state.repo, &user).await?;

    match (payload.article_id, payload.event_id) {
        (Some(article_id), None) => {
            state
                .repo
                .get_article(article_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
        }
        (None, Some(event_id)) => {
            state
                .repo
                .get_event(event_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
        }
        _ => {
            return Err(ApiError::Validation(
                "exactly one of article_id or event_id must be set".to_string(),
            ));
        }
    }

    let bookmark = state
        .repo
        .add_bookmark(volunteer.id, payload)
        .await?
        .ok_or_else(|| ApiError::Conflict("already bookmarked".to_string()))?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// remove_bookmark
///
/// [Volunteer Route] Removes one of the caller's own bookmarks.
#[utoipa::path(
    delete,
    path = "/bookmarks/{id}",
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_bookmark(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let volunteer = guard::require_volunteer(&state.repo, &user).await?;
    if state.repo.remove_bookmark(id, volunteer.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("bookmark not found".to_string()))
    }
}

/// list_bookmarks
///
/// [Volunteer Route] The caller's own bookmarks, newest first.
#[utoipa::path(
    get,
    path = "/bookmarks",
    responses((status = 200, description = "Bookmarks", body = [Bookmark]))
)]
pub async fn list_bookmarks(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let volunteer = guard::require_volunteer(&state.repo, &user).await?;
    let bookmarks = state.repo.list_bookmarks(volunteer.id).await?;
    Ok(Json(bookmarks))
}
