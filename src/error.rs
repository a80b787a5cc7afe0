use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// ApiError
///
/// The single error taxonomy shared by the guard, the lifecycle engine and the
/// handlers. Every variant maps to a stable machine-distinguishable `error`
/// kind in the JSON body plus a human-readable message, so clients can branch
/// on the kind without parsing prose.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input the client must correct.
    #[error("{0}")]
    Validation(String),

    /// Duplicate email, duplicate registration/bookmark, event at capacity.
    #[error("{0}")]
    Conflict(String),

    /// Entity absent, or present but filtered by its soft-delete tombstone.
    #[error("{0}")]
    NotFound(String),

    /// No bearer credential was presented at all.
    #[error("missing bearer token")]
    MissingToken,

    /// Signature, format, or expiry failure on the presented credential,
    /// including already-consumed single-use tokens.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Login failure. Unknown email and wrong password deliberately collapse
    /// into this one message.
    #[error("email or password is incorrect")]
    BadCredentials,

    /// The token's principal kind does not satisfy the endpoint's requirement.
    #[error("this action requires the {0} role")]
    WrongRole(&'static str),

    /// The account exists but its live status forbids the action
    /// (suspended/deactivated/deleted organizer, deleted volunteer).
    #[error("{0}")]
    InactiveAccount(String),

    /// Ownership check resolved a different owner than the caller.
    #[error("you do not own this resource")]
    NotOwner,

    /// Invalid state-machine transition (e.g. approving an unverified organizer).
    #[error("{0}")]
    State(String),

    /// A non-best-effort collaborator call failed (verification email,
    /// contact-form relay, blob store).
    #[error("{0}")]
    Dependency(String),

    /// Unexpected persistence failure.
    #[error("internal server error")]
    Database(#[from] sqlx::Error),

    /// Unexpected in-process failure (credential hasher, token signer).
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    /// Stable machine kind serialized in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::MissingToken | ApiError::InvalidToken | ApiError::BadCredentials => {
                "authentication"
            }
            ApiError::WrongRole(_) | ApiError::InactiveAccount(_) | ApiError::NotOwner => {
                "authorization"
            }
            ApiError::State(_) => "state",
            ApiError::Dependency(_) => "dependency",
            ApiError::Database(_) | ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::State(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingToken | ApiError::InvalidToken | ApiError::BadCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::WrongRole(_) | ApiError::InactiveAccount(_) | ApiError::NotOwner => {
                StatusCode::FORBIDDEN
            }
            ApiError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Persistence failures are logged with full detail server-side but never
        // leaked to the client.
        if let ApiError::Database(ref e) = self {
            tracing::error!("database error: {:?}", e);
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
