use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    repository::RepositoryState,
};

/// Session token lifetime: 24 hours.
const TOKEN_TTL_SECS: u64 = 86_400;

/// Claims
///
/// The payload signed into every session JWT. Besides the standard subject and
/// timestamps it carries the principal-kind tag and the elevated-privilege
/// flag, which together drive every authorization decision downstream.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the principal's UUID.
    pub sub: Uuid,
    /// The principal kind baked into the token at login.
    pub role: Role,
    /// Elevated-privilege flag. Set only on admin logins; universally satisfies
    /// role checks and bypasses ownership checks.
    #[serde(default)]
    pub admin_override: bool,
    /// Expiration Time (exp): timestamp after which the JWT must be refused.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, produced by the extractor
/// below. Guards and handlers dispatch on `role` exhaustively and consult
/// `admin_override` for the admin bypass.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub admin_override: bool,
}

/// issue_token
///
/// Signs a session JWT for a freshly authenticated principal.
pub fn issue_token(
    config: &AppConfig,
    role: Role,
    principal_id: Uuid,
    admin_override: bool,
) -> Result<String, ApiError> {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .as_secs();

    let claims = Claims {
        sub: principal_id,
        role,
        admin_override,
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| ApiError::Internal(e.to_string()))
}

/// hash_password
///
/// Argon2id with a per-credential random salt, producing a self-describing PHC
/// string. Deliberately slow; never called on a hot path.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// Constant-time verification against a stored PHC string. A malformed stored
/// hash verifies as false rather than erroring, so login failure messages stay
/// uniform.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler. The extractor establishes
/// *who* is calling; *whether they may act* is decided afterwards by the guard
/// module, which re-fetches live account status where the endpoint demands it.
///
/// The process:
/// 1. Local Bypass: in `Env::Local`, the `x-act-as` header (`role:uuid`) grants
///    the identity if that principal actually exists in the repository.
/// 2. Token extraction: standard Bearer parsing.
/// 3. JWT decoding with mandatory expiry validation.
///
/// Rejection: `ApiError::MissingToken` when no credential is presented,
/// `ApiError::InvalidToken` for any signature/format/expiry failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass: `x-act-as: organizer:<uuid>` etc. The
        // principal must exist so role handling stays realistic.
        if config.env == Env::Local {
            if let Some(value) = parts.headers.get("x-act-as") {
                if let Ok(raw) = value.to_str() {
                    if let Some((role_str, id_str)) = raw.split_once(':') {
                        if let Ok(id) = Uuid::parse_str(id_str) {
                            let resolved = match role_str {
                                "admin" => repo.get_admin(id).await.ok().flatten().map(|a| {
                                    AuthUser {
                                        id: a.id,
                                        role: Role::Admin,
                                        admin_override: true,
                                    }
                                }),
                                "organizer" => {
                                    repo.get_organizer(id).await.ok().flatten().map(|o| {
                                        AuthUser {
                                            id: o.id,
                                            role: Role::Organizer,
                                            admin_override: false,
                                        }
                                    })
                                }
                                "volunteer" => {
                                    repo.get_volunteer(id).await.ok().flatten().map(|v| {
                                        AuthUser {
                                            id: v.id,
                                            role: Role::Volunteer,
                                            admin_override: false,
                                        }
                                    })
                                }
                                _ => None,
                            };
                            if let Some(user) = resolved {
                                return Ok(user);
                            }
                        }
                    }
                }
            }
        }
        // Production, or bypass fell through: standard JWT validation.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::MissingToken)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        // Expiration validation is always active; a stale token is as bad as a
        // forged one.
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|_| ApiError::InvalidToken)?;

        Ok(AuthUser {
            id: token_data.claims.sub,
            role: token_data.claims.role,
            admin_override: token_data.claims.admin_override,
        })
    }
}
