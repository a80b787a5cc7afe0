/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The three modules map directly to the access tiers of the platform.

/// Routes accessible to all users (anonymous). Data handlers in here must
/// enforce visibility (published / approved-organizer / non-deleted) at the
/// repository level.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware. Fine-grained
/// role, account-status and ownership checks happen in the guard per handler.
pub mod authenticated;

/// Routes restricted exclusively to principals carrying the admin override.
pub mod admin;
