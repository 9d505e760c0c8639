/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// so that access control is applied explicitly at the module level (via Axum
/// layers) rather than remembered per handler.
///
/// The three modules map directly onto the access tiers.

/// Routes accessible to anonymous callers: health, register, login.
pub mod public;

/// Routes behind the authorization gate. Requires a valid bearer token.
pub mod authenticated;

/// Routes behind the gate plus the admin stage. Requires the admin flag.
pub mod admin;
