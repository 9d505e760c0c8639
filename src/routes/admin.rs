use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// Routes restricted to identities whose token carries the admin flag. The
/// router is nested under `/admin` and wrapped by two middleware stages: the
/// authorization gate, then the admin stage, which inspects the already-decoded
/// identity and rejects with 403. The admin stage never re-verifies the
/// credential and never queries the store.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Lists every user's public record for moderation and oversight.
        .route("/users", get(handlers::list_users))
        // DELETE /admin/users/{id}
        // Removes a user and cascade-deletes every post they own, in one
        // transaction.
        .route("/users/{id}", delete(handlers::delete_user))
}
