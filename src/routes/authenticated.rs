use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes accessible to any caller who passed the authorization gate. The gate
/// itself is applied as a middleware layer above this router; every handler here
/// receives a validated `AuthUser` with the caller's id and admin flag, which
/// drives the ownership checks inside the post and comment handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        // GET /users/{id} fetches a public record; PUT applies a partial profile
        // update, permitted to the owner (or an admin).
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        // --- Posts ---
        // POST creates a post owned by the caller; GET lists all posts with
        // author/commenter display fields expanded.
        .route(
            "/posts",
            post(handlers::create_post).get(handlers::list_posts),
        )
        // Single-post read plus owner-or-admin update and delete.
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        // --- Comments ---
        // POST /posts/{id}/comments appends a comment authored by the caller.
        .route("/posts/{id}/comments", post(handlers::add_comment))
        // Edit is author-only; delete is author-or-admin. Both address the
        // comment by its own identity, never by list position.
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // --- Likes ---
        // POST /posts/{id}/like toggles the caller's membership in the likes set.
        .route("/posts/{id}/like", post(handlers::toggle_like))
}
