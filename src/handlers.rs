use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ApiResult},
    models::{
        CreateCommentRequest, CreatePostRequest, LoginRequest, LoginResponse, PostResponse,
        PublicUser, RegisterRequest, UpdateCommentRequest, UpdatePostRequest, UpdateUserRequest,
    },
    repository::UserChanges,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Account & Session ---

/// register
///
/// [Public Route] Creates a new account. The plaintext password is hashed with a
/// randomized salt before anything touches the store; a colliding email surfaces
/// as 409.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = PublicUser),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ApiError::Validation("name and email are required".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(payload.name, payload.email, password_hash)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public Route] Authenticates by email and password, returning a signed token
/// plus the public profile fields.
///
/// Unknown email and wrong password deliberately produce the same response, so
/// the endpoint leaks nothing about which field was wrong.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(ApiError::InvalidCredential)?;

    auth::verify_password(&payload.password, &user.password_hash)?;

    let token = auth::issue_token(user.id, user.is_admin, &state.config)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

// --- Users ---

/// get_user
///
/// [Authenticated Route] Fetches a user's public record by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = PublicUser),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

/// update_user
///
/// [Authenticated Route] Partially updates a profile. Only the profile owner (or
/// an admin) may apply it; a present password is rehashed before storage.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = PublicUser),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    if caller.id != id && !caller.is_admin {
        return Err(ApiError::Forbidden);
    }

    let password_hash = match payload.password.as_deref() {
        Some(plaintext) => Some(auth::hash_password(plaintext)?),
        None => None,
    };

    let changes = UserChanges {
        name: payload.name,
        email: payload.email,
        profile_image_url: payload.profile_image_url,
        password_hash,
    };

    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

/// list_users
///
/// [Admin Route] Lists every user's public record. The admin stage in front of
/// this router has already rejected non-admin callers.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [PublicUser]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

/// delete_user
///
/// [Admin Route] Deletes a user and cascade-deletes every post they own; the
/// whole sequence runs in one transaction so there is no partial-failure window.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.repo.delete_user_with_posts(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("user"))
    }
}

// --- Posts ---

/// create_post
///
/// [Authenticated Route] Creates a post owned by the caller, with empty comment
/// and like collections. The owner is taken from the session, never the body.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses((status = 201, description = "Created", body = PostResponse))
)]
pub async fn create_post(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    let post = state.repo.create_post(id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// list_posts
///
/// [Authenticated Route] Lists all posts, newest first, with the author and each
/// commenter resolved to display fields.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "All posts", body = [PostResponse]))
)]
pub async fn list_posts(
    _caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.repo.list_posts().await?))
}

/// get_post
///
/// [Authenticated Route] Fetches a single post, expanded.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// update_post
///
/// [Authenticated Route] Partially updates a post. Permitted to the owner or an
/// admin; anyone else gets 403 even when the post exists.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let owner = state
        .repo
        .post_owner(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if owner != caller.id && !caller.is_admin {
        return Err(ApiError::Forbidden);
    }

    let post = state
        .repo
        .update_post(id, payload)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post. Owner-or-admin, same policy as update.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let owner = state
        .repo
        .post_owner(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if owner != caller.id && !caller.is_admin {
        return Err(ApiError::Forbidden);
    }

    if state.repo.delete_post(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("post"))
    }
}

// --- Comments & Likes ---

/// add_comment
///
/// [Authenticated Route] Appends a comment authored by the caller and returns
/// the expanded post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = PostResponse),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::Validation("comment text is required".into()));
    }
    let post = state
        .repo
        .add_comment(post_id, user_id, payload.text)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_comment
///
/// [Authenticated Route] Replaces a comment's text. Strictly author-only — there
/// is no admin override for editing someone else's words.
#[utoipa::path(
    put,
    path = "/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = Uuid, Path, description = "Post ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = PostResponse),
        (status = 403, description = "Not Author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<Json<PostResponse>> {
    state
        .repo
        .post_owner(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    let comment = state
        .repo
        .get_comment(post_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    if comment.commented_by != caller.id {
        return Err(ApiError::Forbidden);
    }

    // The comment can vanish between the ownership check and the write.
    if !state
        .repo
        .update_comment(post_id, comment_id, payload.text)
        .await?
    {
        return Err(ApiError::NotFound("comment"));
    }

    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// delete_comment
///
/// [Authenticated Route] Removes a comment by identity, implementing two tiers
/// of authorization: the comment's author, or any admin. All other comments on
/// the post keep their order.
#[utoipa::path(
    delete,
    path = "/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = Uuid, Path, description = "Post ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Deleted", body = PostResponse),
        (status = 403, description = "Not Author or Admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PostResponse>> {
    state
        .repo
        .post_owner(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    let comment = state
        .repo
        .get_comment(post_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    if comment.commented_by != caller.id && !caller.is_admin {
        return Err(ApiError::Forbidden);
    }

    if !state.repo.delete_comment(post_id, comment_id).await? {
        return Err(ApiError::NotFound("comment"));
    }

    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// toggle_like
///
/// [Authenticated Route] Toggles the caller's membership in the post's likes
/// set: present removes, absent adds. Two sequential toggles return the set to
/// its original state.
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Toggled", body = PostResponse),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn toggle_like(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = state
        .repo
        .toggle_like(post_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}
