use crate::{
    error::{ApiError, ApiResult},
    models::{
        Comment, CommentResponse, CreatePostRequest, PostResponse, UpdatePostRequest, User,
        UserSummary,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, error::ErrorKind};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// UserChanges
///
/// The partial field set applied by a profile update. Built by the handler —
/// which is where a present plaintext password gets rehashed — so the repository
/// only ever sees a finished hash.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_image_url: Option<String>,
    pub password_hash: Option<String>,
}

/// Repository
///
/// The abstract contract for all persistence operations: the credential store,
/// the post store, and the comment/like mutator. Handlers interact with the data
/// layer through this trait only, which keeps them testable against an in-memory
/// implementation.
///
/// Errors out of the store propagate as `ApiError` — a failed query is a 500,
/// never a silently empty result. `Option`/`bool` returns encode "the referenced
/// entity was absent", which handlers map to `NotFound`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---

    /// Persists a new user with the given (already hashed) password.
    /// An existing email surfaces as `ApiError::DuplicateEmail`.
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> ApiResult<User>;

    /// Looks a user up by email for login. `None` means unknown email; the
    /// handler must render that identically to a wrong password.
    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>>;

    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>>;

    async fn list_users(&self) -> ApiResult<Vec<User>>;

    /// Applies the fields present in `changes`; absent fields are untouched.
    /// Returns `None` if the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>>;

    /// Deletes the user's posts and then the user record in one transaction,
    /// so a mid-sequence failure cannot leave orphaned halves. Foreign keys
    /// sweep the user's comments and likes along with it.
    async fn delete_user_with_posts(&self, id: Uuid) -> ApiResult<bool>;

    // --- Post Store ---

    /// Persists a new post owned by `owner` with empty comments and likes,
    /// returning it expanded.
    async fn create_post(&self, owner: Uuid, req: CreatePostRequest) -> ApiResult<PostResponse>;

    /// All posts, newest first, with author and commenter display fields
    /// resolved at read time.
    async fn list_posts(&self) -> ApiResult<Vec<PostResponse>>;

    async fn get_post(&self, id: Uuid) -> ApiResult<Option<PostResponse>>;

    /// The owning user id of a post, used for ownership checks before mutation.
    async fn post_owner(&self, id: Uuid) -> ApiResult<Option<Uuid>>;

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> ApiResult<Option<PostResponse>>;

    async fn delete_post(&self, id: Uuid) -> ApiResult<bool>;

    // --- Comment/Like Mutator ---

    /// Appends a comment authored by `user_id`. `None` means the post is gone.
    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> ApiResult<Option<PostResponse>>;

    /// Fetches one comment by identity, scoped to its parent post. Used for the
    /// ownership check before an edit or delete.
    async fn get_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<Option<Comment>>;

    /// Replaces a comment's text. `false` if the comment (or post pairing) is gone.
    async fn update_comment(&self, post_id: Uuid, comment_id: Uuid, text: String)
    -> ApiResult<bool>;

    /// Removes a comment by identity — never by position, so it stays correct
    /// when neighbours are edited concurrently.
    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<bool>;

    /// Toggles `user_id`'s membership in the post's likes set. Membership lives
    /// behind the composite primary key, so a duplicate like is impossible even
    /// under concurrent toggles. `None` means the post is gone.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<Option<PostResponse>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are runtime-checked (`sqlx::query_as`) so the crate builds without a
/// live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// --- Join Rows (internal) ---

/// A post row with its author's display fields already joined in.
#[derive(Debug, FromRow)]
struct PostWithAuthorRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_image: Option<String>,
}

/// A comment row with its author's display fields already joined in.
#[derive(Debug, FromRow)]
struct CommentWithAuthorRow {
    id: Uuid,
    post_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_image: Option<String>,
}

#[derive(Debug, FromRow)]
struct LikeRow {
    post_id: Uuid,
    user_id: Uuid,
}

const POST_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.title, p.description, p.image_url, p.created_at, p.updated_at,
           u.id AS author_id, u.name AS author_name, u.profile_image_url AS author_image
    FROM posts p
    JOIN users u ON p.posted_by = u.id
"#;

const COMMENT_WITH_AUTHOR: &str = r#"
    SELECT c.id, c.post_id, c.text, c.created_at,
           u.id AS author_id, u.name AS author_name, u.profile_image_url AS author_image
    FROM comments c
    JOIN users u ON c.commented_by = u.id
"#;

impl PostWithAuthorRow {
    /// Assembles the expanded response from the joined row plus this post's
    /// comments (insertion order) and likes.
    fn into_response(self, comments: Vec<CommentWithAuthorRow>, likes: Vec<Uuid>) -> PostResponse {
        PostResponse {
            id: self.id,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            posted_by: UserSummary {
                id: self.author_id,
                name: self.author_name,
                profile_image_url: self.author_image,
            },
            comments: comments
                .into_iter()
                .map(|c| CommentResponse {
                    id: c.id,
                    text: c.text,
                    commented_by: UserSummary {
                        id: c.author_id,
                        name: c.author_name,
                        profile_image_url: c.author_image,
                    },
                    created_at: c.created_at,
                })
                .collect(),
            likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Maps a unique-constraint violation (the email index) onto `DuplicateEmail`;
/// everything else stays a database error.
fn map_unique_violation(e: sqlx::Error) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::UniqueViolation) => {
            ApiError::DuplicateEmail
        }
        _ => ApiError::from(e),
    }
}

/// True when the error is a foreign-key violation, i.e. the referenced parent
/// row vanished between check and write.
fn is_fk_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::ForeignKeyViolation))
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Credential Store ---

    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> ApiResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, false, NOW(), NOW())
            RETURNING id, name, email, password_hash, is_admin, profile_image_url,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_admin, profile_image_url,
                   created_at, updated_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_admin, profile_image_url,
                   created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_admin, profile_image_url,
                   created_at, updated_at
            FROM users ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Partial update via COALESCE: a column is only touched when the
    /// corresponding field in `changes` is `Some`.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                profile_image_url = COALESCE($4, profile_image_url),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, is_admin, profile_image_url,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.profile_image_url)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn delete_user_with_posts(&self, id: Uuid) -> ApiResult<bool> {
        // Posts first, then the user record, atomically. The ON DELETE CASCADE
        // constraints remove the comments and likes hanging off both.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM posts WHERE posted_by = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    // --- Post Store ---

    async fn create_post(&self, owner: Uuid, req: CreatePostRequest) -> ApiResult<PostResponse> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO posts (id, title, description, image_url, posted_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.description)
        .bind(req.image_url)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        self.get_post(id)
            .await?
            .ok_or(ApiError::NotFound("post"))
    }

    async fn list_posts(&self) -> ApiResult<Vec<PostResponse>> {
        let posts = sqlx::query_as::<_, PostWithAuthorRow>(&format!(
            "{POST_WITH_AUTHOR} ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

        let comments = sqlx::query_as::<_, CommentWithAuthorRow>(&format!(
            "{COMMENT_WITH_AUTHOR} WHERE c.post_id = ANY($1) ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let likes = sqlx::query_as::<_, LikeRow>(
            "SELECT post_id, user_id FROM post_likes WHERE post_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        // Bucket the relations per post, preserving query order within each bucket.
        let mut comments_by_post: HashMap<Uuid, Vec<CommentWithAuthorRow>> = HashMap::new();
        for comment in comments {
            comments_by_post
                .entry(comment.post_id)
                .or_default()
                .push(comment);
        }
        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for like in likes {
            likes_by_post
                .entry(like.post_id)
                .or_default()
                .push(like.user_id);
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = comments_by_post.remove(&post.id).unwrap_or_default();
                let likes = likes_by_post.remove(&post.id).unwrap_or_default();
                post.into_response(comments, likes)
            })
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> ApiResult<Option<PostResponse>> {
        let Some(post) =
            sqlx::query_as::<_, PostWithAuthorRow>(&format!("{POST_WITH_AUTHOR} WHERE p.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let comments = sqlx::query_as::<_, CommentWithAuthorRow>(&format!(
            "{COMMENT_WITH_AUTHOR} WHERE c.post_id = $1 ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let likes: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM post_likes WHERE post_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(post.into_response(comments, likes)))
    }

    async fn post_owner(&self, id: Uuid) -> ApiResult<Option<Uuid>> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT posted_by FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> ApiResult<Option<PostResponse>> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.image_url)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_post(id).await,
            None => Ok(None),
        }
    }

    async fn delete_post(&self, id: Uuid) -> ApiResult<bool> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    // --- Comment/Like Mutator ---

    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> ApiResult<Option<PostResponse>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, commented_by, text, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(text)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => self.get_post(post_id).await,
            // The post was deleted out from under us: report it as absent.
            Err(e) if is_fk_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, text, commented_by, created_at
            FROM comments WHERE post_id = $1 AND id = $2
            "#,
        )
        .bind(post_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        text: String,
    ) -> ApiResult<bool> {
        let updated = sqlx::query("UPDATE comments SET text = $3 WHERE post_id = $1 AND id = $2")
            .bind(post_id)
            .bind(comment_id)
            .bind(text)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<bool> {
        let deleted = sqlx::query("DELETE FROM comments WHERE post_id = $1 AND id = $2")
            .bind(post_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<Option<PostResponse>> {
        // The composite primary key on (post_id, user_id) is the set-membership
        // primitive: the insert either adds the member or affects zero rows, and
        // zero rows means the member was present, so it gets removed.
        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;

        let inserted = match inserted {
            Ok(res) => res.rows_affected(),
            Err(e) if is_fk_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if inserted == 0 {
            // Already liked: removal is idempotent on absence, so a concurrent
            // double-unlike stays harmless.
            sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        }

        self.get_post(post_id).await
    }
}
