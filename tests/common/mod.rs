#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use campfeed::{
    AppState,
    config::AppConfig,
    error::{ApiError, ApiResult},
    models::{
        Comment, CommentResponse, CreatePostRequest, Post, PostResponse, UpdatePostRequest, User,
        UserSummary,
    },
    repository::{Repository, RepositoryState, UserChanges},
};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

// --- In-Memory Repository ---

// Test double for the persistence layer. Unlike a canned-response mock it keeps
// real state behind a mutex and mirrors the Postgres implementation's
// semantics (unique email, insertion-ordered comments, set-membership likes),
// so the behavioural tests exercise the same contracts the handlers see in
// production.
#[derive(Default)]
struct Inner {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    // (post_id, user_id) pairs in insertion order; membership is unique.
    likes: Vec<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

fn summary(users: &[User], id: Uuid) -> UserSummary {
    let user = users
        .iter()
        .find(|u| u.id == id)
        .expect("referenced user must exist");
    UserSummary {
        id: user.id,
        name: user.name.clone(),
        profile_image_url: user.profile_image_url.clone(),
    }
}

fn expand(inner: &Inner, post: &Post) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title.clone(),
        description: post.description.clone(),
        image_url: post.image_url.clone(),
        posted_by: summary(&inner.users, post.posted_by),
        comments: inner
            .comments
            .iter()
            .filter(|c| c.post_id == post.id)
            .map(|c| CommentResponse {
                id: c.id,
                text: c.text.clone(),
                commented_by: summary(&inner.users, c.commented_by),
                created_at: c.created_at,
            })
            .collect(),
        likes: inner
            .likes
            .iter()
            .filter(|(p, _)| *p == post.id)
            .map(|(_, u)| *u)
            .collect(),
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> ApiResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == email) {
            return Err(ApiError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            is_admin: false,
            profile_image_url: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.clone())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(email) = &changes.email
            && inner.users.iter().any(|u| u.email == *email && u.id != id)
        {
            return Err(ApiError::DuplicateEmail);
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(url) = changes.profile_image_url {
            user.profile_image_url = Some(url);
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user_with_posts(&self, id: Uuid) -> ApiResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner.users.iter().any(|u| u.id == id);
        if !existed {
            return Ok(false);
        }
        let doomed_posts: Vec<Uuid> = inner
            .posts
            .iter()
            .filter(|p| p.posted_by == id)
            .map(|p| p.id)
            .collect();
        inner.posts.retain(|p| p.posted_by != id);
        // FK cascades: comments/likes on the deleted posts, plus the user's own
        // comments and likes elsewhere.
        inner
            .comments
            .retain(|c| !doomed_posts.contains(&c.post_id) && c.commented_by != id);
        inner
            .likes
            .retain(|(p, u)| !doomed_posts.contains(p) && *u != id);
        inner.users.retain(|u| u.id != id);
        Ok(true)
    }

    async fn create_post(&self, owner: Uuid, req: CreatePostRequest) -> ApiResult<PostResponse> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            image_url: req.image_url,
            posted_by: owner,
            created_at: now,
            updated_at: now,
        };
        inner.posts.push(post.clone());
        Ok(expand(&inner, &post))
    }

    async fn list_posts(&self) -> ApiResult<Vec<PostResponse>> {
        let inner = self.inner.lock().unwrap();
        // Newest first, matching the Postgres ORDER BY created_at DESC.
        Ok(inner
            .posts
            .iter()
            .rev()
            .map(|p| expand(&inner, p))
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> ApiResult<Option<PostResponse>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| expand(&inner, p)))
    }

    async fn post_owner(&self, id: Uuid) -> ApiResult<Option<Uuid>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.posts.iter().find(|p| p.id == id).map(|p| p.posted_by))
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> ApiResult<Option<PostResponse>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(post) = inner.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(description) = req.description {
            post.description = Some(description);
        }
        if let Some(image_url) = req.image_url {
            post.image_url = Some(image_url);
        }
        post.updated_at = Utc::now();
        let post = post.clone();
        Ok(Some(expand(&inner, &post)))
    }

    async fn delete_post(&self, id: Uuid) -> ApiResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner.posts.iter().any(|p| p.id == id);
        inner.posts.retain(|p| p.id != id);
        inner.comments.retain(|c| c.post_id != id);
        inner.likes.retain(|(p, _)| *p != id);
        Ok(existed)
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> ApiResult<Option<PostResponse>> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.posts.iter().any(|p| p.id == post_id) {
            return Ok(None);
        }
        inner.comments.push(Comment {
            id: Uuid::new_v4(),
            post_id,
            text,
            commented_by: user_id,
            created_at: Utc::now(),
        });
        let post = inner
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .unwrap();
        Ok(Some(expand(&inner, &post)))
    }

    async fn get_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<Option<Comment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .comments
            .iter()
            .find(|c| c.post_id == post_id && c.id == comment_id)
            .cloned())
    }

    async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        text: String,
    ) -> ApiResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .comments
            .iter_mut()
            .find(|c| c.post_id == post_id && c.id == comment_id)
        {
            Some(comment) => {
                comment.text = text;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> ApiResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner
            .comments
            .iter()
            .any(|c| c.post_id == post_id && c.id == comment_id);
        inner
            .comments
            .retain(|c| !(c.post_id == post_id && c.id == comment_id));
        Ok(existed)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<Option<PostResponse>> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.posts.iter().any(|p| p.id == post_id) {
            return Ok(None);
        }
        let member = inner.likes.iter().any(|l| *l == (post_id, user_id));
        if member {
            inner.likes.retain(|l| *l != (post_id, user_id));
        } else {
            inner.likes.push((post_id, user_id));
        }
        let post = inner
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .unwrap();
        Ok(Some(expand(&inner, &post)))
    }
}

// --- Router Harness ---

/// Builds the full application router around the in-memory repository, using
/// the default (test) configuration so the token secret is known.
pub fn test_app(repo: Arc<MemoryRepository>) -> Router {
    test_app_with(repo as RepositoryState)
}

/// Same harness, for tests that bring their own `Repository` implementation.
pub fn test_app_with(repo: RepositoryState) -> Router {
    let state = AppState {
        repo,
        config: AppConfig::default(),
    };
    campfeed::create_router(state)
}

/// Mints a real token with the test secret, as a successful login would.
pub fn token_for(user_id: Uuid, is_admin: bool) -> String {
    campfeed::auth::issue_token(user_id, is_admin, &AppConfig::default())
        .expect("token signing in tests")
}

/// Seeds a user directly into the repository with a real argon2 hash, and
/// returns the record.
pub async fn seed_user(repo: &Arc<MemoryRepository>, name: &str, email: &str) -> User {
    let hash = campfeed::auth::hash_password("hunter2!").unwrap();
    repo.create_user(name.to_string(), email.to_string(), hash)
        .await
        .unwrap()
}

/// Seeds an admin by flipping the flag after creation (registration itself can
/// never mint admins).
pub async fn seed_admin(repo: &Arc<MemoryRepository>, name: &str, email: &str) -> User {
    let user = seed_user(repo, name, email).await;
    {
        let mut inner = repo.inner.lock().unwrap();
        inner
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .unwrap()
            .is_admin = true;
    }
    repo.get_user(user.id).await.unwrap().unwrap()
}

/// Drives one request through the router and returns status plus parsed JSON
/// body (`Value::Null` when the body is empty).
pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
