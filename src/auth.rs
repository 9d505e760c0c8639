use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{ApiError, ApiResult},
};

/// Claims
///
/// The payload embedded in every issued identity token. The claims are signed with
/// the server's secret and validated on every authenticated request.
///
/// The `admin` flag is trusted from the token for the lifetime of the token: the
/// gate never re-checks the store, so revoking admin rights takes effect only once
/// the token expires. That tradeoff is deliberate — the alternative (a store
/// round-trip per request) buys freshness at the cost of a query on every call.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the UUID of the user.
    pub sub: Uuid,
    /// Whether the user held the admin flag at issue time.
    pub admin: bool,
    /// Expiration time: timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

/// Produces a signed token embedding the user id and admin flag, expiring after
/// the configured TTL.
pub fn issue_token(user_id: Uuid, is_admin: bool, config: &AppConfig) -> ApiResult<String> {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let claims = Claims {
        sub: user_id,
        admin: is_admin,
        iat: now as usize,
        exp: (now + config.token_ttl_secs) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Verifies a token's signature and expiry, returning the embedded claims.
/// Any failure — bad signature, garbage input, expired token — collapses into
/// `InvalidCredential`.
pub fn decode_token(token: &str, secret: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| ApiError::InvalidCredential)
}

// --- Password hashing ---

/// Hashes a plaintext password with Argon2id and a freshly generated random salt.
/// The returned PHC string is what gets persisted; the plaintext is never stored.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(rand::thread_rng());
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Hash(e.to_string()))
}

/// Verifies a plaintext password against a stored PHC hash string.
/// A mismatch is `InvalidCredential`, indistinguishable from an unknown email at
/// the login endpoint.
pub fn verify_password(password: &str, hash: &str) -> ApiResult<()> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| ApiError::Hash(e.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredential)
}

/// AuthUser
///
/// The resolved identity of an authenticated request — the output of the
/// authorization gate. Handlers take this as an argument to receive the caller's
/// id and admin flag.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The unique identifier of the user, from the token's `sub` claim.
    pub id: Uuid,
    /// The admin flag, from the token's `admin` claim.
    pub is_admin: bool,
}

/// AuthUser extractor
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a function
/// argument in any authenticated handler and as the middleware guard in front of
/// the authenticated router.
///
/// The gate is purely advisory and stateless per request:
/// 1. Extract the `Authorization: Bearer` header — missing or unparseable is
///    `Unauthenticated`.
/// 2. Verify signature and expiry against the shared secret — any failure is
///    `InvalidCredential`.
/// 3. Attach the decoded claims to the request context. No store lookup happens
///    here; the admin flag is trusted from the token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let claims = decode_token(token, &config.jwt_secret)?;

        Ok(AuthUser {
            id: claims.sub,
            is_admin: claims.admin,
        })
    }
}
