//! Session authentication: the `CurrentUser` extractor and the
//! `/auth/*` handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/sign-up` | `{name, email, password}`; 409 on a taken email |
//! | `POST` | `/auth/sign-in` | `{email, password}`; 401 on bad credentials |
//! | `POST` | `/auth/sign-out` | Always 204 |
//! | `GET`  | `/auth/me` | 401 without a session |
//! | `PATCH`| `/auth/me` | `{name?, email?, image?}`; 409 on a taken email |
//!
//! Tokens travel as `Authorization: Bearer <token>` or in the
//! [`SESSION_COOKIE`] cookie. Only their SHA-256 digest reaches the store.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use outreach_core::{
  store::OutreachStore,
  user::{NewSession, NewUser, User, UserPatch},
};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{
  ApiState,
  error::{ApiError, ApiJson},
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "outreach.session_token";

pub const MIN_PASSWORD_LEN: usize = 8;

// ─── Tokens & passwords ──────────────────────────────────────────────────────

/// 32 random bytes, base64url encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The digest under which a token is stored.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// The bearer token, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());
  if bearer.is_some() {
    return bearer;
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when there is no valid
/// session and demo mode is off.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
  S: OutreachStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(token) = session_token(&parts.headers) {
      let digest = hash_token(token);
      if let Some(user) = state.bounded(state.store.session_user(digest)).await? {
        return Ok(CurrentUser(user));
      }
    }

    if state.config.demo_mode
      && let Some(demo_id) = &state.config.demo_user_id
    {
      if let Some(user) = state.bounded(state.store.get_user(demo_id.clone())).await? {
        tracing::debug!(user_id = %user.id, "acting as demo user");
        return Ok(CurrentUser(user));
      }
      tracing::warn!(demo_user_id = %demo_id, "demo mode is on but the demo user does not exist");
    }

    Err(ApiError::Unauthorized)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
  pub token: String,
  pub user:  User,
}

#[derive(Debug, Serialize)]
pub struct Me {
  pub user: User,
}

/// `POST /auth/sign-up`
pub async fn sign_up<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  ApiJson(body): ApiJson<SignUpBody>,
) -> Result<Response, ApiError>
where
  S: OutreachStore + 'static,
{
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::Validation(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  let password_hash = hash_password(&body.password)?;

  let user = state
    .bounded(state.store.create_user(NewUser {
      name: body.name,
      email: body.email,
      password_hash,
    }))
    .await?;
  tracing::info!(user_id = %user.id, "user signed up");

  open_session(&state, user, &headers).await
}

/// `POST /auth/sign-in`
pub async fn sign_in<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  ApiJson(body): ApiJson<SignInBody>,
) -> Result<Response, ApiError>
where
  S: OutreachStore + 'static,
{
  let credential = state
    .bounded(state.store.find_credential(body.email))
    .await?
    .filter(|c| verify_password(&body.password, &c.password_hash))
    .ok_or(ApiError::Unauthorized)?;

  tracing::info!(user_id = %credential.user.id, "user signed in");
  open_session(&state, credential.user, &headers).await
}

/// `POST /auth/sign-out`
pub async fn sign_out<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: OutreachStore + 'static,
{
  if let Some(token) = session_token(&headers) {
    let digest = hash_token(token);
    state.bounded(state.store.delete_session(digest)).await?;
  }
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, session_cookie("", 0))]).into_response())
}

/// `GET /auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Me> { Json(Me { user }) }

/// `PATCH /auth/me`
pub async fn update_me<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Json<Me>, ApiError>
where
  S: OutreachStore + 'static,
{
  let user = state
    .bounded(state.store.update_user(user.id, patch))
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
  tracing::info!(user_id = %user.id, "profile updated");
  Ok(Json(Me { user }))
}

async fn open_session<S>(
  state: &ApiState<S>,
  user: User,
  headers: &HeaderMap,
) -> Result<Response, ApiError>
where
  S: OutreachStore + 'static,
{
  let token = new_token();
  let ttl = state.config.session_ttl;

  let ip_address = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(|v| v.trim().to_owned());
  let user_agent = headers
    .get(header::USER_AGENT)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  state
    .bounded(state.store.create_session(NewSession {
      user_id: user.id.clone(),
      token_hash: hash_token(&token),
      expires_at: Utc::now() + ttl,
      ip_address,
      user_agent,
    }))
    .await?;

  let cookie = session_cookie(&token, ttl.num_seconds());
  Ok(([(header::SET_COOKIE, cookie)], Json(AuthResponse { token, user })).into_response())
}

fn session_cookie(token: &str, max_age: i64) -> HeaderValue {
  let cookie =
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
  // Tokens are base64url, so the cookie is always a valid header value.
  HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}
