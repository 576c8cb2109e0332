//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use crate::error::{ApiError, ErrorBody};
use crate::web::forms::{self, password_strength};
use crate::web::{middleware::session_cookie, state::AppState};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use learnhub_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Enter a valid email address")
    )]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "password_strength", message = "Password must contain a letter and a number")
    )]
    pub password: String,
    #[validate(length(min = 1, max = 80, message = "Name must be 1 to 80 characters"))]
    pub display_name: String,
}

impl SignupRequest {
    /// Emails are compared case-insensitively; names are stored trimmed.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            display_name: self.display_name.trim().to_string(),
            ..self
        }
    }
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Enter a valid email address")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            ..self
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
}

//=========================================================================================
// Session helpers
//=========================================================================================

/// Creates an auth session for the user and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            e
        })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        ttl.num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Invalid form fields", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.normalized();
    forms::check(&req).into_result()?;

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let user = state
        .db
        .create_user_with_email(&req.email, &req.display_name, &password_hash)
        .await
        .map_err(|e| {
            error!("Failed to create user: {:?}", e);
            e
        })?;

    // 3. Start a session and hand back the cookie
    let cookie = start_session(&state, user.user_id).await?;
    info!("User {} signed up", user.user_id);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: user.user_id,
            email: user.email,
            display_name: user.display_name,
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 422, description = "Invalid form fields", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.normalized();
    forms::check(&req).into_result()?;

    // 1. Get user by email
    let user_creds = state.db.get_user_by_email(&req.email).await.map_err(|e| match e {
        PortError::NotFound(_) => ApiError::Unauthorized,
        other => {
            error!("Failed to get user: {:?}", other);
            ApiError::Port(other)
        }
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::Unauthorized);
    }

    // 3. Start a session and hand back the cookie
    let user = state.db.get_user(user_creds.user_id).await?;
    let cookie = start_session(&state, user.user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: user.user_id,
            email: user.email,
            display_name: user.display_name,
        }),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id = session_cookie(&headers).ok_or(ApiError::Unauthorized)?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            e
        })?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}
