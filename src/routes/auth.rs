/**
 * Authentication Routes
 * Registration, login, email verification and password reset
 */
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{
    create_access_token, generate_token, hash_password, hash_token, verify_password, AuthUser,
};
use crate::db::models::{NewUser, User, ROLE_ADMIN, ROLE_USER};
use crate::email::EmailMessage;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::StoreError;

/// Password reset links stay valid this long
const RESET_TOKEN_EXPIRY_HOURS: i64 = 1;

const MIN_PASSWORD_LEN: usize = 8;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("Invalid email format"));
    }
    Ok(email)
}

fn check_password_strength(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn issue_token(state: &AppState, user: &User) -> AppResult<String> {
    create_access_token(user, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("failed to create access token: {}", e)))
}

/// Mail failures are logged; the account operation already succeeded.
async fn send_quietly(state: &AppState, message: EmailMessage) {
    if let Err(e) = state.mailer.send(&message).await {
        tracing::warn!(to = %message.to, "Failed to send email: {}", e);
    }
}

fn invalid_token(err: StoreError, what: &str) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::validation(format!("Invalid or expired {} token", what)),
        other => other.into(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email)?;
    check_password_strength(&payload.password)?;

    let password_hash = hash_password(payload.password).await?;
    let verification_token = generate_token();

    let user = state
        .users
        .insert_user(NewUser {
            email,
            name: payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash,
            role: ROLE_USER.to_string(),
            verification_token_hash: Some(hash_token(&verification_token)),
        })
        .await?;

    let link = format!(
        "{}/verify-email?token={}",
        state.config.frontend_url.trim_end_matches('/'),
        verification_token
    );
    send_quietly(&state, EmailMessage::verification(&user.email, &link)).await;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    let access_token = issue_token(&state, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, access_token })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }

    let invalid = || AppError::unauthorized("Invalid email or password");
    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    let access_token = issue_token(&state, &user)?;
    Ok((StatusCode::OK, Json(AuthResponse { user, access_token })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.users.get_user(auth.user_id).await?;
    Ok((StatusCode::OK, Json(UserResponse { user })))
}

/// POST /api/auth/verify-email
/// The configured admin address is promoted here, once the mailbox is proven.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .users
        .verify_email(&hash_token(payload.token.trim()))
        .await
        .map_err(|e| invalid_token(e, "verification"))?;
    tracing::info!(user_id = %user.id, "Email verified");

    let user = if state.config.is_admin_email(&user.email) && !user.is_admin() {
        let promoted = state.users.set_role(user.id, ROLE_ADMIN).await?;
        tracing::info!(user_id = %promoted.id, "Admin role granted");
        promoted
    } else {
        user
    };
    Ok((StatusCode::OK, Json(UserResponse { user })))
}

/// POST /api/auth/forgot-password
/// Always answers the same way so callers cannot enumerate accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let email = normalize_email(&payload.email)?;
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_EXPIRY_HOURS);

    if state
        .users
        .set_reset_token(&email, &hash_token(&token), expires_at)
        .await?
    {
        let link = format!(
            "{}/reset-password?token={}",
            state.config.frontend_url.trim_end_matches('/'),
            token
        );
        send_quietly(&state, EmailMessage::password_reset(&email, &link)).await;
    }

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "If an account exists for that email, a reset link has been sent".to_string(),
        }),
    ))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    check_password_strength(&payload.password)?;
    let password_hash = hash_password(payload.password).await?;

    let user = state
        .users
        .reset_password(&hash_token(payload.token.trim()), &password_hash)
        .await
        .map_err(|e| invalid_token(e, "reset"))?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password has been reset".to_string(),
        }),
    ))
}
