/// Token endpoints
///
/// - `POST /api/auth/token/login` - Exchange email + password for a token
/// - `POST /api/auth/token/logout` - Acknowledge logout
///
/// Tokens are stateless JWTs. Logout exists for client compatibility and
/// only checks that the caller is authenticated.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
};
use axum::{extract::State, http::StatusCode};
use recipebook_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::user::User,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

/// Login
///
/// ```text
/// POST /api/auth/token/login
///
/// { "email": "cook@example.com", "password": "pancakes4ever" }
/// ```
///
/// ```json
/// { "auth_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed request, or wrong email / password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let invalid = || ApiError::BadRequest("Unable to log in with provided credentials".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }

    let auth_token = jwt::issue_token(user.id, state.config.jwt_ttl(), state.jwt_secret())?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse { auth_token }))
}

/// Logout; the client discards its token
pub async fn logout(auth: AuthContext) -> StatusCode {
    info!(user_id = auth.user_id, "User logged out");
    StatusCode::NO_CONTENT
}
