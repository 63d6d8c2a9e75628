/// Token authentication middleware for Axum
///
/// The middleware reads `Authorization: Token <jwt>` (or `Bearer <jwt>`),
/// validates the token and stores an [`AuthContext`] in the request
/// extensions. Requests without the header pass through anonymously; a header
/// that is present but invalid is rejected with 401.
///
/// Handlers declare what they need through extractors:
///
/// - `AuthContext` requires an authenticated user (401 otherwise)
/// - `Option<AuthContext>` accepts anonymous viewers
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use recipebook_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(create_jwt_middleware("your-jwt-secret")));
/// ```

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::debug;

use super::jwt::{validate_token, JwtError};

/// Authentication schemes accepted in the `Authorization` header
const SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Authenticated caller, added to request extensions by the middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
}

impl AuthContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error = match self {
            AuthError::MissingCredentials => "unauthorized",
            AuthError::InvalidFormat(_) | AuthError::InvalidToken(_) => "invalid_token",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": error,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Extracts the raw token from the `Authorization` header
///
/// Returns `Ok(None)` when the header is absent.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid ASCII".to_string()))?;

    SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| {
            AuthError::InvalidFormat("Expected 'Token <token>' or 'Bearer <token>'".to_string())
        })
}

/// Validates the token (if any) and attaches an [`AuthContext`]
pub async fn jwt_auth_middleware(
    secret: Arc<str>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(req.headers())?.map(str::to_owned);
    let Some(token) = token else {
        return Ok(next.run(req).await);
    };

    let claims = validate_token(&token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    let user_id = claims
        .user_id()
        .map_err(|_| AuthError::InvalidToken("Invalid token".to_string()))?;

    debug!(user_id, "Request authenticated");
    req.extensions_mut().insert(AuthContext::new(user_id));

    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Builds a middleware closure that owns a copy of the signing secret, so
/// the returned layer outlives whatever the secret was borrowed from
pub fn create_jwt_middleware(secret: &str) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    let secret: Arc<str> = Arc::from(secret);
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use axum::{body::Body, middleware, routing::get, Router};
    use chrono::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn app() -> Router {
        async fn whoami(auth: Option<AuthContext>) -> String {
            match auth {
                Some(auth) => auth.user_id.to_string(),
                None => "anonymous".to_string(),
            }
        }

        async fn private(auth: AuthContext) -> String {
            auth.user_id.to_string()
        }

        Router::new()
            .route("/whoami", get(whoami))
            .route("/private", get(private))
            .layer(middleware::from_fn(create_jwt_middleware(SECRET)))
    }

    async fn call(uri: &str, authorization: Option<String>) -> (StatusCode, String) {
        let mut request = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }

        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&headers_with("Token abc")).unwrap(), Some("abc"));
        assert_eq!(extract_token(&headers_with("Bearer abc")).unwrap(), Some("abc"));
        assert_eq!(extract_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert!(extract_token(&headers_with("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_token(&headers_with("Token ")).is_err());
    }

    #[tokio::test]
    async fn test_anonymous_request_passes() {
        let (status, body) = call("/whoami", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_valid_token_sets_context() {
        let token = issue_token(17, Duration::hours(1), SECRET).unwrap();

        let (status, body) = call("/whoami", Some(format!("Token {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "17");

        let (status, body) = call("/private", Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "17");
    }

    #[tokio::test]
    async fn test_private_route_requires_credentials() {
        let (status, body) = call("/private", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"error\":\"unauthorized\""));
    }

    #[tokio::test]
    async fn test_invalid_token_rejected_everywhere() {
        let (status, _) = call("/whoami", Some("Token garbage".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let token = issue_token(17, Duration::seconds(-3600), SECRET).unwrap();

        let (status, body) = call("/whoami", Some(format!("Token {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Token expired"));
    }

    #[tokio::test]
    async fn test_layer_outlives_borrowed_secret() {
        let router = {
            let owner = String::from(SECRET);
            Router::new()
                .route("/private", get(|auth: AuthContext| async move { auth.user_id.to_string() }))
                .layer(middleware::from_fn(create_jwt_middleware(&owner)))
        };
        let token = issue_token(5, Duration::hours(1), SECRET).unwrap();

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/private")
                    .header(header::AUTHORIZATION, format!("Token {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
