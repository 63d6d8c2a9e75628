/// User, avatar and subscription endpoints
///
/// - `GET    /api/users` - Paginated user list
/// - `POST   /api/users` - Register
/// - `GET    /api/users/me` - Current user
/// - `PUT    /api/users/me/avatar` - Set avatar
/// - `DELETE /api/users/me/avatar` - Remove avatar
/// - `POST   /api/users/set_password` - Change password
/// - `GET    /api/users/subscriptions` - Authors the caller follows, with recipes
/// - `GET    /api/users/:id` - One user
/// - `POST   /api/users/:id/subscribe` - Follow an author
/// - `DELETE /api/users/:id/subscribe` - Unfollow an author

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    pagination::{PageParams, Paginated},
};
use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
};
use recipebook_shared::{
    auth::{authorization::require_other_user, middleware::AuthContext, password},
    models::{
        recipe::{Recipe, ShortRecipe},
        subscription::Subscription,
        user::{CreateUser, User, UserView},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

/// Usernames that would shadow a route
const RESERVED_USERNAMES: [&str; 1] = ["me"];

/// Letters, digits and `_ . @ + -`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');

    if username.is_empty() || !username.chars().all(allowed) {
        let mut error = ValidationError::new("username_chars");
        error.message =
            Some("Username may contain only letters, digits and the characters _ . @ + -".into());
        return Err(error);
    }

    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| username.eq_ignore_ascii_case(reserved))
    {
        let mut error = ValidationError::new("username_reserved");
        error.message = Some("This username is reserved".into());
        return Err(error);
    }

    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 150, message = "First name must be 1-150 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150, message = "Last name must be 1-150 characters"))]
    pub last_name: String,

    pub password: String,
}

/// Registration answer; no avatar or subscription flag yet
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    pub new_password: String,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub current_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AvatarRequest {
    #[validate(length(min = 1, message = "This field is required"))]
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RecipesLimit {
    /// Caps the `recipes` array of each author
    pub recipes_limit: Option<i64>,
}

/// An author together with their newest recipes
#[derive(Debug, Serialize)]
pub struct AuthorWithRecipes {
    #[serde(flatten)]
    pub user: UserView,

    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

async fn with_recipes(
    state: &AppState,
    user: UserView,
    recipes_limit: Option<i64>,
) -> ApiResult<AuthorWithRecipes> {
    if matches!(recipes_limit, Some(limit) if limit < 0) {
        return Err(ApiError::invalid_field(
            "recipes_limit",
            "recipes_limit must not be negative",
        ));
    }

    let recipes = ShortRecipe::list_by_author(&state.db, user.id, recipes_limit).await?;
    let recipes_count = Recipe::count_by_author(&state.db, user.id).await?;

    Ok(AuthorWithRecipes {
        user,
        recipes,
        recipes_count,
    })
}

/// Paginated list of users
pub async fn list_users(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<UserView>>> {
    let page = params.resolve(state.config.content.page_size)?;

    let count = User::count(&state.db).await?;
    page.ensure_exists(count)?;

    let viewer = auth.map(|a| a.user_id);
    let users = UserView::list(&state.db, viewer, page.limit(), page.offset()).await?;

    Ok(Json(Paginated::new(users, count, page, &uri)))
}

/// Registration
///
/// ```text
/// POST /api/users
///
/// {
///   "email": "cook@example.com",
///   "username": "cook",
///   "first_name": "Julia",
///   "last_name": "Child",
///   "password": "pancakes4ever"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid field, weak password, or email/username taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        },
    )
    .await?;

    info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

/// Current user
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserView>> {
    let user = UserView::find(&state.db, auth.user_id, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(user))
}

/// One user, with the caller's subscription flag
pub async fn get_user(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserView>> {
    let user = UserView::find(&state.db, id, auth.map(|a| a.user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(user))
}

/// Password change; the current password must match
pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::invalid_field(
            "current_password",
            "Invalid password",
        ));
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::invalid_field("new_password", e))?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AvatarRequest>,
) -> ApiResult<Json<AvatarResponse>> {
    req.validate()?;

    let user = User::set_avatar(&state.db, auth.user_id, Some(&req.avatar))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(AvatarResponse {
        avatar: user.avatar,
    }))
}

pub async fn delete_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<StatusCode> {
    User::set_avatar(&state.db, auth.user_id, None)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Authors the caller follows, newest subscription first
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
    Query(limit): Query<RecipesLimit>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<AuthorWithRecipes>>> {
    let page = params.resolve(state.config.content.page_size)?;

    let count = Subscription::count_targets(&state.db, auth.user_id).await?;
    page.ensure_exists(count)?;

    let authors =
        Subscription::list_targets(&state.db, auth.user_id, page.limit(), page.offset()).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(with_recipes(&state, author, limit.recipes_limit).await?);
    }

    Ok(Json(Paginated::new(results, count, page, &uri)))
}

/// Follow an author
///
/// # Errors
///
/// - `404 Not Found`: No such user
/// - `400 Bad Request`: Self-subscription or already subscribed
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Query(limit): Query<RecipesLimit>,
) -> ApiResult<(StatusCode, Json<AuthorWithRecipes>)> {
    let mut author = UserView::find(&state.db, id, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    require_other_user(&auth, id)?;

    if Subscription::create(&state.db, auth.user_id, id).await?.is_none() {
        return Err(ApiError::Conflict(format!(
            "Already subscribed to user {}",
            id
        )));
    }

    info!(subscriber_id = auth.user_id, target_id = id, "Subscribed");

    author.is_subscribed = true;
    let body = with_recipes(&state, author, limit.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Unfollow an author
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !User::exists(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("User {} not found", id)));
    }

    require_other_user(&auth, id)?;

    if !Subscription::delete(&state.db, auth.user_id, id).await? {
        return Err(ApiError::Conflict(format!("Not subscribed to user {}", id)));
    }

    info!(subscriber_id = auth.user_id, target_id = id, "Unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            email: "cook@example.com".to_string(),
            username: username.to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: "pancakes4ever".to_string(),
        }
    }

    #[test]
    fn test_valid_usernames() {
        for name in ["cook", "julia.child", "chef+1", "a_b-c@d", "повар"] {
            assert!(validate_username(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_usernames() {
        for name in ["", "with space", "semi;colon", "slash/name"] {
            assert!(validate_username(name).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_reserved_username() {
        let err = validate_username("Me").unwrap_err();
        assert_eq!(err.code, "username_reserved");
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register_request("cook").validate().is_ok());

        let errors = register_request("bad name").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));

        let mut req = register_request("cook");
        req.email = "nope".to_string();
        req.first_name = String::new();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("first_name"));
    }

    #[test]
    fn test_author_with_recipes_flattens_user() {
        let author = AuthorWithRecipes {
            user: UserView {
                id: 3,
                email: "a@example.com".to_string(),
                username: "author".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                avatar: None,
                is_subscribed: true,
            },
            recipes: vec![ShortRecipe {
                id: 10,
                name: "Soup".to_string(),
                image: "soup.png".to_string(),
                cooking_time: 30,
            }],
            recipes_count: 4,
        };

        let json = serde_json::to_value(&author).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["is_subscribed"], true);
        assert_eq!(json["recipes"][0]["name"], "Soup");
        assert_eq!(json["recipes_count"], 4);
    }
}
