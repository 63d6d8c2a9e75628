/// Favorites, shopping cart and shopping list download
///
/// - `POST   /api/recipes/:id/favorite` - Add to favorites
/// - `DELETE /api/recipes/:id/favorite` - Remove from favorites
/// - `POST   /api/recipes/:id/shopping_cart` - Add to cart
/// - `DELETE /api/recipes/:id/shopping_cart` - Remove from cart
/// - `GET    /api/recipes/download_shopping_cart` - Aggregated cart as text

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path},
};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use recipebook_shared::{
    auth::middleware::AuthContext,
    collections::{self, Collection},
    models::recipe::ShortRecipe,
    shopping_list,
};
use tracing::error;

/// ASCII fallback for clients that ignore `filename*`
const FALLBACK_FILENAME: &str = "shopping_list.txt";

async fn add(
    state: &AppState,
    auth: AuthContext,
    collection: Collection,
    recipe_id: i64,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    let recipe = collections::add(&state.collections, collection, auth.user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove(
    state: &AppState,
    auth: AuthContext,
    collection: Collection,
    recipe_id: i64,
) -> ApiResult<StatusCode> {
    collections::remove(&state.collections, collection, auth.user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add(&state, auth, Collection::Favorites, id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove(&state, auth, Collection::Favorites, id).await
}

pub async fn add_to_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add(&state, auth, Collection::ShoppingCart, id).await
}

pub async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove(&state, auth, Collection::ShoppingCart, id).await
}

/// RFC 5987 `attr-char` percent-encoding for `filename*`
fn encode_filename(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric()
            || matches!(byte, b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
        {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        FALLBACK_FILENAME,
        encode_filename(filename)
    )
}

/// Shopping list of everything in the caller's cart
///
/// ```text
/// GET /api/recipes/download_shopping_cart
///
/// Content-Type: text/plain; charset=utf-8
/// Content-Disposition: attachment; filename="shopping_list.txt"; filename*=UTF-8''...
///
/// Flour - 300(g)
/// Salt - 15(g)
/// ```
///
/// An empty cart downloads an empty document.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    let list = shopping_list::build(&state.db, auth.user_id).await?;

    let disposition = content_disposition(&state.config.content.shopping_list_filename);
    let disposition = HeaderValue::from_str(&disposition).unwrap_or_else(|e| {
        error!(error = %e, "Unusable shopping list filename");
        HeaderValue::from_static("attachment; filename=\"shopping_list.txt\"")
    });

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        list.render(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SHOPPING_LIST_FILENAME;

    #[test]
    fn test_encode_ascii_filename() {
        assert_eq!(encode_filename("list.txt"), "list.txt");
        assert_eq!(encode_filename("my list.txt"), "my%20list.txt");
        assert_eq!(encode_filename("a\"b"), "a%22b");
    }

    #[test]
    fn test_encode_cyrillic_filename() {
        assert_eq!(
            encode_filename(DEFAULT_SHOPPING_LIST_FILENAME),
            "%D0%A1%D0%BF%D0%B8%D1%81%D0%BE%D0%BA%20%D0%BF%D0%BE%D0%BA%D1%83%D0%BF%D0%BE%D0%BA.txt"
        );
    }

    #[test]
    fn test_content_disposition_is_valid_header() {
        let value = content_disposition(DEFAULT_SHOPPING_LIST_FILENAME);

        assert!(value.starts_with("attachment; filename=\"shopping_list.txt\"; filename*=UTF-8''"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
