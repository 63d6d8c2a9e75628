/// Ownership and relationship checks
///
/// Authentication answers "who is calling"; these helpers answer "may they do
/// this". They are pure functions over ids so handlers can run them right
/// after loading the resource.
///
/// # Example
///
/// ```
/// use recipebook_shared::auth::authorization::{require_author, AuthzError};
/// use recipebook_shared::auth::middleware::AuthContext;
///
/// let auth = AuthContext::new(1);
/// assert!(require_author(&auth, 1).is_ok());
/// assert!(matches!(require_author(&auth, 2), Err(AuthzError::NotAuthor)));
/// ```

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Only the author may modify or delete a recipe
    #[error("Only the author can modify this recipe")]
    NotAuthor,

    #[error("You can't subscribe to yourself")]
    SelfSubscription,
}

/// Allows the call only if the caller wrote the resource
pub fn require_author(auth: &AuthContext, author_id: i64) -> Result<(), AuthzError> {
    if auth.user_id != author_id {
        return Err(AuthzError::NotAuthor);
    }

    Ok(())
}

/// Rejects subscribing to (or unsubscribing from) oneself
pub fn require_other_user(auth: &AuthContext, target_id: i64) -> Result<(), AuthzError> {
    if auth.user_id == target_id {
        return Err(AuthzError::SelfSubscription);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_author() {
        let auth = AuthContext::new(5);

        assert_eq!(require_author(&auth, 5), Ok(()));
        assert_eq!(require_author(&auth, 6), Err(AuthzError::NotAuthor));
    }

    #[test]
    fn test_require_other_user() {
        let auth = AuthContext::new(5);

        assert_eq!(require_other_user(&auth, 6), Ok(()));
        assert_eq!(
            require_other_user(&auth, 5),
            Err(AuthzError::SelfSubscription)
        );
    }
}
