/// Login identity resolution
///
/// A login identifier is either an email address or a username. Anything
/// containing `@` is treated as an email and matched ignoring case; anything
/// else must match a username exactly.
///
/// Every way a login can fail (unknown account, wrong password, corrupt
/// stored hash, blocked account) produces the same `None`, so callers cannot
/// leak which one happened.
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::auth::identity::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// match authenticate(&pool, "jane@example.com", "hunter22").await? {
///     Some(user) => println!("Welcome back, {}", user.username),
///     None => println!("Invalid credentials"),
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use super::password::verify_password;
use crate::models::user::User;

/// How a login identifier should be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifier<'a> {
    Email(&'a str),
    Username(&'a str),
}

impl<'a> Identifier<'a> {
    /// Classifies a raw identifier, trimming surrounding whitespace
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();

        if raw.contains('@') {
            Identifier::Email(raw)
        } else {
            Identifier::Username(raw)
        }
    }

    /// Loads the matching user, if any
    pub async fn find_user(&self, pool: &PgPool) -> Result<Option<User>, sqlx::Error> {
        match *self {
            Identifier::Email(email) => User::find_by_email(pool, email).await,
            Identifier::Username(username) => User::find_by_username(pool, username).await,
        }
    }
}

/// Checks credentials and returns the authenticated user
///
/// On success the user's `last_login` is stamped.
///
/// # Returns
///
/// `Some(user)` if the identifier names an active account whose password
/// matches, `None` otherwise.
///
/// # Errors
///
/// Only database failures are errors.
pub async fn authenticate(
    pool: &PgPool,
    identifier: &str,
    password: &str,
) -> Result<Option<User>, sqlx::Error> {
    let identifier = Identifier::parse(identifier);

    let Some(user) = identifier.find_user(pool).await? else {
        tracing::debug!(?identifier, "Login for unknown account");
        return Ok(None);
    };

    let matches = match verify_password(password, &user.password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Stored password hash is unusable");
            false
        }
    };

    if !matches {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Ok(None);
    }

    if !user.is_active {
        tracing::info!(user_id = user.id, "Login refused for inactive account");
        return Ok(None);
    }

    User::update_last_login(pool, user.id).await?;

    Ok(Some(user))
}
