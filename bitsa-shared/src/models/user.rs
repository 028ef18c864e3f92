/// User model and database operations
///
/// Accounts are created by self-registration (where the username is the
/// email address), by staff provisioning, or by the admin CLI. They are
/// never hard-deleted; blocking an account flips `is_active` instead.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL,            -- unique on LOWER(email)
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::models::user::{User, CreateUser};
/// use bitsa_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "jane@example.com".to_string(),
///     email: "jane@example.com".to_string(),
///     first_name: "Jane".to_string(),
///     last_name: String::new(),
///     password_hash: "$argon2id$...".to_string(),
///     is_staff: false,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "JANE@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_staff, is_superuser, is_active, date_joined, last_login";

/// User account
///
/// The password hash never leaves the server; it is skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Unique, case-sensitive login name
    pub username: String,

    /// Unique ignoring case
    pub email: String,

    pub first_name: String,
    pub last_name: String,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// May moderate content and administer users
    pub is_staff: bool,

    pub is_superuser: bool,

    /// Inactive (blocked) accounts cannot log in or use existing tokens
    pub is_active: bool,

    pub date_joined: DateTime<Utc>,

    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub is_staff: bool,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username already exists (`users_username_key`)
    /// - Email already exists ignoring case (`users_email_lower_key`)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.password_hash)
            .bind(data.is_staff)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use bitsa_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_id(&pool, 1).await? {
    ///     println!("Found user: {}", user.email);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address, ignoring case
    ///
    /// Emails are unique ignoring case at the storage level. Should several
    /// rows ever match, the one with the lowest id wins so the lookup stays
    /// deterministic.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) ORDER BY id LIMIT 1"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by exact (case-sensitive) username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Lists users, newest first
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `limit` - Maximum number of users to return
    /// * `offset` - Number of users to skip (for pagination)
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY date_joined DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    /// Flips the active flag of a user
    ///
    /// # Returns
    ///
    /// The updated user, or None if no user has this id
    pub async fn toggle_active(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Replaces the password hash and grants staff rights
    ///
    /// Superuser rights are left untouched. Used by the admin CLI to promote
    /// an existing account.
    pub async fn promote_to_staff(
        pool: &PgPool,
        id: i64,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET password_hash = $2, is_staff = TRUE
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(password_hash)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Updates the last login timestamp for a user
    ///
    /// Called after successful authentication.
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    pub async fn update_last_login(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "jane@example.com".to_string(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Wanjiru".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["is_active"], true);
    }
}
