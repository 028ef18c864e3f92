/// Photo gallery model
///
/// Photos are always public. The `image` column holds either an absolute
/// URL or a path relative to the media base URL; file storage itself is
/// handled outside this service.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE photos (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     image VARCHAR(512) NOT NULL,
///     uploaded_by BIGINT NOT NULL REFERENCES users(id),
///     uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::auth::authorization::Resource;

const PHOTO_COLUMNS: &str = r#"
    ph.id, ph.title, ph.description, ph.image, ph.uploaded_by, ph.uploaded_at,
    TRIM(u.first_name || ' ' || u.last_name) AS uploaded_by_name
"#;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// Absolute URL or media-relative path
    pub image: String,

    /// Owner; fixed at creation
    pub uploaded_by: i64,

    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhoto {
    pub title: String,
    pub description: String,
    pub image: String,
    pub uploaded_by: i64,
}

/// Only `Some` fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePhoto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Resolves a stored image reference against the media base URL
///
/// Absolute `http(s)` URLs are returned as they are. Relative paths are
/// joined to `media_base_url` with exactly one `/` between them; without a
/// base URL they are returned unchanged.
pub fn resolve_image_url(image: &str, media_base_url: Option<&str>) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }

    match media_base_url {
        Some(base) if !base.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            image.trim_start_matches('/')
        ),
        _ => image.to_string(),
    }
}

impl Resource for Photo {
    const KIND: &'static str = "photos";
    const VISIBLE_BY_DEFAULT: bool = true;

    fn owner_id(&self) -> i64 {
        self.uploaded_by
    }

    fn is_visible(&self) -> bool {
        true
    }
}

impl Photo {
    pub fn image_url(&self, media_base_url: Option<&str>) -> String {
        resolve_image_url(&self.image, media_base_url)
    }

    pub async fn create(pool: &PgPool, data: CreatePhoto) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            WITH ph AS (
                INSERT INTO photos (title, description, image, uploaded_by)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {PHOTO_COLUMNS}
            FROM ph JOIN users u ON u.id = ph.uploaded_by
            "#
        );

        let photo = sqlx::query_as::<_, Photo>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.image)
            .bind(data.uploaded_by)
            .fetch_one(pool)
            .await?;

        Ok(photo)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos ph JOIN users u ON u.id = ph.uploaded_by WHERE ph.id = $1"
        );

        let photo = sqlx::query_as::<_, Photo>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(photo)
    }

    /// Lists photos, newest upload first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PHOTO_COLUMNS}
            FROM photos ph JOIN users u ON u.id = ph.uploaded_by
            ORDER BY ph.uploaded_at DESC, ph.id DESC
            LIMIT $1 OFFSET $2
            "#
        );

        let photos = sqlx::query_as::<_, Photo>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(photos)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdatePhoto,
    ) -> Result<Option<Self>, sqlx::Error> {
        // No updated_at column, so start from a no-op assignment
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("WITH ph AS (UPDATE photos SET id = id");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(image) = data.image {
            qb.push(", image = ").push_bind(image);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(
            " RETURNING *) SELECT {PHOTO_COLUMNS} FROM ph JOIN users u ON u.id = ph.uploaded_by"
        ));

        let photo = qb.build_query_as::<Photo>().fetch_optional(pool).await?;

        Ok(photo)
    }

    /// # Returns
    ///
    /// True if the photo was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
