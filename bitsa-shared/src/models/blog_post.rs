/// Blog post model and database operations
///
/// Posts start unpublished. The first time a post becomes published its
/// `published_at` is stamped; unpublishing later never clears it, and
/// publishing again never moves it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE blog_posts (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     content TEXT NOT NULL,
///     excerpt TEXT NOT NULL DEFAULT '',
///     author_id BIGINT NOT NULL REFERENCES users(id),
///     category VARCHAR(100) NOT NULL DEFAULT 'General',
///     tags VARCHAR(500) NOT NULL DEFAULT '',
///     read_time INTEGER NOT NULL DEFAULT 5,
///     is_published BOOLEAN NOT NULL DEFAULT FALSE,
///     image VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     published_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::models::blog_post::{BlogPost, CreateBlogPost};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, author_id: i64) -> Result<(), sqlx::Error> {
/// let post = BlogPost::create(&pool, CreateBlogPost {
///     title: "Hackathon recap".to_string(),
///     content: "...".to_string(),
///     author_id,
///     ..Default::default()
/// }).await?;
///
/// let published = BlogPost::set_published(&pool, post.id, true).await?;
/// assert!(published.and_then(|p| p.published_at).is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{like_pattern, ListScope};
use crate::auth::authorization::Resource;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_READ_TIME: i32 = 5;

/// Columns of a post joined with its author, selected from alias `p`
const POST_COLUMNS: &str = r#"
    p.id, p.title, p.content, p.excerpt, p.author_id, p.category, p.tags,
    p.read_time, p.is_published, p.image, p.created_at, p.updated_at, p.published_at,
    TRIM(u.first_name || ' ' || u.last_name) AS author_name,
    u.email AS author_email
"#;

/// Blog post with its author's display fields
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,

    /// Owner; fixed at creation
    pub author_id: i64,

    pub category: String,

    /// Comma-separated tag list as stored
    pub tags: String,

    /// Estimated reading time in minutes
    pub read_time: i32,

    pub is_published: bool,

    /// Image URL or media path
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// First time the post was published; never cleared
    pub published_at: Option<DateTime<Utc>>,

    pub author_name: String,
    pub author_email: String,
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlogPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: i64,
    pub category: String,
    pub tags: String,
    pub read_time: i32,
    pub is_published: bool,
    pub image: Option<String>,
}

impl Default for CreateBlogPost {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            excerpt: String::new(),
            author_id: 0,
            category: DEFAULT_CATEGORY.to_string(),
            tags: String::new(),
            read_time: DEFAULT_READ_TIME,
            is_published: false,
            image: None,
        }
    }
}

/// Input for updating a post
///
/// Only `Some` fields are written. `image: Some(None)` clears the image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlogPost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub read_time: Option<i32>,
    pub is_published: Option<bool>,
    pub image: Option<Option<String>>,
}

/// List filters; all optional and combined with AND
#[derive(Debug, Clone, Default)]
pub struct BlogPostFilter {
    /// Exact author id
    pub author_id: Option<i64>,

    /// Case-insensitive substring of the category
    pub category: Option<String>,

    /// Case-insensitive substring of title, content or excerpt
    pub search: Option<String>,
}

/// `published_at` after a post is saved with `is_published = publishing`
///
/// Stamps `now` only on the first publish; otherwise keeps what is there.
pub fn next_published_at(
    current: Option<DateTime<Utc>>,
    publishing: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match current {
        Some(at) => Some(at),
        None if publishing => Some(now),
        None => None,
    }
}

/// Splits the stored tag string into trimmed, non-empty tags
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl Resource for BlogPost {
    const KIND: &'static str = "posts";
    const VISIBLE_BY_DEFAULT: bool = false;

    fn owner_id(&self) -> i64 {
        self.author_id
    }

    fn is_visible(&self) -> bool {
        self.is_published
    }
}

impl BlogPost {
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }

    /// Creates a new post
    ///
    /// A post created already published gets `published_at` stamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the author does not exist or the database fails.
    pub async fn create(pool: &PgPool, data: CreateBlogPost) -> Result<Self, sqlx::Error> {
        let published_at = next_published_at(None, data.is_published, Utc::now());

        let query = format!(
            r#"
            WITH p AS (
                INSERT INTO blog_posts
                    (title, content, excerpt, author_id, category, tags, read_time,
                     is_published, image, published_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            SELECT {POST_COLUMNS}
            FROM p JOIN users u ON u.id = p.author_id
            "#
        );

        let post = sqlx::query_as::<_, BlogPost>(&query)
            .bind(data.title)
            .bind(data.content)
            .bind(data.excerpt)
            .bind(data.author_id)
            .bind(data.category)
            .bind(data.tags)
            .bind(data.read_time)
            .bind(data.is_published)
            .bind(data.image)
            .bind(published_at)
            .fetch_one(pool)
            .await?;

        Ok(post)
    }

    /// Finds a post by ID, regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM blog_posts p JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#
        );

        let post = sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(post)
    }

    /// Lists posts newest first, restricted to `scope` and `filter`
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `filter` - Author, category and search filters
    /// * `scope` - Which posts the caller may see
    /// * `limit` - Maximum number of posts to return
    /// * `offset` - Number of posts to skip
    pub async fn list(
        pool: &PgPool,
        filter: &BlogPostFilter,
        scope: ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON u.id = p.author_id WHERE TRUE"
        ));

        scope.push_condition(&mut qb, "p.is_published", "p.author_id");

        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.author_id = ").push_bind(author_id);
        }

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            qb.push(" AND p.category ILIKE ").push_bind(like_pattern(category));
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (p.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.content ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.excerpt ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let posts = qb.build_query_as::<BlogPost>().fetch_all(pool).await?;

        Ok(posts)
    }

    /// Updates a post
    ///
    /// Setting `is_published` to true stamps `published_at` if it was never
    /// set. The `updated_at` timestamp is always refreshed.
    ///
    /// # Returns
    ///
    /// The updated post, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateBlogPost,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("WITH p AS (UPDATE blog_posts SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(content) = data.content {
            qb.push(", content = ").push_bind(content);
        }
        if let Some(excerpt) = data.excerpt {
            qb.push(", excerpt = ").push_bind(excerpt);
        }
        if let Some(category) = data.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(tags) = data.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        if let Some(read_time) = data.read_time {
            qb.push(", read_time = ").push_bind(read_time);
        }
        if let Some(image) = data.image {
            qb.push(", image = ").push_bind(image);
        }
        if let Some(is_published) = data.is_published {
            qb.push(", is_published = ")
                .push_bind(is_published)
                .push(", published_at = CASE WHEN ")
                .push_bind(is_published)
                .push(" THEN COALESCE(published_at, NOW()) ELSE published_at END");
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(
            " RETURNING *) SELECT {POST_COLUMNS} FROM p JOIN users u ON u.id = p.author_id"
        ));

        let post = qb.build_query_as::<BlogPost>().fetch_optional(pool).await?;

        Ok(post)
    }

    /// Publishes or unpublishes a post
    ///
    /// Publishing stamps `published_at` only the first time. Unpublishing
    /// keeps the stamp.
    ///
    /// # Returns
    ///
    /// The updated post, or None if it doesn't exist
    pub async fn set_published(
        pool: &PgPool,
        id: i64,
        published: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE blog_posts
                SET is_published = $2,
                    published_at = CASE WHEN $2 THEN COALESCE(published_at, NOW()) ELSE published_at END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS}
            FROM p JOIN users u ON u.id = p.author_id
            "#
        );

        let post = sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .bind(published)
            .fetch_optional(pool)
            .await?;

        Ok(post)
    }

    /// Deletes a post
    ///
    /// # Returns
    ///
    /// True if the post was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
