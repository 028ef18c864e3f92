/// Database models for BITSA
///
/// Each model owns its SQL; handlers never write queries themselves.
///
/// # Models
///
/// - `user`: accounts, staff and active flags
/// - `blog_post`: posts with the publish workflow
/// - `event`: events, their attendee set, and the RSVP engine
/// - `photo`: gallery entries
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::models::{blog_post::{BlogPost, BlogPostFilter}, ListScope};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// // What an anonymous visitor sees on the first page
/// let posts = BlogPost::list(&pool, &BlogPostFilter::default(), ListScope::VisibleOnly, 20, 0).await?;
/// # Ok(())
/// # }
/// ```

use crate::auth::authorization::Actor;

pub mod blog_post;
pub mod event;
pub mod photo;
pub mod user;

/// Which rows a list query may return
///
/// Mirrors the read rule of the authorization policy: staff see everything,
/// a signed-in user sees visible rows plus their own, anyone else sees
/// visible rows only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    VisibleOrOwnedBy(i64),
    VisibleOnly,
}

impl ListScope {
    pub fn for_actor(actor: Option<&Actor>) -> Self {
        match actor {
            Some(actor) if actor.is_staff => ListScope::All,
            Some(actor) => ListScope::VisibleOrOwnedBy(actor.user_id),
            None => ListScope::VisibleOnly,
        }
    }

    /// Appends the scope as a `WHERE` condition
    ///
    /// `visible` and `owner` are column expressions, e.g. `p.is_published`
    /// and `p.author_id`. The builder must already hold a `WHERE` clause.
    pub(crate) fn push_condition(
        &self,
        qb: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
        visible: &str,
        owner: &str,
    ) {
        match *self {
            ListScope::All => {}
            ListScope::VisibleOrOwnedBy(user_id) => {
                qb.push(format!(" AND ({visible} OR {owner} = "));
                qb.push_bind(user_id);
                qb.push(")");
            }
            ListScope::VisibleOnly => {
                qb.push(format!(" AND {visible}"));
            }
        }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_actor() {
        let staff = Actor { user_id: 1, is_staff: true };
        let member = Actor { user_id: 2, is_staff: false };

        assert_eq!(ListScope::for_actor(Some(&staff)), ListScope::All);
        assert_eq!(ListScope::for_actor(Some(&member)), ListScope::VisibleOrOwnedBy(2));
        assert_eq!(ListScope::for_actor(None), ListScope::VisibleOnly);
    }

    #[test]
    fn test_scope_sql() {
        let mut qb = sqlx::QueryBuilder::new("SELECT 1 FROM t WHERE TRUE");
        ListScope::VisibleOrOwnedBy(5).push_condition(&mut qb, "t.visible", "t.owner");
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE TRUE AND (t.visible OR t.owner = $1)");

        let mut qb = sqlx::QueryBuilder::new("SELECT 1 FROM t WHERE TRUE");
        ListScope::All.push_condition(&mut qb, "t.visible", "t.owner");
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE TRUE");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
