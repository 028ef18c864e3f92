/// Authorization policy for content resources
///
/// Blog posts, events and photos share one ownership model: the creating
/// user owns the record, staff can act on anything, and visible records can
/// be read by anyone. This module is the single place those rules live.
/// It is pure; callers load the resource first and ask [`authorize`]
/// whether the actor may act on it.
///
/// # Permission Model
///
/// | action              | anonymous | owner | other user | staff |
/// |---------------------|-----------|-------|------------|-------|
/// | read visible        | yes       | yes   | yes        | yes   |
/// | read hidden         | not found | yes   | not found  | yes   |
/// | update / delete     | 401       | yes   | 403        | yes   |
/// | publish / unpublish | 401       | 403   | 403        | yes   |
/// | rsvp                | 401       | if readable  | if readable | yes |
///
/// # Example
///
/// ```
/// use bitsa_shared::auth::authorization::{authorize, Action, Actor, Resource};
///
/// struct Note { owner: i64 }
///
/// impl Resource for Note {
///     const KIND: &'static str = "notes";
///     const VISIBLE_BY_DEFAULT: bool = true;
///     fn owner_id(&self) -> i64 { self.owner }
///     fn is_visible(&self) -> bool { true }
/// }
///
/// let note = Note { owner: 1 };
/// let owner = Actor { user_id: 1, is_staff: false };
/// let other = Actor { user_id: 2, is_staff: false };
///
/// assert!(authorize(Some(&owner), Action::Update, &note).is_ok());
/// assert!(authorize(Some(&other), Action::Update, &note).is_err());
/// assert!(authorize(None, Action::Read, &note).is_ok());
/// ```

use thiserror::Error;

/// The user attempting an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub is_staff: bool,
}

/// Actions that can be taken on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    Publish,
    Unpublish,
    Rsvp,
}

/// A record with an owner and a visibility flag
pub trait Resource {
    /// Plural noun used in denial messages, e.g. "photos"
    const KIND: &'static str;

    /// Visibility a freshly created record gets when the client says nothing
    const VISIBLE_BY_DEFAULT: bool;

    /// Id of the user who created the record
    fn owner_id(&self) -> i64;

    /// Whether anonymous and unrelated users may read the record
    fn is_visible(&self) -> bool;
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// No authenticated user, and the action needs one
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// The actor may not see the resource, so it is reported as missing
    #[error("Not found")]
    NotVisible,
}

impl Actor {
    /// Whether the actor owns the resource or is staff
    pub fn can_manage<R: Resource>(&self, resource: &R) -> bool {
        self.is_staff || self.user_id == resource.owner_id()
    }
}

/// Whether `actor` (possibly anonymous) may read `resource`
pub fn can_read<R: Resource>(actor: Option<&Actor>, resource: &R) -> bool {
    resource.is_visible() || actor.is_some_and(|a| a.can_manage(resource))
}

/// Requires an authenticated actor
pub fn require_authenticated(actor: Option<&Actor>) -> Result<&Actor, AuthzError> {
    actor.ok_or(AuthzError::Unauthenticated)
}

/// Requires an authenticated staff actor
pub fn require_staff<'a>(actor: Option<&'a Actor>, message: &str) -> Result<&'a Actor, AuthzError> {
    let actor = require_authenticated(actor)?;

    if !actor.is_staff {
        return Err(AuthzError::Forbidden(message.to_string()));
    }

    Ok(actor)
}

/// Decides whether `actor` may perform `action` on `resource`
///
/// # Errors
///
/// - `Unauthenticated` for any non-read action without an actor
/// - `NotVisible` when the actor cannot read the resource at all
/// - `Forbidden` when the actor can see it but lacks the right
pub fn authorize<R: Resource>(
    actor: Option<&Actor>,
    action: Action,
    resource: &R,
) -> Result<(), AuthzError> {
    if action == Action::Read {
        return if can_read(actor, resource) {
            Ok(())
        } else {
            Err(AuthzError::NotVisible)
        };
    }

    let actor = require_authenticated(actor)?;

    match action {
        Action::Publish | Action::Unpublish => {
            let verb = if action == Action::Publish { "publish" } else { "unpublish" };
            require_staff(Some(actor), &format!("Only staff can {} {}", verb, R::KIND))?;
            Ok(())
        }
        Action::Update | Action::Delete => {
            if !can_read(Some(actor), resource) {
                return Err(AuthzError::NotVisible);
            }
            if !actor.can_manage(resource) {
                let verb = if action == Action::Update { "edit" } else { "delete" };
                return Err(AuthzError::Forbidden(format!(
                    "You can only {} your own {}",
                    verb,
                    R::KIND
                )));
            }
            Ok(())
        }
        Action::Rsvp => {
            if !can_read(Some(actor), resource) {
                return Err(AuthzError::NotVisible);
            }
            Ok(())
        }
        Action::Read => Ok(()),
    }
}

/// Checks a visibility change requested through an ordinary create/update
///
/// Lowering visibility, or keeping it, is always allowed for whoever may
/// write the record. Raising it is a staff action for every resource type,
/// owners included. On create, pass `R::VISIBLE_BY_DEFAULT` as
/// `currently_visible` so that asking for the type's own default is never
/// treated as a raise.
pub fn authorize_visibility<R: Resource>(
    actor: &Actor,
    currently_visible: bool,
    requested: bool,
) -> Result<(), AuthzError> {
    let raising = requested && !currently_visible;

    if raising && !actor.is_staff {
        return Err(AuthzError::Forbidden(format!(
            "Only staff can publish {}",
            R::KIND
        )));
    }

    Ok(())
}
