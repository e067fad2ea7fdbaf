use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;
use crate::types::{NoteSpace, Role, User};

/// Resource kinds covered by the authorization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Space,
    Member,
    Tag,
    Note,
    NoteLog,
}

/// Action categories, one per CRUD verb plus list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

/// A role-threshold rule for one (resource, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Staff, or any membership at or above the given role.
    AtLeast(Role),
    /// Staff and superusers only.
    AdminOnly,
    /// Nobody, staff included.
    Denied,
}

/// The per-operation authorization table.
///
/// Reads require any membership; writes default to Owner. Notes and tags
/// narrow writes to Member (guests are read-only), note hard-delete is
/// admin-only, and note logs are never writable through the API. Spaces
/// are not self-service: only staff may create or enumerate them.
#[must_use]
pub const fn rule_for(resource: Resource, action: Action) -> Rule {
    use Action::*;
    use Resource::*;

    match (resource, action) {
        (Space, List | Create) => Rule::AdminOnly,
        (Space, Retrieve) => Rule::AtLeast(Role::Guest),
        (Space, Update | Delete) => Rule::AtLeast(Role::Owner),

        (Member, List | Retrieve) => Rule::AtLeast(Role::Guest),
        (Member, Create | Update | Delete) => Rule::AtLeast(Role::Owner),

        (Tag, List | Retrieve) => Rule::AtLeast(Role::Guest),
        (Tag, Create | Update | Delete) => Rule::AtLeast(Role::Member),

        (Note, List | Retrieve) => Rule::AtLeast(Role::Guest),
        (Note, Create | Update) => Rule::AtLeast(Role::Member),
        (Note, Delete) => Rule::AdminOnly,

        (NoteLog, List | Retrieve) => Rule::AtLeast(Role::Guest),
        (NoteLog, Create | Update | Delete) => Rule::Denied,
    }
}

/// Returns the user's role in a space, or None without a membership.
pub fn resolve_role(
    store: &dyn Store,
    user: &User,
    space_id: &str,
) -> Result<Option<Role>, ApiError> {
    let member = store
        .get_member_by_user(space_id, &user.id)
        .api_err("Failed to resolve membership")?;
    Ok(member.map(|m| m.role))
}

/// Evaluates a rule for a user against a space, if one is in play.
/// Absence of a membership is an ordinary deny, not an error; so is a
/// threshold rule evaluated with no space to resolve against.
pub fn check_access(
    store: &dyn Store,
    user: &User,
    space_id: Option<&str>,
    rule: Rule,
) -> Result<bool, ApiError> {
    match rule {
        Rule::Denied => Ok(false),
        Rule::AdminOnly => Ok(user.is_admin()),
        Rule::AtLeast(threshold) => {
            if user.is_admin() {
                return Ok(true);
            }
            let Some(space_id) = space_id else {
                return Ok(false);
            };
            Ok(resolve_role(store, user, space_id)?.is_some_and(|role| role.meets(threshold)))
        }
    }
}

/// Check access, returning a forbidden error on denial.
pub fn require_access(
    store: &dyn Store,
    user: &User,
    space_id: Option<&str>,
    rule: Rule,
) -> Result<(), ApiError> {
    if !check_access(store, user, space_id, rule)? {
        return Err(ApiError::forbidden("Insufficient note space permissions"));
    }
    Ok(())
}

/// Staff, or the acting user operating on their own record.
pub fn require_self_or_admin(user: &User, target_id: &str) -> Result<(), ApiError> {
    if user.is_admin() || user.id == target_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Insufficient permissions"))
    }
}

/// Tenant scoping gate, phases 1 and 2: the request must name a note
/// space, and the space must exist. A missing parameter is a malformed
/// request, reported before any lookup or permission check; an unknown
/// id is not-found, reported before authorization.
pub fn resolve_space(store: &dyn Store, param: Option<&str>) -> Result<NoteSpace, ApiError> {
    let id = param.ok_or_else(|| ApiError::bad_request("Missing notespace parameter"))?;
    store
        .get_space(id)
        .api_err("Failed to lookup note space")?
        .ok_or_else(|| ApiError::not_found("Note space not found"))
}
