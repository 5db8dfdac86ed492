//! Role gate
//!
//! Routes declare the exact set of roles they accept. There is no hierarchy:
//! an OWNER does not pass a gate that only lists ADMIN.

use tracing::debug;

use super::guard::AuthenticatedIdentity;
use super::AuthError;
use crate::models::membership::MembershipRole;

/// Roles that may manage a company's members, invites and details
pub const OWNER_OR_ADMIN: &[MembershipRole] = &[MembershipRole::Owner, MembershipRole::Admin];

/// Roles that may delete a company
pub const OWNER_ONLY: &[MembershipRole] = &[MembershipRole::Owner];

/// Checks the caller's role against a route's required roles
///
/// An empty list allows everyone. A caller without a role never passes a
/// non-empty list.
pub fn allow(
    identity: &AuthenticatedIdentity,
    required: &[MembershipRole],
) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }

    match identity.role {
        Some(role) if required.contains(&role) => Ok(()),
        role => {
            debug!(
                user_id = %identity.user_id,
                role = ?role,
                required = ?required,
                "Rejected: insufficient role"
            );
            Err(AuthError::InsufficientRole)
        }
    }
}
