//! Permission evaluation.

use serde::{Deserialize, Serialize};

use crate::Claims;

/// What a page or fragment demands of the current user.
///
/// Both lists use ALL-of semantics. An empty `Requirements` demands
/// nothing.
///
/// ```rust
/// use keyward_claims::Requirements;
///
/// let metrics = Requirements::new()
///     .permission("metrics.list")
///     .role("administrator");
/// assert_eq!(metrics.permissions, vec!["metrics.list"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Requirements {
    /// Creates an empty set of requirements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required permission.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Adds a required role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Returns `true` if nothing is required.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }
}

/// Returns `true` if `claims` holds every required permission AND every
/// required role.
///
/// Matching is exact and case-sensitive. Empty requirements always grant
/// access, even to an empty claim set.
pub fn has_access(claims: &Claims, required: &Requirements) -> bool {
    let has_permissions = required
        .permissions
        .iter()
        .all(|p| claims.permissions.contains(p));
    let has_roles = required.roles.iter().all(|r| claims.roles.contains(r));

    has_permissions && has_roles
}
