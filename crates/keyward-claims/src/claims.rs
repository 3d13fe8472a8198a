//! Claim sets: what a user is allowed to do.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The permission and role claims attached to a session.
///
/// A `BTreeSet` keeps membership checks exact and the iteration order
/// stable, which keeps logs and test output deterministic. Both fields
/// default to empty so a token (or `/me` response) that omits one still
/// deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Fine-grained permissions, e.g. `"metrics.list"`.
    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Coarse roles, e.g. `"administrator"`.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Claims {
    /// Builds a claim set from any iterables of strings.
    pub fn new<P, R>(permissions: P, roles: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if no permission and no role is present.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }
}

/// The signed-in user as reported by the identity endpoint.
///
/// Wire shape: `{ "email": "...", "permissions": [...], "roles": [...] }`.
/// The claims are flattened so a `User` and a decoded token payload share
/// one evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(flatten)]
    pub claims: Claims,
}
