//! The authenticated identity produced by the session gate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// What a valid session resolves to: the acting account and its role.
///
/// Protected handlers receive this from the gate extractor; sibling modules
/// receive it from `GET /auth/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Role membership check used by `require_role`.
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}
