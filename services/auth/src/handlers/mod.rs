pub mod access_code;
pub mod passkeys;
pub mod session;

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use conecta_core::serde::to_rfc3339_ms;
use conecta_domain::identity::Identity;
use conecta_domain::role::Role;

use crate::usecase::session::SessionBundle;

/// Body of every successful login response, code and passkey alike. The
/// session token itself travels only in the cookie.
#[derive(Serialize)]
pub struct LoggedInResponse {
    pub status: &'static str,
    pub identity: Identity,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

impl From<SessionBundle> for LoggedInResponse {
    fn from(bundle: SessionBundle) -> Self {
        Self {
            status: "logged_in",
            identity: bundle.identity,
            expires_at: bundle.expires_at,
        }
    }
}

/// One entry of a profile chooser: the wire slug plus its display label.
#[derive(Serialize)]
pub struct RoleOption {
    pub role: Role,
    pub label: &'static str,
}

pub fn role_options(roles: Vec<Role>) -> Vec<RoleOption> {
    roles
        .into_iter()
        .map(|role| RoleOption {
            role,
            label: role.label(),
        })
        .collect()
}

/// HTTP 200 chooser payload for an email spanning several roles. Picking a
/// profile is a normal step of the flow, so it does not ride the error path.
pub fn select_role_response(roles: Vec<Role>) -> Json<serde_json::Value> {
    Json(json!({
        "error": "select_role",
        "roles": role_options(roles),
    }))
}
