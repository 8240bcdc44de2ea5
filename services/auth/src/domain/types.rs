use chrono::{DateTime, Utc};
use uuid::Uuid;

use conecta_domain::role::Role;

/// Account row as the auth flows see it. One row per (email, role) pair, so
/// a guardian who also runs a school shows up here twice under one email.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
}

/// One-time emailed access code used for passwordless login.
#[derive(Debug, Clone)]
pub struct AccessCode {
    pub id: Uuid,
    pub account_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Server-side session row backing the opaque cookie token.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Stored WebAuthn passkey credential.
///
/// Keyed by email rather than account id: one passkey authenticates every
/// role that shares the email, and revoking an account must not orphan it.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,
    pub email: String,
    /// JSON-serialized `webauthn_rs::Passkey` (key material plus counter).
    pub public_key: Vec<u8>,
    pub sign_count: i64,
    pub transports: Vec<String>,
    pub backup_eligible: bool,
    pub backup_state: bool,
    pub aaguid: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Pending WebAuthn ceremony state, persisted between the options call and
/// the finish call. Email is absent for discoverable (usernameless) logins.
#[derive(Debug, Clone)]
pub struct StoredCeremony {
    pub id: Uuid,
    pub email: Option<String>,
    pub state: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Login/logout audit entry.
#[derive(Debug, Clone)]
pub struct AccessEvent {
    pub account_id: Uuid,
    pub action: AccessAction,
    pub method: Option<AuthMethod>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub description: Option<String>,
}

/// Data mutation audit entry with before/after snapshots.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub account_id: Uuid,
    pub table_name: String,
    pub record_id: Option<String>,
    pub action: ChangeAction,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAction {
    Login,
    Logoff,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logoff => "LOGOFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Code,
    Passkey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Passkey => "passkey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// WebAuthn ceremony state time-to-live in minutes.
pub const CHALLENGE_TTL_MINS: i64 = 5;
