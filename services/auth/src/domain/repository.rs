#![allow(async_fn_in_trait)]

use uuid::Uuid;

use conecta_domain::role::Role;

use crate::domain::types::{
    AccessCode, AccessEvent, AuthAccount, ChangeEvent, SessionRecord, StoredCeremony,
    StoredCredential,
};
use crate::error::AuthError;

/// Repository for account lookups.
pub trait AccountRepository: Send + Sync {
    /// Every active account carrying the email, any role.
    async fn find_active_by_email(&self, email: &str) -> Result<Vec<AuthAccount>, AuthError>;

    /// Account for an exact (email, role) pair, inactive rows included.
    async fn find_by_email_and_role(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<AuthAccount>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthAccount>, AuthError>;
}

/// Repository for one-time access codes.
pub trait AccessCodeRepository: Send + Sync {
    async fn create(&self, code: &AccessCode) -> Result<(), AuthError>;

    /// Newest unused row matching (account, digits). Expiry is not checked
    /// here; the caller distinguishes expired from wrong.
    async fn find_latest_unused(
        &self,
        account_id: Uuid,
        code: &str,
    ) -> Result<Option<AccessCode>, AuthError>;

    /// Mark a code used if it still is unused. `false` means another request
    /// consumed it first.
    async fn consume(&self, id: Uuid) -> Result<bool, AuthError>;
}

/// Repository for server-side sessions.
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &SessionRecord) -> Result<(), AuthError>;

    async fn find_active(&self, token: &str) -> Result<Option<SessionRecord>, AuthError>;

    /// Deactivate a session. `false` when no active row matched the token.
    async fn revoke(&self, token: &str) -> Result<bool, AuthError>;
}

/// Repository for WebAuthn passkey credentials.
pub trait CredentialRepository: Send + Sync {
    async fn list_active_by_email(&self, email: &str)
    -> Result<Vec<StoredCredential>, AuthError>;

    async fn find_active_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<StoredCredential>, AuthError>;

    /// Insert unless the credential id already exists. `false` on conflict,
    /// which makes registration retries harmless.
    async fn create_if_absent(&self, credential: &StoredCredential) -> Result<bool, AuthError>;

    /// Bump the signature counter and stamp last_used_at after a successful
    /// assertion.
    async fn record_use(&self, credential_id: &[u8], sign_count: i64) -> Result<(), AuthError>;

    /// Re-persist the serialized credential when the authenticator reported
    /// a state change during assertion.
    async fn update_public_key(
        &self,
        credential_id: &[u8],
        public_key: &[u8],
    ) -> Result<(), AuthError>;

    /// Deactivate a credential owned by the email. `false` when nothing
    /// matched.
    async fn revoke(&self, credential_id: &[u8], email: &str) -> Result<bool, AuthError>;

    async fn exists_for_email(&self, email: &str) -> Result<bool, AuthError>;
}

/// Repository for pending WebAuthn ceremony state.
pub trait ChallengeRepository: Send + Sync {
    async fn create(&self, ceremony: &StoredCeremony) -> Result<(), AuthError>;

    /// Fetch and delete the newest unexpired ceremony bound to an email.
    async fn take_latest_for_email(&self, email: &str)
    -> Result<Option<StoredCeremony>, AuthError>;

    /// Fetch and delete an unexpired ceremony by id.
    async fn take_by_id(&self, id: Uuid) -> Result<Option<StoredCeremony>, AuthError>;

    /// Delete every expired row. Returns the count removed.
    async fn purge_expired(&self) -> Result<u64, AuthError>;
}

/// Repository for the access and change audit trails.
pub trait AuditLogRepository: Send + Sync {
    async fn record_access(&self, event: &AccessEvent) -> Result<(), AuthError>;

    async fn record_change(&self, event: &ChangeEvent) -> Result<(), AuthError>;
}

/// Port for outbound access code email delivery.
pub trait Mailer: Send + Sync {
    async fn send_access_code(
        &self,
        to: &str,
        name: &str,
        code: &str,
        ttl_hours: i64,
    ) -> Result<(), AuthError>;
}
