use sea_orm::entity::prelude::*;

/// Registered WebAuthn public-key credential.
///
/// Owned by an email, not a single account row: one passkey authorizes login
/// into every role sharing that email, so there is deliberately no foreign
/// key into `accounts`. Revocation is a soft delete (`active = false`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webauthn_credentials")]
pub struct Model {
    /// Raw credential ID bytes as provided by the authenticator.
    #[sea_orm(primary_key, auto_increment = false)]
    pub credential_id: Vec<u8>,
    pub email: String,
    /// JSON-serialized verification-library passkey (public key, policy
    /// flags, counter). Counter/backup-state updates are persisted here.
    pub public_key: Vec<u8>,
    /// Mirror of the library-held signature counter, for audit queries.
    pub sign_count: i64,
    pub transports: Json,
    pub backup_eligible: bool,
    pub backup_state: bool,
    /// AAGUID from the authenticator's attestation data.
    pub aaguid: Uuid,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
