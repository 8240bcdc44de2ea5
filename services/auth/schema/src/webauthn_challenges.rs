use sea_orm::entity::prelude::*;

/// Pending WebAuthn ceremony state, one row per issued challenge.
///
/// Persisted (never process-local) so ceremonies survive restarts and
/// horizontal scaling. Consumed with a conditional delete; a row is only
/// ever used once. `email` is null for discoverable-credential logins.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "webauthn_challenges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: Option<String>,
    /// JSON-serialized ceremony state (includes the challenge bytes).
    pub state: Vec<u8>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
