use anyhow::Context as _;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use conecta_auth_schema::{
    access_codes, access_log, accounts, change_log, sessions, webauthn_challenges,
    webauthn_credentials,
};
use conecta_domain::role::Role;

use crate::domain::repository::{
    AccessCodeRepository, AccountRepository, AuditLogRepository, ChallengeRepository,
    CredentialRepository, SessionRepository,
};
use crate::domain::types::{
    AccessCode, AccessEvent, AuthAccount, ChangeEvent, SessionRecord, StoredCeremony,
    StoredCredential,
};
use crate::error::AuthError;

// ── Account repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountRepository {
    pub db: DatabaseConnection,
}

impl AccountRepository for DbAccountRepository {
    async fn find_active_by_email(&self, email: &str) -> Result<Vec<AuthAccount>, AuthError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .filter(accounts::Column::Active.eq(true))
            .all(&self.db)
            .await
            .context("find active accounts by email")?;
        models.into_iter().map(account_from_model).collect()
    }

    async fn find_by_email_and_role(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<AuthAccount>, AuthError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .filter(accounts::Column::Role.eq(role.as_i16()))
            .one(&self.db)
            .await
            .context("find account by email and role")?;
        model.map(account_from_model).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthAccount>, AuthError> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find account by id")?;
        model.map(account_from_model).transpose()
    }
}

fn account_from_model(model: accounts::Model) -> Result<AuthAccount, AuthError> {
    let role = Role::from_i16(model.role).ok_or_else(|| {
        AuthError::Unavailable(anyhow::anyhow!(
            "account {} carries unknown role {}",
            model.id,
            model.role
        ))
    })?;
    Ok(AuthAccount {
        id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        role,
        active: model.active,
    })
}

// ── Access code repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccessCodeRepository {
    pub db: DatabaseConnection,
}

impl AccessCodeRepository for DbAccessCodeRepository {
    async fn create(&self, code: &AccessCode) -> Result<(), AuthError> {
        access_codes::ActiveModel {
            id: Set(code.id),
            account_id: Set(code.account_id),
            code: Set(code.code.clone()),
            expires_at: Set(code.expires_at),
            used_at: Set(None),
            created_at: Set(code.created_at),
        }
        .insert(&self.db)
        .await
        .context("create access code")?;
        Ok(())
    }

    async fn find_latest_unused(
        &self,
        account_id: Uuid,
        code: &str,
    ) -> Result<Option<AccessCode>, AuthError> {
        let model = access_codes::Entity::find()
            .filter(access_codes::Column::AccountId.eq(account_id))
            .filter(access_codes::Column::Code.eq(code))
            .filter(access_codes::Column::UsedAt.is_null())
            .order_by_desc(access_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest unused access code")?;
        Ok(model.map(access_code_from_model))
    }

    async fn consume(&self, id: Uuid) -> Result<bool, AuthError> {
        // The used_at guard makes consumption first-writer-wins under
        // concurrent validation of the same code.
        let result = access_codes::Entity::update_many()
            .col_expr(access_codes::Column::UsedAt, Expr::value(Utc::now()))
            .filter(access_codes::Column::Id.eq(id))
            .filter(access_codes::Column::UsedAt.is_null())
            .exec(&self.db)
            .await
            .context("consume access code")?;
        Ok(result.rows_affected > 0)
    }
}

fn access_code_from_model(model: access_codes::Model) -> AccessCode {
    AccessCode {
        id: model.id,
        account_id: model.account_id,
        code: model.code,
        expires_at: model.expires_at,
        used_at: model.used_at,
        created_at: model.created_at,
    }
}

// ── Session repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn create(&self, session: &SessionRecord) -> Result<(), AuthError> {
        sessions::ActiveModel {
            id: Set(session.id),
            account_id: Set(session.account_id),
            token: Set(session.token.clone()),
            expires_at: Set(session.expires_at),
            active: Set(session.active),
            created_at: Set(session.created_at),
        }
        .insert(&self.db)
        .await
        .context("create session")?;
        Ok(())
    }

    async fn find_active(&self, token: &str) -> Result<Option<SessionRecord>, AuthError> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::Token.eq(token))
            .filter(sessions::Column::Active.eq(true))
            .one(&self.db)
            .await
            .context("find active session")?;
        Ok(model.map(session_from_model))
    }

    async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::Active, Expr::value(false))
            .filter(sessions::Column::Token.eq(token))
            .filter(sessions::Column::Active.eq(true))
            .exec(&self.db)
            .await
            .context("revoke session")?;
        Ok(result.rows_affected > 0)
    }
}

fn session_from_model(model: sessions::Model) -> SessionRecord {
    SessionRecord {
        id: model.id,
        account_id: model.account_id,
        token: model.token,
        expires_at: model.expires_at,
        active: model.active,
        created_at: model.created_at,
    }
}

// ── Credential repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCredentialRepository {
    pub db: DatabaseConnection,
}

impl CredentialRepository for DbCredentialRepository {
    async fn list_active_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<StoredCredential>, AuthError> {
        let models = webauthn_credentials::Entity::find()
            .filter(webauthn_credentials::Column::Email.eq(email))
            .filter(webauthn_credentials::Column::Active.eq(true))
            .all(&self.db)
            .await
            .context("list active credentials by email")?;
        Ok(models.into_iter().map(credential_from_model).collect())
    }

    async fn find_active_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<StoredCredential>, AuthError> {
        let model = webauthn_credentials::Entity::find_by_id(credential_id.to_vec())
            .filter(webauthn_credentials::Column::Active.eq(true))
            .one(&self.db)
            .await
            .context("find active credential by id")?;
        Ok(model.map(credential_from_model))
    }

    async fn create_if_absent(&self, credential: &StoredCredential) -> Result<bool, AuthError> {
        let model = webauthn_credentials::ActiveModel {
            credential_id: Set(credential.credential_id.clone()),
            email: Set(credential.email.clone()),
            public_key: Set(credential.public_key.clone()),
            sign_count: Set(credential.sign_count),
            transports: Set(serde_json::Value::from(credential.transports.clone())),
            backup_eligible: Set(credential.backup_eligible),
            backup_state: Set(credential.backup_state),
            aaguid: Set(credential.aaguid),
            active: Set(credential.active),
            created_at: Set(credential.created_at),
            last_used_at: Set(credential.last_used_at),
        };
        let inserted = webauthn_credentials::Entity::insert(model)
            .on_conflict(
                OnConflict::column(webauthn_credentials::Column::CredentialId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("create credential if absent")?;
        Ok(inserted > 0)
    }

    async fn record_use(&self, credential_id: &[u8], sign_count: i64) -> Result<(), AuthError> {
        webauthn_credentials::Entity::update_many()
            .col_expr(
                webauthn_credentials::Column::SignCount,
                Expr::value(sign_count),
            )
            .col_expr(
                webauthn_credentials::Column::LastUsedAt,
                Expr::value(Utc::now()),
            )
            .filter(webauthn_credentials::Column::CredentialId.eq(credential_id.to_vec()))
            .exec(&self.db)
            .await
            .context("record credential use")?;
        Ok(())
    }

    async fn update_public_key(
        &self,
        credential_id: &[u8],
        public_key: &[u8],
    ) -> Result<(), AuthError> {
        webauthn_credentials::Entity::update_many()
            .col_expr(
                webauthn_credentials::Column::PublicKey,
                Expr::value(public_key.to_vec()),
            )
            .filter(webauthn_credentials::Column::CredentialId.eq(credential_id.to_vec()))
            .exec(&self.db)
            .await
            .context("update credential public key")?;
        Ok(())
    }

    async fn revoke(&self, credential_id: &[u8], email: &str) -> Result<bool, AuthError> {
        // Email in the filter keeps one account from revoking another's key.
        let result = webauthn_credentials::Entity::update_many()
            .col_expr(webauthn_credentials::Column::Active, Expr::value(false))
            .filter(webauthn_credentials::Column::CredentialId.eq(credential_id.to_vec()))
            .filter(webauthn_credentials::Column::Email.eq(email))
            .filter(webauthn_credentials::Column::Active.eq(true))
            .exec(&self.db)
            .await
            .context("revoke credential")?;
        Ok(result.rows_affected > 0)
    }

    async fn exists_for_email(&self, email: &str) -> Result<bool, AuthError> {
        let model = webauthn_credentials::Entity::find()
            .filter(webauthn_credentials::Column::Email.eq(email))
            .filter(webauthn_credentials::Column::Active.eq(true))
            .one(&self.db)
            .await
            .context("check credential exists for email")?;
        Ok(model.is_some())
    }
}

fn credential_from_model(model: webauthn_credentials::Model) -> StoredCredential {
    // Transports are advisory; unreadable rows degrade to an empty list.
    let transports = serde_json::from_value(model.transports).unwrap_or_default();
    StoredCredential {
        credential_id: model.credential_id,
        email: model.email,
        public_key: model.public_key,
        sign_count: model.sign_count,
        transports,
        backup_eligible: model.backup_eligible,
        backup_state: model.backup_state,
        aaguid: model.aaguid,
        active: model.active,
        created_at: model.created_at,
        last_used_at: model.last_used_at,
    }
}

// ── Challenge repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbChallengeRepository {
    pub db: DatabaseConnection,
}

impl ChallengeRepository for DbChallengeRepository {
    async fn create(&self, ceremony: &StoredCeremony) -> Result<(), AuthError> {
        webauthn_challenges::ActiveModel {
            id: Set(ceremony.id),
            email: Set(ceremony.email.clone()),
            state: Set(ceremony.state.clone()),
            expires_at: Set(ceremony.expires_at),
            created_at: Set(ceremony.created_at),
        }
        .insert(&self.db)
        .await
        .context("create webauthn ceremony")?;
        Ok(())
    }

    async fn take_latest_for_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCeremony>, AuthError> {
        let now = Utc::now();
        let model = webauthn_challenges::Entity::find()
            .filter(webauthn_challenges::Column::Email.eq(email))
            .filter(webauthn_challenges::Column::ExpiresAt.gt(now))
            .order_by_desc(webauthn_challenges::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find pending ceremony by email")?;
        let Some(model) = model else {
            return Ok(None);
        };
        self.delete_taken(model).await
    }

    async fn take_by_id(&self, id: Uuid) -> Result<Option<StoredCeremony>, AuthError> {
        let now = Utc::now();
        let model = webauthn_challenges::Entity::find_by_id(id)
            .filter(webauthn_challenges::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .context("find pending ceremony by id")?;
        let Some(model) = model else {
            return Ok(None);
        };
        self.delete_taken(model).await
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let result = webauthn_challenges::Entity::delete_many()
            .filter(webauthn_challenges::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .context("purge expired ceremonies")?;
        Ok(result.rows_affected)
    }
}

impl DbChallengeRepository {
    /// A ceremony row is single-use. The delete decides the winner when two
    /// finish calls race for the same row.
    async fn delete_taken(
        &self,
        model: webauthn_challenges::Model,
    ) -> Result<Option<StoredCeremony>, AuthError> {
        let deleted = webauthn_challenges::Entity::delete_by_id(model.id)
            .exec(&self.db)
            .await
            .context("consume pending ceremony")?;
        if deleted.rows_affected == 0 {
            return Ok(None);
        }
        Ok(Some(ceremony_from_model(model)))
    }
}

fn ceremony_from_model(model: webauthn_challenges::Model) -> StoredCeremony {
    StoredCeremony {
        id: model.id,
        email: model.email,
        state: model.state,
        expires_at: model.expires_at,
        created_at: model.created_at,
    }
}

// ── Audit log repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuditLogRepository {
    pub db: DatabaseConnection,
}

impl AuditLogRepository for DbAuditLogRepository {
    async fn record_access(&self, event: &AccessEvent) -> Result<(), AuthError> {
        access_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(event.account_id),
            action: Set(event.action.as_str().to_owned()),
            method: Set(event.method.map(|m| m.as_str().to_owned())),
            ip: Set(event.ip.clone()),
            user_agent: Set(event.user_agent.clone()),
            success: Set(event.success),
            description: Set(event.description.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .context("record access event")?;
        Ok(())
    }

    async fn record_change(&self, event: &ChangeEvent) -> Result<(), AuthError> {
        change_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(event.account_id),
            table_name: Set(event.table_name.clone()),
            record_id: Set(event.record_id.clone()),
            action: Set(event.action.as_str().to_owned()),
            old_values: Set(event.old_values.clone()),
            new_values: Set(event.new_values.clone()),
            description: Set(event.description.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .context("record change event")?;
        Ok(())
    }
}
