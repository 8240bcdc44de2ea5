use std::sync::Arc;

use sea_orm::DatabaseConnection;
use webauthn_rs::Webauthn;

use crate::config::AuthConfig;
use crate::infra::db::{
    DbAccessCodeRepository, DbAccountRepository, DbAuditLogRepository, DbChallengeRepository,
    DbCredentialRepository, DbSessionRepository,
};
use crate::infra::mailer::SmtpMailer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub webauthn: Arc<Webauthn>,
    pub mailer: SmtpMailer,
    pub config: Arc<AuthConfig>,
}

impl AppState {
    pub fn account_repo(&self) -> DbAccountRepository {
        DbAccountRepository {
            db: self.db.clone(),
        }
    }

    pub fn access_code_repo(&self) -> DbAccessCodeRepository {
        DbAccessCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn credential_repo(&self) -> DbCredentialRepository {
        DbCredentialRepository {
            db: self.db.clone(),
        }
    }

    pub fn challenge_repo(&self) -> DbChallengeRepository {
        DbChallengeRepository {
            db: self.db.clone(),
        }
    }

    pub fn audit_repo(&self) -> DbAuditLogRepository {
        DbAuditLogRepository {
            db: self.db.clone(),
        }
    }
}
