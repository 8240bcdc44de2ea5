use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use conecta_domain::identity::Identity;

use crate::domain::repository::{AccountRepository, AuditLogRepository, SessionRepository};
use crate::domain::types::{AccessAction, AccessEvent, AuthAccount, SessionRecord};
use crate::error::AuthError;

/// Everything a handler needs to answer a successful login.
#[derive(Debug)]
pub struct SessionBundle {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Opaque session token: 32 random bytes, base64url without padding.
pub fn generate_session_token() -> String {
    let mut raw = [0u8; 32];
    rand::rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Creates a server-side session row for the account and returns the bundle
/// both login flows hand back to their handlers.
pub async fn issue_session<S>(
    sessions: &S,
    account: &AuthAccount,
    ttl_days: i64,
) -> Result<SessionBundle, AuthError>
where
    S: SessionRepository,
{
    let now = Utc::now();
    let token = generate_session_token();
    let session = SessionRecord {
        id: Uuid::new_v4(),
        account_id: account.id,
        token: token.clone(),
        expires_at: now + Duration::days(ttl_days),
        active: true,
        created_at: now,
    };
    sessions.create(&session).await?;

    Ok(SessionBundle {
        identity: Identity {
            account_id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        },
        token,
        expires_at: session.expires_at,
    })
}

// ── CurrentIdentity ──────────────────────────────────────────────────────────

pub struct CurrentIdentityUseCase<S, A>
where
    S: SessionRepository,
    A: AccountRepository,
{
    pub sessions: S,
    pub accounts: A,
}

impl<S, A> CurrentIdentityUseCase<S, A>
where
    S: SessionRepository,
    A: AccountRepository,
{
    /// Resolves a cookie token to the identity it belongs to. Sessions that
    /// turn out expired or orphaned are revoked on the way out so the next
    /// lookup short-circuits.
    pub async fn execute(&self, token: &str) -> Result<Identity, AuthError> {
        let session = self
            .sessions
            .find_active(token)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if session.is_expired(Utc::now()) {
            self.sessions.revoke(token).await?;
            return Err(AuthError::Unauthenticated);
        }

        let account = match self.accounts.find_by_id(session.account_id).await? {
            Some(account) if account.active => account,
            _ => {
                self.sessions.revoke(token).await?;
                return Err(AuthError::Unauthenticated);
            }
        };

        Ok(Identity {
            account_id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
        })
    }
}

// ── Logout ───────────────────────────────────────────────────────────────────

pub struct LogoutInput {
    pub token: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub struct LogoutUseCase<S, L>
where
    S: SessionRepository,
    L: AuditLogRepository,
{
    pub sessions: S,
    pub audit: L,
}

impl<S, L> LogoutUseCase<S, L>
where
    S: SessionRepository,
    L: AuditLogRepository,
{
    /// Revokes the session behind the token. Idempotent: an unknown or
    /// already-revoked token is not an error, the cookie gets cleared either
    /// way.
    pub async fn execute(&self, input: LogoutInput) -> Result<(), AuthError> {
        let Some(session) = self.sessions.find_active(&input.token).await? else {
            return Ok(());
        };

        self.sessions.revoke(&input.token).await?;

        let event = AccessEvent {
            account_id: session.account_id,
            action: AccessAction::Logoff,
            method: None,
            ip: input.ip,
            user_agent: input.user_agent,
            success: true,
            description: None,
        };
        if let Err(e) = self.audit.record_access(&event).await {
            tracing::warn!(error = %e, "failed to record logoff event");
        }

        Ok(())
    }
}
