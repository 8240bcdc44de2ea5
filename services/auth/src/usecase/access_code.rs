use chrono::{Duration, Utc};
use rand::RngExt;
use uuid::Uuid;

use conecta_domain::email::{is_valid_email, normalize_email};
use conecta_domain::role::Role;

use crate::domain::profile::{ProfileResolution, resolve_profiles};
use crate::domain::repository::{
    AccessCodeRepository, AccountRepository, AuditLogRepository, Mailer, SessionRepository,
};
use crate::domain::types::{AccessAction, AccessCode, AccessEvent, AuthAccount, AuthMethod};
use crate::error::AuthError;
use crate::usecase::session::{SessionBundle, issue_session};

/// Charset for generated access codes (digits only, typed over from email).
const DIGITS: &[u8] = b"0123456789";

fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| DIGITS[rng.random_range(0..DIGITS.len())] as char)
        .collect()
}

/// Fixed bypass code for local development. Compiled in only with the
/// `insecure-dev-login` feature; release builds never carry it.
#[cfg(feature = "insecure-dev-login")]
fn is_dev_code(code: &str) -> bool {
    code == "000000"
}

#[cfg(not(feature = "insecure-dev-login"))]
fn is_dev_code(_code: &str) -> bool {
    false
}

// ── RequestCode ──────────────────────────────────────────────────────────────

pub struct RequestCodeInput {
    pub email: String,
    pub role_hint: Option<Role>,
}

#[derive(Debug)]
pub enum RequestCodeOutcome {
    CodeSent,
    /// The email spans several roles and none was picked yet. Not an error:
    /// the client shows a profile chooser and resubmits with a role.
    RoleSelectionRequired { roles: Vec<Role> },
}

pub struct RequestCodeUseCase<A, C, M>
where
    A: AccountRepository,
    C: AccessCodeRepository,
    M: Mailer,
{
    pub accounts: A,
    pub access_codes: C,
    pub mailer: M,
    pub code_length: usize,
    pub code_ttl_hours: i64,
    pub debug: bool,
}

impl<A, C, M> RequestCodeUseCase<A, C, M>
where
    A: AccountRepository,
    C: AccessCodeRepository,
    M: Mailer,
{
    pub async fn execute(&self, input: RequestCodeInput) -> Result<RequestCodeOutcome, AuthError> {
        // 1. Resolve the target account → 404 unknown / 403 bad hint / chooser
        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            return Err(AuthError::UnknownEmail);
        }
        let candidates = self.accounts.find_active_by_email(&email).await?;
        let account = match resolve_profiles(candidates, input.role_hint) {
            ProfileResolution::None => return Err(AuthError::UnknownEmail),
            ProfileResolution::HintMismatch => return Err(AuthError::RoleMismatch),
            ProfileResolution::Multiple(roles) => {
                return Ok(RequestCodeOutcome::RoleSelectionRequired { roles });
            }
            ProfileResolution::Single(account) => account,
        };

        // 2. Generate + persist the code
        let now = Utc::now();
        let code = AccessCode {
            id: Uuid::new_v4(),
            account_id: account.id,
            code: generate_code(self.code_length),
            expires_at: now + Duration::hours(self.code_ttl_hours),
            used_at: None,
            created_at: now,
        };
        self.access_codes.create(&code).await?;
        if self.debug {
            tracing::info!(code = %code.code, email = %account.email, "issued access code");
        }

        // 3. Deliver. Debug builds treat delivery failure as non-fatal.
        if let Err(e) = self
            .mailer
            .send_access_code(&account.email, &account.name, &code.code, self.code_ttl_hours)
            .await
        {
            if !self.debug {
                return Err(e);
            }
            tracing::warn!(error = %e, email = %account.email, "access code delivery failed, continuing in debug");
        }

        Ok(RequestCodeOutcome::CodeSent)
    }
}

// ── ValidateCode ─────────────────────────────────────────────────────────────

pub struct ValidateCodeInput {
    pub email: String,
    pub code: String,
    pub role_hint: Option<Role>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub enum ValidateCodeOutcome {
    LoggedIn(SessionBundle),
    RoleSelectionRequired { roles: Vec<Role> },
}

pub struct ValidateCodeUseCase<A, C, S, L>
where
    A: AccountRepository,
    C: AccessCodeRepository,
    S: SessionRepository,
    L: AuditLogRepository,
{
    pub accounts: A,
    pub access_codes: C,
    pub sessions: S,
    pub audit: L,
    pub session_ttl_days: i64,
}

impl<A, C, S, L> ValidateCodeUseCase<A, C, S, L>
where
    A: AccountRepository,
    C: AccessCodeRepository,
    S: SessionRepository,
    L: AuditLogRepository,
{
    pub async fn execute(&self, input: ValidateCodeInput) -> Result<ValidateCodeOutcome, AuthError> {
        let email = normalize_email(&input.email);

        // 1. Resolve the account. With a role picked earlier the lookup
        //    includes deactivated rows; the active check runs after the code
        //    checks so the failure reason comes out right.
        let account = match input.role_hint {
            Some(role) => self
                .accounts
                .find_by_email_and_role(&email, role)
                .await?
                .ok_or(AuthError::InvalidOrUsedCode)?,
            None => {
                let candidates = self.accounts.find_active_by_email(&email).await?;
                match resolve_profiles(candidates, None) {
                    ProfileResolution::Single(account) => account,
                    ProfileResolution::Multiple(roles) => {
                        return Ok(ValidateCodeOutcome::RoleSelectionRequired { roles });
                    }
                    _ => return Err(AuthError::InvalidOrUsedCode),
                }
            }
        };

        // 2. Development bypass, absent from production builds
        if is_dev_code(&input.code) {
            if !account.active {
                return Err(AuthError::InactiveAccount);
            }
            let bundle = self.login(account, input.ip, input.user_agent).await?;
            return Ok(ValidateCodeOutcome::LoggedIn(bundle));
        }

        // 3. Newest unused row for (account, digits) → 401 when absent
        let code = match self
            .access_codes
            .find_latest_unused(account.id, &input.code)
            .await?
        {
            Some(code) => code,
            None => {
                self.log_failure(&account, &input, "unknown or already used code")
                    .await;
                return Err(AuthError::InvalidOrUsedCode);
            }
        };

        // 4. Expired → 401; the caller must request a fresh code
        if code.is_expired(Utc::now()) {
            self.log_failure(&account, &input, "access code expired").await;
            return Err(AuthError::CodeExpired);
        }

        // 5. Deactivated since issuance → 403, code left unconsumed
        if !account.active {
            self.log_failure(&account, &input, "account deactivated").await;
            return Err(AuthError::InactiveAccount);
        }

        // 6. Exactly-once consumption; zero rows affected means a concurrent
        //    request already spent this code
        if !self.access_codes.consume(code.id).await? {
            self.log_failure(&account, &input, "code consumed concurrently")
                .await;
            return Err(AuthError::InvalidOrUsedCode);
        }

        // 7. Session + audit
        let bundle = self.login(account, input.ip, input.user_agent).await?;
        Ok(ValidateCodeOutcome::LoggedIn(bundle))
    }

    async fn login(
        &self,
        account: AuthAccount,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SessionBundle, AuthError> {
        let bundle = issue_session(&self.sessions, &account, self.session_ttl_days).await?;
        let event = AccessEvent {
            account_id: account.id,
            action: AccessAction::Login,
            method: Some(AuthMethod::Code),
            ip,
            user_agent,
            success: true,
            description: None,
        };
        if let Err(e) = self.audit.record_access(&event).await {
            tracing::warn!(error = %e, "failed to record login event");
        }
        Ok(bundle)
    }

    async fn log_failure(&self, account: &AuthAccount, input: &ValidateCodeInput, reason: &str) {
        let event = AccessEvent {
            account_id: account.id,
            action: AccessAction::Login,
            method: Some(AuthMethod::Code),
            ip: input.ip.clone(),
            user_agent: input.user_agent.clone(),
            success: false,
            description: Some(reason.to_owned()),
        };
        if let Err(e) = self.audit.record_access(&event).await {
            tracing::warn!(error = %e, "failed to record login failure");
        }
    }
}

// ── RolesByEmail ─────────────────────────────────────────────────────────────

pub struct RolesByEmailUseCase<A>
where
    A: AccountRepository,
{
    pub accounts: A,
}

impl<A> RolesByEmailUseCase<A>
where
    A: AccountRepository,
{
    /// Sorted roles of the active accounts behind an email. Empty when the
    /// email is unknown; the login page treats that the same as one role.
    pub async fn execute(&self, email: &str) -> Result<Vec<Role>, AuthError> {
        let accounts = self
            .accounts
            .find_active_by_email(&normalize_email(email))
            .await?;
        let mut roles: Vec<Role> = accounts.into_iter().map(|a| a.role).collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }
}
