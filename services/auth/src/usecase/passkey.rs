use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webauthn_rs::prelude::*;

use conecta_domain::email::normalize_email;
use conecta_domain::identity::Identity;
use conecta_domain::role::Role;

use crate::domain::profile::{ProfileResolution, resolve_profiles};
use crate::domain::repository::{
    AccountRepository, AuditLogRepository, ChallengeRepository, CredentialRepository,
    SessionRepository,
};
use crate::domain::types::{
    AccessAction, AccessEvent, AuthMethod, CHALLENGE_TTL_MINS, ChangeAction, ChangeEvent,
    StoredCeremony, StoredCredential,
};
use crate::error::AuthError;
use crate::usecase::session::{SessionBundle, issue_session};

/// Serialized into `webauthn_challenges.state`. The tag keeps a registration
/// ceremony from being finished through the login endpoint and vice versa.
#[derive(Serialize, Deserialize)]
pub enum CeremonyState {
    Registration(PasskeyRegistration),
    Authentication(PasskeyAuthentication),
    Discoverable(DiscoverableAuthentication),
}

fn encode_state(state: &CeremonyState) -> Result<Vec<u8>, AuthError> {
    serde_json::to_vec(state).map_err(|e| AuthError::Unavailable(e.into()))
}

/// Undecodable state reads as no ceremony at all.
fn decode_state(raw: &[u8]) -> Option<CeremonyState> {
    serde_json::from_slice(raw).ok()
}

fn stored_passkey(credential: &StoredCredential) -> Result<Passkey, AuthError> {
    serde_json::from_slice(&credential.public_key)
        .map_err(|e| AuthError::Unavailable(anyhow::anyhow!("stored credential is unreadable: {e}")))
}

// ── List credentials ──────────────────────────────────────────────────────────

pub struct CredentialSummary {
    pub credential_id: String,
    pub aaguid: Uuid,
    pub transports: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

pub struct ListCredentialsUseCase<C>
where
    C: CredentialRepository,
{
    pub credentials: C,
}

impl<C> ListCredentialsUseCase<C>
where
    C: CredentialRepository,
{
    pub async fn execute(&self, email: &str) -> Result<Vec<CredentialSummary>, AuthError> {
        let records = self.credentials.list_active_by_email(email).await?;
        Ok(records
            .into_iter()
            .map(|r| CredentialSummary {
                credential_id: URL_SAFE_NO_PAD.encode(&r.credential_id),
                aaguid: r.aaguid,
                transports: r.transports,
                created_at: r.created_at,
                last_used_at: r.last_used_at,
            })
            .collect())
    }
}

// ── Revoke credential ─────────────────────────────────────────────────────────

pub struct RevokeCredentialUseCase<C, L>
where
    C: CredentialRepository,
    L: AuditLogRepository,
{
    pub credentials: C,
    pub audit: L,
}

impl<C, L> RevokeCredentialUseCase<C, L>
where
    C: CredentialRepository,
    L: AuditLogRepository,
{
    /// Soft-deletes a credential owned by the caller's email. The row stays
    /// for the audit trail; only `active` flips.
    pub async fn execute(&self, identity: &Identity, credential_id: &str) -> Result<(), AuthError> {
        let raw_id = URL_SAFE_NO_PAD
            .decode(credential_id)
            .map_err(|_| AuthError::UnknownCredential)?;

        let revoked = self.credentials.revoke(&raw_id, &identity.email).await?;
        if !revoked {
            return Err(AuthError::UnknownCredential);
        }

        let event = ChangeEvent {
            account_id: identity.account_id,
            table_name: "webauthn_credentials".to_owned(),
            record_id: Some(credential_id.to_owned()),
            action: ChangeAction::Update,
            old_values: Some(serde_json::json!({ "active": true })),
            new_values: Some(serde_json::json!({ "active": false })),
            description: Some("passkey revoked".to_owned()),
        };
        if let Err(e) = self.audit.record_change(&event).await {
            tracing::warn!(error = %e, "failed to record credential revocation");
        }

        Ok(())
    }
}

// ── Has credential ────────────────────────────────────────────────────────────

pub struct HasCredentialUseCase<C>
where
    C: CredentialRepository,
{
    pub credentials: C,
}

impl<C> HasCredentialUseCase<C>
where
    C: CredentialRepository,
{
    pub async fn execute(&self, email: &str) -> Result<bool, AuthError> {
        self.credentials
            .exists_for_email(&normalize_email(email))
            .await
    }
}

// ── Start registration ────────────────────────────────────────────────────────

pub struct StartRegistrationUseCase<C, H>
where
    C: CredentialRepository,
    H: ChallengeRepository,
{
    pub credentials: C,
    pub challenges: H,
    pub webauthn: Arc<Webauthn>,
}

impl<C, H> StartRegistrationUseCase<C, H>
where
    C: CredentialRepository,
    H: ChallengeRepository,
{
    pub async fn execute(&self, identity: &Identity) -> Result<CreationChallengeResponse, AuthError> {
        purge_expired(&self.challenges).await?;

        // Exclude list from existing credentials so the same authenticator
        // cannot enroll twice.
        let existing = self
            .credentials
            .list_active_by_email(&identity.email)
            .await?;
        let exclude: Option<Vec<CredentialID>> = if existing.is_empty() {
            None
        } else {
            Some(
                existing
                    .iter()
                    .map(|r| CredentialID::from(r.credential_id.clone()))
                    .collect(),
            )
        };

        // The user handle is derived from the email, not the account id, so
        // one credential covers every role sharing that email.
        let handle = Uuid::new_v5(&Uuid::NAMESPACE_URL, identity.email.as_bytes());
        let (ccr, reg_state) = self
            .webauthn
            .start_passkey_registration(handle, &identity.email, &identity.name, exclude)
            .map_err(|e| AuthError::Unavailable(anyhow::anyhow!("{e}")))?;

        let now = Utc::now();
        let ceremony = StoredCeremony {
            id: Uuid::new_v4(),
            email: Some(identity.email.clone()),
            state: encode_state(&CeremonyState::Registration(reg_state))?,
            expires_at: now + Duration::minutes(CHALLENGE_TTL_MINS),
            created_at: now,
        };
        self.challenges.create(&ceremony).await?;

        Ok(ccr)
    }
}

// ── Finish registration ───────────────────────────────────────────────────────

pub struct FinishRegistrationUseCase<C, H, L>
where
    C: CredentialRepository,
    H: ChallengeRepository,
    L: AuditLogRepository,
{
    pub credentials: C,
    pub challenges: H,
    pub audit: L,
    pub webauthn: Arc<Webauthn>,
    pub debug: bool,
}

impl<C, H, L> FinishRegistrationUseCase<C, H, L>
where
    C: CredentialRepository,
    H: ChallengeRepository,
    L: AuditLogRepository,
{
    pub async fn execute(
        &self,
        identity: &Identity,
        credential: RegisterPublicKeyCredential,
    ) -> Result<(), AuthError> {
        // 1. Single-use ceremony: the read deletes the row, so a replayed
        //    attestation finds nothing
        let ceremony = self
            .challenges
            .take_latest_for_email(&identity.email)
            .await?
            .ok_or(AuthError::ChallengeExpiredOrMissing)?;
        let Some(CeremonyState::Registration(reg_state)) = decode_state(&ceremony.state) else {
            return Err(AuthError::ChallengeExpiredOrMissing);
        };

        // 2. Cryptographic verification against challenge, RP id and origin
        let passkey = self
            .webauthn
            .finish_passkey_registration(&credential, &reg_state)
            .map_err(|e| AuthError::verification(self.debug, e))?;

        // 3. Authenticator metadata straight from the attestation object
        let attested = parse_attested_data(credential.response.attestation_object.as_ref())
            .unwrap_or_default();
        let record = StoredCredential {
            credential_id: passkey.cred_id().to_vec(),
            email: identity.email.clone(),
            public_key: serde_json::to_vec(&passkey)
                .map_err(|e| AuthError::Unavailable(e.into()))?,
            sign_count: i64::from(attested.sign_count),
            transports: transport_labels(&credential),
            backup_eligible: attested.backup_eligible,
            backup_state: attested.backup_state,
            aaguid: attested.aaguid,
            active: true,
            created_at: Utc::now(),
            last_used_at: None,
        };

        // 4. Duplicate credential ids are a no-op, not an error
        let created = self.credentials.create_if_absent(&record).await?;
        if created {
            let event = ChangeEvent {
                account_id: identity.account_id,
                table_name: "webauthn_credentials".to_owned(),
                record_id: Some(URL_SAFE_NO_PAD.encode(&record.credential_id)),
                action: ChangeAction::Insert,
                old_values: None,
                new_values: Some(serde_json::json!({
                    "aaguid": record.aaguid,
                    "transports": record.transports,
                    "backup_eligible": record.backup_eligible,
                })),
                description: Some("passkey registered".to_owned()),
            };
            if let Err(e) = self.audit.record_change(&event).await {
                tracing::warn!(error = %e, "failed to record credential registration");
            }
        }

        Ok(())
    }
}

// ── Start login ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct StartLoginOutput {
    pub ceremony_id: Uuid,
    pub challenge: RequestChallengeResponse,
}

pub struct StartLoginUseCase<C, H>
where
    C: CredentialRepository,
    H: ChallengeRepository,
{
    pub credentials: C,
    pub challenges: H,
    pub webauthn: Arc<Webauthn>,
}

impl<C, H> StartLoginUseCase<C, H>
where
    C: CredentialRepository,
    H: ChallengeRepository,
{
    /// With an email the options carry that email's credential ids; without
    /// one the ceremony is discoverable and any resident key may answer.
    pub async fn execute(&self, email: Option<&str>) -> Result<StartLoginOutput, AuthError> {
        purge_expired(&self.challenges).await?;

        let now = Utc::now();
        let (ceremony_email, challenge, state) = match email {
            Some(email) => {
                let email = normalize_email(email);
                let stored = self.credentials.list_active_by_email(&email).await?;
                if stored.is_empty() {
                    return Err(AuthError::UnknownCredential);
                }
                let passkeys: Vec<Passkey> = stored
                    .iter()
                    .filter_map(|r| serde_json::from_slice(&r.public_key).ok())
                    .collect();

                let (rcr, auth_state) = self
                    .webauthn
                    .start_passkey_authentication(&passkeys)
                    .map_err(|e| AuthError::Unavailable(anyhow::anyhow!("{e}")))?;
                (
                    Some(email),
                    rcr,
                    CeremonyState::Authentication(auth_state),
                )
            }
            None => {
                let (rcr, disc_state) = self
                    .webauthn
                    .start_discoverable_authentication()
                    .map_err(|e| AuthError::Unavailable(anyhow::anyhow!("{e}")))?;
                (None, rcr, CeremonyState::Discoverable(disc_state))
            }
        };

        let ceremony = StoredCeremony {
            id: Uuid::new_v4(),
            email: ceremony_email,
            state: encode_state(&state)?,
            expires_at: now + Duration::minutes(CHALLENGE_TTL_MINS),
            created_at: now,
        };
        self.challenges.create(&ceremony).await?;

        Ok(StartLoginOutput {
            ceremony_id: ceremony.id,
            challenge,
        })
    }
}

// ── Finish login ──────────────────────────────────────────────────────────────

pub struct FinishLoginInput {
    pub ceremony_id: Uuid,
    pub role_hint: Option<Role>,
    pub credential: PublicKeyCredential,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub enum PasskeyLoginOutcome {
    LoggedIn(SessionBundle),
    /// Verification succeeded but the credential's email spans several
    /// roles. The client picks one and runs a fresh ceremony with it.
    RoleSelectionRequired { roles: Vec<Role> },
}

pub struct FinishLoginUseCase<A, C, H, S, L>
where
    A: AccountRepository,
    C: CredentialRepository,
    H: ChallengeRepository,
    S: SessionRepository,
    L: AuditLogRepository,
{
    pub accounts: A,
    pub credentials: C,
    pub challenges: H,
    pub sessions: S,
    pub audit: L,
    pub webauthn: Arc<Webauthn>,
    pub session_ttl_days: i64,
    pub debug: bool,
}

impl<A, C, H, S, L> FinishLoginUseCase<A, C, H, S, L>
where
    A: AccountRepository,
    C: CredentialRepository,
    H: ChallengeRepository,
    S: SessionRepository,
    L: AuditLogRepository,
{
    pub async fn execute(&self, input: FinishLoginInput) -> Result<PasskeyLoginOutcome, AuthError> {
        // 1. Single-use ceremony state, deleted on read
        let ceremony = self
            .challenges
            .take_by_id(input.ceremony_id)
            .await?
            .ok_or(AuthError::ChallengeExpiredOrMissing)?;

        // 2. Assertion verification; the discoverable path must load the
        //    stored key first to hand it to the verifier
        let (auth_result, stored) = match decode_state(&ceremony.state) {
            Some(CeremonyState::Authentication(state)) => {
                let result = self
                    .webauthn
                    .finish_passkey_authentication(&input.credential, &state)
                    .map_err(|e| AuthError::verification(self.debug, e))?;
                let stored = self
                    .credentials
                    .find_active_by_id(result.cred_id().as_ref())
                    .await?
                    .ok_or(AuthError::UnknownCredential)?;
                (result, stored)
            }
            Some(CeremonyState::Discoverable(state)) => {
                let stored = self
                    .credentials
                    .find_active_by_id(input.credential.raw_id.as_ref())
                    .await?
                    .ok_or(AuthError::UnknownCredential)?;
                let passkey = stored_passkey(&stored)?;
                let keys = vec![DiscoverableKey::from(&passkey)];
                let result = self
                    .webauthn
                    .finish_discoverable_authentication(&input.credential, state, &keys)
                    .map_err(|e| AuthError::verification(self.debug, e))?;
                (result, stored)
            }
            _ => return Err(AuthError::ChallengeExpiredOrMissing),
        };

        // 3. Persist counter movement; a changed credential is re-serialized
        let mut passkey = stored_passkey(&stored)?;
        if passkey.update_credential(&auth_result) == Some(true) {
            let updated =
                serde_json::to_vec(&passkey).map_err(|e| AuthError::Unavailable(e.into()))?;
            self.credentials
                .update_public_key(&stored.credential_id, &updated)
                .await?;
        }
        self.credentials
            .record_use(&stored.credential_id, i64::from(auth_result.counter()))
            .await?;

        // 4. Post-hoc role resolution over the credential's email
        let candidates = self.accounts.find_active_by_email(&stored.email).await?;
        let account = match resolve_profiles(candidates, input.role_hint) {
            ProfileResolution::None => return Err(AuthError::InactiveAccount),
            ProfileResolution::HintMismatch => return Err(AuthError::RoleMismatch),
            ProfileResolution::Multiple(roles) => {
                return Ok(PasskeyLoginOutcome::RoleSelectionRequired { roles });
            }
            ProfileResolution::Single(account) => account,
        };

        // 5. Session + audit
        let bundle = issue_session(&self.sessions, &account, self.session_ttl_days).await?;
        let event = AccessEvent {
            account_id: account.id,
            action: AccessAction::Login,
            method: Some(AuthMethod::Passkey),
            ip: input.ip,
            user_agent: input.user_agent,
            success: true,
            description: None,
        };
        if let Err(e) = self.audit.record_access(&event).await {
            tracing::warn!(error = %e, "failed to record login event");
        }

        Ok(PasskeyLoginOutcome::LoggedIn(bundle))
    }
}

async fn purge_expired<H: ChallengeRepository>(challenges: &H) -> Result<(), AuthError> {
    let purged = challenges.purge_expired().await?;
    if purged > 0 {
        tracing::debug!(purged, "purged expired webauthn ceremonies");
    }
    Ok(())
}

// ── Attested data extraction ──────────────────────────────────────────────────

/// Fields read straight out of the attestation object's `authData`.
#[derive(Debug, Default, PartialEq, Eq)]
struct AttestedData {
    aaguid: Uuid,
    sign_count: u32,
    backup_eligible: bool,
    backup_state: bool,
}

/// Walks the attestation object (CBOR map of `fmt`, `attStmt`, `authData`)
/// to its `authData` bytes: rpIdHash occupies 0..32, the flags byte 32, the
/// big-endian signature counter 33..37 and the AAGUID 37..53.
fn parse_attested_data(attestation_object: &[u8]) -> Option<AttestedData> {
    // https://www.rfc-editor.org/rfc/rfc8949.html#section-3.2.2
    let mut decoder = minicbor::Decoder::new(attestation_object);
    decoder.map().ok()?;

    // fmt
    decoder.skip().ok()?;
    decoder.skip().ok()?;

    // attStmt
    decoder.skip().ok()?;
    decoder.skip().ok()?;

    let key = decoder.str().ok()?;
    if key != "authData" {
        return None;
    }
    let auth_data = decoder.bytes().ok()?;
    if auth_data.len() < 53 {
        return None;
    }

    let flags = auth_data[32];
    let mut count = [0u8; 4];
    count.copy_from_slice(&auth_data[33..37]);
    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&auth_data[37..53]);

    Some(AttestedData {
        aaguid: Uuid::from_bytes(aaguid),
        sign_count: u32::from_be_bytes(count),
        backup_eligible: flags & 0x08 != 0,
        backup_state: flags & 0x10 != 0,
    })
}

/// Wire names of the reported transports ("internal", "usb", ...), read via
/// serialization so the exact label set tracks the library.
fn transport_labels(credential: &RegisterPublicKeyCredential) -> Vec<String> {
    match serde_json::to_value(&credential.response.transports) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
