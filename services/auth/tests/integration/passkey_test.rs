use chrono::{Duration, Utc};
use uuid::Uuid;

use conecta_auth::domain::types::ChangeAction;
use conecta_auth::error::AuthError;
use conecta_auth::usecase::passkey::{
    CeremonyState, FinishLoginInput, FinishLoginUseCase, FinishRegistrationUseCase,
    HasCredentialUseCase, ListCredentialsUseCase, RevokeCredentialUseCase,
    StartLoginUseCase, StartRegistrationUseCase,
};
use conecta_domain::identity::Identity;
use conecta_domain::role::Role;

use crate::helpers::*;

fn ana_identity() -> Identity {
    let account = guardian_account();
    Identity {
        account_id: account.id,
        name: account.name,
        email: account.email,
        role: Role::Guardian,
    }
}

// ── ListCredentialsUseCase ───────────────────────────────────────────────────

#[tokio::test]
async fn should_list_credentials_with_base64_ids() {
    let usecase = ListCredentialsUseCase {
        credentials: MockCredentialRepo::new(vec![test_credential("ana@example.com")]),
    };

    let summaries = usecase.execute("ana@example.com").await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].credential_id, "AQIDBA");
    assert_eq!(summaries[0].aaguid, Uuid::nil());
    assert_eq!(summaries[0].transports, vec!["internal"]);
    assert!(summaries[0].last_used_at.is_none());
}

#[tokio::test]
async fn should_skip_revoked_and_foreign_credentials() {
    let mut revoked = test_credential("ana@example.com");
    revoked.credential_id = vec![9, 9, 9];
    revoked.active = false;
    let foreign = {
        let mut c = test_credential("bob@example.com");
        c.credential_id = vec![8, 8, 8];
        c
    };
    let usecase = ListCredentialsUseCase {
        credentials: MockCredentialRepo::new(vec![
            test_credential("ana@example.com"),
            revoked,
            foreign,
        ]),
    };

    let summaries = usecase.execute("ana@example.com").await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].credential_id, "AQIDBA");
}

// ── RevokeCredentialUseCase ──────────────────────────────────────────────────

#[tokio::test]
async fn should_revoke_an_owned_credential() {
    let credentials = MockCredentialRepo::new(vec![test_credential("ana@example.com")]);
    let credential_rows = credentials.credentials_handle();
    let audit = MockAuditLog::new();
    let changes = audit.change_handle();
    let usecase = RevokeCredentialUseCase { credentials, audit };

    usecase.execute(&ana_identity(), "AQIDBA").await.unwrap();

    assert!(!credential_rows.lock().unwrap()[0].active);

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].table_name, "webauthn_credentials");
    assert_eq!(changes[0].record_id.as_deref(), Some("AQIDBA"));
    assert_eq!(changes[0].action, ChangeAction::Update);
    assert_eq!(
        changes[0].new_values,
        Some(serde_json::json!({ "active": false }))
    );
}

#[tokio::test]
async fn should_reject_revoking_an_unknown_credential() {
    let usecase = RevokeCredentialUseCase {
        credentials: MockCredentialRepo::empty(),
        audit: MockAuditLog::new(),
    };

    let result = usecase.execute(&ana_identity(), "AQIDBA").await;

    assert!(
        matches!(result, Err(AuthError::UnknownCredential)),
        "expected UnknownCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_a_malformed_credential_id() {
    let usecase = RevokeCredentialUseCase {
        credentials: MockCredentialRepo::new(vec![test_credential("ana@example.com")]),
        audit: MockAuditLog::new(),
    };

    let result = usecase.execute(&ana_identity(), "!!! not base64 !!!").await;

    assert!(
        matches!(result, Err(AuthError::UnknownCredential)),
        "expected UnknownCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_revoke_another_emails_credential() {
    let credentials = MockCredentialRepo::new(vec![test_credential("bob@example.com")]);
    let credential_rows = credentials.credentials_handle();
    let usecase = RevokeCredentialUseCase {
        credentials,
        audit: MockAuditLog::new(),
    };

    let result = usecase.execute(&ana_identity(), "AQIDBA").await;

    assert!(
        matches!(result, Err(AuthError::UnknownCredential)),
        "expected UnknownCredential, got {result:?}"
    );
    assert!(credential_rows.lock().unwrap()[0].active);
}

// ── HasCredentialUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_detect_an_existing_credential() {
    let usecase = HasCredentialUseCase {
        credentials: MockCredentialRepo::new(vec![test_credential("ana@example.com")]),
    };

    assert!(usecase.execute("Ana@Example.com").await.unwrap());
}

#[tokio::test]
async fn should_ignore_revoked_credentials_for_presence() {
    let mut credential = test_credential("ana@example.com");
    credential.active = false;
    let usecase = HasCredentialUseCase {
        credentials: MockCredentialRepo::new(vec![credential]),
    };

    assert!(!usecase.execute("ana@example.com").await.unwrap());
}

// ── StartRegistrationUseCase ─────────────────────────────────────────────────

#[tokio::test]
async fn should_store_a_registration_ceremony() {
    let mut expired = test_ceremony(Some("ana@example.com"), vec![]);
    expired.expires_at = Utc::now() - Duration::minutes(1);
    let challenges = MockChallengeRepo::new(vec![expired]);
    let ceremonies = challenges.ceremonies_handle();
    let usecase = StartRegistrationUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges,
        webauthn: test_webauthn(),
    };

    let ccr = usecase.execute(&ana_identity()).await.unwrap();

    assert_eq!(ccr.public_key.rp.id, "localhost");
    assert_eq!(ccr.public_key.user.name, "ana@example.com");
    assert!(ccr.public_key.exclude_credentials.is_none());

    // The expired ceremony was purged; only the fresh one remains.
    let ceremonies = ceremonies.lock().unwrap();
    assert_eq!(ceremonies.len(), 1);
    assert_eq!(ceremonies[0].email.as_deref(), Some("ana@example.com"));
    let state: CeremonyState = serde_json::from_slice(&ceremonies[0].state).unwrap();
    assert!(matches!(state, CeremonyState::Registration(_)));
}

#[tokio::test]
async fn should_exclude_already_enrolled_authenticators() {
    let usecase = StartRegistrationUseCase {
        credentials: MockCredentialRepo::new(vec![test_credential("ana@example.com")]),
        challenges: MockChallengeRepo::empty(),
        webauthn: test_webauthn(),
    };

    let ccr = usecase.execute(&ana_identity()).await.unwrap();

    let exclude = ccr.public_key.exclude_credentials.unwrap();
    assert_eq!(exclude.len(), 1);
    assert_eq!(exclude[0].id.as_ref(), &[1u8, 2, 3, 4]);
}

// ── FinishRegistrationUseCase ────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_finishing_without_a_ceremony() {
    let usecase = FinishRegistrationUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::empty(),
        audit: MockAuditLog::new(),
        webauthn: test_webauthn(),
        debug: false,
    };

    let result = usecase.execute(&ana_identity(), dummy_attestation()).await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_an_expired_ceremony() {
    let mut ceremony = test_ceremony(Some("ana@example.com"), vec![]);
    ceremony.expires_at = Utc::now() - Duration::minutes(1);
    let usecase = FinishRegistrationUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::new(vec![ceremony]),
        audit: MockAuditLog::new(),
        webauthn: test_webauthn(),
        debug: false,
    };

    let result = usecase.execute(&ana_identity(), dummy_attestation()).await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_a_login_ceremony_on_the_registration_path() {
    let webauthn = test_webauthn();
    let (_, disc_state) = webauthn.start_discoverable_authentication().unwrap();
    let state = serde_json::to_vec(&CeremonyState::Discoverable(disc_state)).unwrap();
    let challenges = MockChallengeRepo::new(vec![test_ceremony(Some("ana@example.com"), state)]);
    let ceremonies = challenges.ceremonies_handle();
    let usecase = FinishRegistrationUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges,
        audit: MockAuditLog::new(),
        webauthn,
        debug: false,
    };

    let result = usecase.execute(&ana_identity(), dummy_attestation()).await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
    // Single use: the mismatched ceremony was still consumed.
    assert!(ceremonies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_undecodable_ceremony_state() {
    let challenges = MockChallengeRepo::new(vec![test_ceremony(
        Some("ana@example.com"),
        b"not json".to_vec(),
    )]);
    let usecase = FinishRegistrationUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges,
        audit: MockAuditLog::new(),
        webauthn: test_webauthn(),
        debug: false,
    };

    let result = usecase.execute(&ana_identity(), dummy_attestation()).await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
}

// ── StartLoginUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_starting_for_an_email_without_credentials() {
    let usecase = StartLoginUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::empty(),
        webauthn: test_webauthn(),
    };

    let result = usecase.execute(Some("ana@example.com")).await;

    assert!(
        matches!(result, Err(AuthError::UnknownCredential)),
        "expected UnknownCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_start_a_discoverable_ceremony_without_an_email() {
    let mut expired = test_ceremony(None, vec![]);
    expired.expires_at = Utc::now() - Duration::minutes(1);
    let challenges = MockChallengeRepo::new(vec![expired]);
    let ceremonies = challenges.ceremonies_handle();
    let usecase = StartLoginUseCase {
        credentials: MockCredentialRepo::empty(),
        challenges,
        webauthn: test_webauthn(),
    };

    let out = usecase.execute(None).await.unwrap();

    // Discoverable options name no credentials; any resident key may answer.
    assert!(out.challenge.public_key.allow_credentials.is_empty());

    let ceremonies = ceremonies.lock().unwrap();
    assert_eq!(ceremonies.len(), 1);
    assert_eq!(ceremonies[0].id, out.ceremony_id);
    assert!(ceremonies[0].email.is_none());
    let state: CeremonyState = serde_json::from_slice(&ceremonies[0].state).unwrap();
    assert!(matches!(state, CeremonyState::Discoverable(_)));
}

// ── FinishLoginUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_finishing_an_unknown_login_ceremony() {
    let usecase = FinishLoginUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::empty(),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        webauthn: test_webauthn(),
        session_ttl_days: 7,
        debug: false,
    };

    let result = usecase
        .execute(FinishLoginInput {
            ceremony_id: Uuid::new_v4(),
            role_hint: None,
            credential: dummy_assertion(),
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_a_registration_ceremony_on_the_login_path() {
    let webauthn = test_webauthn();
    let (_, reg_state) = webauthn
        .start_passkey_registration(Uuid::new_v4(), "ana@example.com", "Ana Souza", None)
        .unwrap();
    let state = serde_json::to_vec(&CeremonyState::Registration(reg_state)).unwrap();
    let ceremony = test_ceremony(Some("ana@example.com"), state);
    let ceremony_id = ceremony.id;
    let usecase = FinishLoginUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::new(vec![ceremony]),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        webauthn,
        session_ttl_days: 7,
        debug: false,
    };

    let result = usecase
        .execute(FinishLoginInput {
            ceremony_id,
            role_hint: None,
            credential: dummy_assertion(),
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::ChallengeExpiredOrMissing)),
        "expected ChallengeExpiredOrMissing, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_a_discoverable_assertion_for_an_unknown_credential() {
    let webauthn = test_webauthn();
    let (_, disc_state) = webauthn.start_discoverable_authentication().unwrap();
    let state = serde_json::to_vec(&CeremonyState::Discoverable(disc_state)).unwrap();
    let ceremony = test_ceremony(None, state);
    let ceremony_id = ceremony.id;
    let usecase = FinishLoginUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        credentials: MockCredentialRepo::empty(),
        challenges: MockChallengeRepo::new(vec![ceremony]),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        webauthn,
        session_ttl_days: 7,
        debug: false,
    };

    // The asserted raw id is not enrolled, so the lookup fails before any
    // cryptographic verification runs.
    let result = usecase
        .execute(FinishLoginInput {
            ceremony_id,
            role_hint: None,
            credential: dummy_assertion(),
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::UnknownCredential)),
        "expected UnknownCredential, got {result:?}"
    );
}
