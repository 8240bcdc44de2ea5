use chrono::{Duration, Utc};

use conecta_auth::domain::types::{AccessAction, AuthMethod};
use conecta_auth::error::AuthError;
use conecta_auth::usecase::access_code::{
    RequestCodeInput, RequestCodeOutcome, RequestCodeUseCase, RolesByEmailUseCase,
    ValidateCodeInput, ValidateCodeOutcome, ValidateCodeUseCase,
};
use conecta_domain::role::Role;

use crate::helpers::*;

// ── RequestCodeUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_email_a_freshly_stored_code() {
    let access_codes = MockAccessCodeRepo::empty();
    let codes = access_codes.codes_handle();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes,
        mailer,
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let outcome = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, RequestCodeOutcome::CodeSent));
    let codes = codes.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].account_id, guardian_account().id);
    assert_eq!(codes[0].code.len(), 6);
    assert!(codes[0].code.chars().all(|c| c.is_ascii_digit()));
    assert!(codes[0].used_at.is_none());
    assert_eq!(codes[0].expires_at - codes[0].created_at, Duration::hours(24));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ana@example.com");
    assert_eq!(sent[0].name, "Ana Souza");
    assert_eq!(sent[0].code, codes[0].code);
    assert_eq!(sent[0].ttl_hours, 24);
}

#[tokio::test]
async fn should_normalize_email_before_lookup() {
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::empty(),
        mailer: MockMailer::new(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let outcome = usecase
        .execute(RequestCodeInput {
            email: "  Ana@Example.COM ".to_owned(),
            role_hint: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, RequestCodeOutcome::CodeSent));
}

#[tokio::test]
async fn should_reject_unknown_email() {
    let access_codes = MockAccessCodeRepo::empty();
    let codes = access_codes.codes_handle();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::empty(),
        access_codes,
        mailer,
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let result = usecase
        .execute(RequestCodeInput {
            email: "nobody@example.com".to_owned(),
            role_hint: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::UnknownEmail)),
        "expected UnknownEmail, got {result:?}"
    );
    assert!(codes.lock().unwrap().is_empty());
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_a_syntactically_invalid_email() {
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::empty(),
        mailer: MockMailer::new(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let result = usecase
        .execute(RequestCodeInput {
            email: "not an address".to_owned(),
            role_hint: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::UnknownEmail)),
        "expected UnknownEmail, got {result:?}"
    );
}

#[tokio::test]
async fn should_treat_inactive_only_email_as_unknown() {
    let mut account = guardian_account();
    account.active = false;
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![account]),
        access_codes: MockAccessCodeRepo::empty(),
        mailer: MockMailer::new(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let result = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::UnknownEmail)),
        "expected UnknownEmail, got {result:?}"
    );
}

#[tokio::test]
async fn should_ask_for_role_when_email_spans_profiles() {
    let access_codes = MockAccessCodeRepo::empty();
    let codes = access_codes.codes_handle();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account(), school_account()]),
        access_codes,
        mailer,
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let outcome = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: None,
        })
        .await
        .unwrap();

    match outcome {
        RequestCodeOutcome::RoleSelectionRequired { roles } => {
            assert_eq!(roles, vec![Role::School, Role::Guardian]);
        }
        other => panic!("expected RoleSelectionRequired, got {other:?}"),
    }
    assert!(codes.lock().unwrap().is_empty());
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_honor_role_hint_across_profiles() {
    let access_codes = MockAccessCodeRepo::empty();
    let codes = access_codes.codes_handle();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account(), school_account()]),
        access_codes,
        mailer,
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let outcome = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: Some(Role::School),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, RequestCodeOutcome::CodeSent));
    assert_eq!(codes.lock().unwrap()[0].account_id, school_account().id);
    assert_eq!(sent.lock().unwrap()[0].name, "Escola Vila Nova");
}

#[tokio::test]
async fn should_reject_hint_for_role_not_held() {
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::empty(),
        mailer: MockMailer::new(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let result = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: Some(Role::Admin),
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::RoleMismatch)),
        "expected RoleMismatch, got {result:?}"
    );
}

#[tokio::test]
async fn should_fail_the_request_when_delivery_fails() {
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::empty(),
        mailer: MockMailer::failing(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: false,
    };

    let result = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::DeliveryFailed)),
        "expected DeliveryFailed, got {result:?}"
    );
}

#[tokio::test]
async fn should_continue_past_delivery_failure_in_debug() {
    let access_codes = MockAccessCodeRepo::empty();
    let codes = access_codes.codes_handle();
    let usecase = RequestCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes,
        mailer: MockMailer::failing(),
        code_length: 6,
        code_ttl_hours: 24,
        debug: true,
    };

    let outcome = usecase
        .execute(RequestCodeInput {
            email: "ana@example.com".to_owned(),
            role_hint: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, RequestCodeOutcome::CodeSent));
    assert_eq!(codes.lock().unwrap().len(), 1);
}

// ── ValidateCodeUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_login_with_valid_code() {
    let account = guardian_account();
    let access_codes = MockAccessCodeRepo::new(vec![test_access_code(account.id)]);
    let codes = access_codes.codes_handle();
    let sessions = MockSessionRepo::empty();
    let session_rows = sessions.sessions_handle();
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account.clone()]),
        access_codes,
        sessions,
        audit,
        session_ttl_days: 7,
    };

    let outcome = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: Some("203.0.113.9".to_owned()),
            user_agent: Some("integration-test".to_owned()),
        })
        .await
        .unwrap();

    let bundle = match outcome {
        ValidateCodeOutcome::LoggedIn(bundle) => bundle,
        other => panic!("expected LoggedIn, got {other:?}"),
    };
    assert_eq!(bundle.identity.account_id, account.id);
    assert_eq!(bundle.identity.email, "ana@example.com");
    assert_eq!(bundle.identity.role, Role::Guardian);
    assert_eq!(bundle.token.len(), 43);

    assert!(codes.lock().unwrap()[0].used_at.is_some());

    let session_rows = session_rows.lock().unwrap();
    assert_eq!(session_rows.len(), 1);
    assert_eq!(session_rows[0].token, bundle.token);
    assert_eq!(session_rows[0].account_id, account.id);
    assert!(session_rows[0].active);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].account_id, account.id);
    assert_eq!(events[0].action, AccessAction::Login);
    assert_eq!(events[0].method, Some(AuthMethod::Code));
    assert!(events[0].success);
    assert_eq!(events[0].ip.as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn should_reject_wrong_digits() {
    let account = guardian_account();
    let sessions = MockSessionRepo::empty();
    let session_rows = sessions.sessions_handle();
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account.clone()]),
        access_codes: MockAccessCodeRepo::new(vec![test_access_code(account.id)]),
        sessions,
        audit,
        session_ttl_days: 7,
    };

    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "111111".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::InvalidOrUsedCode)),
        "expected InvalidOrUsedCode, got {result:?}"
    );
    assert!(session_rows.lock().unwrap().is_empty());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(
        events[0].description.as_deref(),
        Some("unknown or already used code")
    );
}

#[tokio::test]
async fn should_reject_already_used_code() {
    let account = guardian_account();
    let mut code = test_access_code(account.id);
    code.used_at = Some(Utc::now());
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account]),
        access_codes: MockAccessCodeRepo::new(vec![code]),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        session_ttl_days: 7,
    };

    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::InvalidOrUsedCode)),
        "expected InvalidOrUsedCode, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_expired_code_without_consuming_it() {
    let account = guardian_account();
    let mut code = test_access_code(account.id);
    code.expires_at = Utc::now() - Duration::hours(1);
    let access_codes = MockAccessCodeRepo::new(vec![code]);
    let codes = access_codes.codes_handle();
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account]),
        access_codes,
        sessions: MockSessionRepo::empty(),
        audit,
        session_ttl_days: 7,
    };

    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::CodeExpired)),
        "expected CodeExpired, got {result:?}"
    );
    assert!(codes.lock().unwrap()[0].used_at.is_none());
    assert_eq!(
        events.lock().unwrap()[0].description.as_deref(),
        Some("access code expired")
    );
}

#[tokio::test]
async fn should_ask_for_role_when_validating_ambiguous_email() {
    let sessions = MockSessionRepo::empty();
    let session_rows = sessions.sessions_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account(), school_account()]),
        access_codes: MockAccessCodeRepo::new(vec![test_access_code(guardian_account().id)]),
        sessions,
        audit: MockAuditLog::new(),
        session_ttl_days: 7,
    };

    let outcome = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await
        .unwrap();

    match outcome {
        ValidateCodeOutcome::RoleSelectionRequired { roles } => {
            assert_eq!(roles, vec![Role::School, Role::Guardian]);
        }
        other => panic!("expected RoleSelectionRequired, got {other:?}"),
    }
    assert!(session_rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_login_into_the_hinted_profile() {
    let school = school_account();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account(), school.clone()]),
        access_codes: MockAccessCodeRepo::new(vec![test_access_code(school.id)]),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        session_ttl_days: 7,
    };

    let outcome = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: Some(Role::School),
            ip: None,
            user_agent: None,
        })
        .await
        .unwrap();

    match outcome {
        ValidateCodeOutcome::LoggedIn(bundle) => {
            assert_eq!(bundle.identity.account_id, school.id);
            assert_eq!(bundle.identity.role, Role::School);
            assert_eq!(bundle.identity.name, "Escola Vila Nova");
        }
        other => panic!("expected LoggedIn, got {other:?}"),
    }
}

#[tokio::test]
async fn should_treat_unknown_email_role_pair_as_invalid_code() {
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::new(vec![test_access_code(guardian_account().id)]),
        sessions: MockSessionRepo::empty(),
        audit,
        session_ttl_days: 7,
    };

    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: Some(Role::School),
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::InvalidOrUsedCode)),
        "expected InvalidOrUsedCode, got {result:?}"
    );
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_account_deactivated_after_issuance() {
    let mut account = guardian_account();
    account.active = false;
    let access_codes = MockAccessCodeRepo::new(vec![test_access_code(account.id)]);
    let codes = access_codes.codes_handle();
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account]),
        access_codes,
        sessions: MockSessionRepo::empty(),
        audit,
        session_ttl_days: 7,
    };

    // The role was picked before the account was deactivated, so the lookup
    // still finds the row.
    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: Some(Role::Guardian),
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::InactiveAccount)),
        "expected InactiveAccount, got {result:?}"
    );
    assert!(codes.lock().unwrap()[0].used_at.is_none());
    assert_eq!(
        events.lock().unwrap()[0].description.as_deref(),
        Some("account deactivated")
    );
}

#[tokio::test]
async fn should_lose_the_consume_race_cleanly() {
    let account = guardian_account();
    let mut access_codes = MockAccessCodeRepo::new(vec![test_access_code(account.id)]);
    access_codes.consume_fails = true;
    let sessions = MockSessionRepo::empty();
    let session_rows = sessions.sessions_handle();
    let audit = MockAuditLog::new();
    let events = audit.access_handle();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account]),
        access_codes,
        sessions,
        audit,
        session_ttl_days: 7,
    };

    let result = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await;

    assert!(
        matches!(result, Err(AuthError::InvalidOrUsedCode)),
        "expected InvalidOrUsedCode, got {result:?}"
    );
    assert!(session_rows.lock().unwrap().is_empty());
    assert_eq!(
        events.lock().unwrap()[0].description.as_deref(),
        Some("code consumed concurrently")
    );
}

#[tokio::test]
async fn should_log_in_even_when_the_audit_trail_is_down() {
    let account = guardian_account();
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![account.clone()]),
        access_codes: MockAccessCodeRepo::new(vec![test_access_code(account.id)]),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::failing(),
        session_ttl_days: 7,
    };

    let outcome = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "483920".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, ValidateCodeOutcome::LoggedIn(_)));
}

#[cfg(feature = "insecure-dev-login")]
#[tokio::test]
async fn should_accept_the_dev_code_without_a_stored_row() {
    let usecase = ValidateCodeUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account()]),
        access_codes: MockAccessCodeRepo::empty(),
        sessions: MockSessionRepo::empty(),
        audit: MockAuditLog::new(),
        session_ttl_days: 7,
    };

    let outcome = usecase
        .execute(ValidateCodeInput {
            email: "ana@example.com".to_owned(),
            code: "000000".to_owned(),
            role_hint: None,
            ip: None,
            user_agent: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, ValidateCodeOutcome::LoggedIn(_)));
}

// ── RolesByEmailUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_sorted_roles_for_an_email() {
    let usecase = RolesByEmailUseCase {
        accounts: MockAccountRepo::new(vec![guardian_account(), school_account()]),
    };

    let roles = usecase.execute("Ana@Example.com").await.unwrap();

    assert_eq!(roles, vec![Role::School, Role::Guardian]);
}

#[tokio::test]
async fn should_list_nothing_for_an_unknown_email() {
    let usecase = RolesByEmailUseCase {
        accounts: MockAccountRepo::empty(),
    };

    let roles = usecase.execute("nobody@example.com").await.unwrap();

    assert!(roles.is_empty());
}
