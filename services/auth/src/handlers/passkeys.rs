use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use webauthn_rs::prelude::CreationChallengeResponse;

use conecta_core::serde::{to_rfc3339_ms, to_rfc3339_ms_opt};
use conecta_domain::role::Role;

use crate::cookie::set_session_cookie;
use crate::error::AuthError;
use crate::extract::{ClientMeta, CurrentUser};
use crate::handlers::{LoggedInResponse, select_role_response};
use crate::state::AppState;
use crate::usecase::passkey::{
    FinishLoginInput, FinishLoginUseCase, FinishRegistrationUseCase, HasCredentialUseCase,
    ListCredentialsUseCase, PasskeyLoginOutcome, RevokeCredentialUseCase, StartLoginUseCase,
    StartRegistrationUseCase,
};
use crate::wire::{parse_assertion, parse_attestation};

/// Response header carrying the ceremony id the finish call must echo back.
const X_PASSKEY_CEREMONY: &str = "x-conecta-passkey-ceremony";

// ── GET /auth/passkeys ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PasskeyResponse {
    pub credential_id: String,
    pub aaguid: Uuid,
    pub transports: Vec<String>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub last_used_at: Option<DateTime<Utc>>,
}

pub async fn list_passkeys(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<PasskeyResponse>>, AuthError> {
    let usecase = ListCredentialsUseCase {
        credentials: state.credential_repo(),
    };
    let list = usecase.execute(&identity.email).await?;
    let body: Vec<PasskeyResponse> = list
        .into_iter()
        .map(|summary| PasskeyResponse {
            credential_id: summary.credential_id,
            aaguid: summary.aaguid,
            transports: summary.transports,
            created_at: summary.created_at,
            last_used_at: summary.last_used_at,
        })
        .collect();
    Ok(Json(body))
}

// ── POST /auth/webauthn/revoke ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RevokePasskeyRequest {
    pub credential_id: String,
}

pub async fn revoke_passkey(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(body): Json<RevokePasskeyRequest>,
) -> Result<StatusCode, AuthError> {
    let usecase = RevokeCredentialUseCase {
        credentials: state.credential_repo(),
        audit: state.audit_repo(),
    };
    usecase.execute(&identity, &body.credential_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /auth/webauthn/has-credential?email={email} ───────────────────────────

#[derive(Deserialize)]
pub struct HasCredentialQuery {
    pub email: String,
}

/// The login page uses this to decide whether to offer the passkey button
/// before the user types anything else.
pub async fn has_credential(
    State(state): State<AppState>,
    Query(query): Query<HasCredentialQuery>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let usecase = HasCredentialUseCase {
        credentials: state.credential_repo(),
    };
    let has = usecase.execute(&query.email).await?;
    Ok(Json(json!({ "has_credential": has })))
}

// ── GET /auth/webauthn/register/options ───────────────────────────────────────

pub async fn registration_options(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<CreationChallengeResponse>, AuthError> {
    let usecase = StartRegistrationUseCase {
        credentials: state.credential_repo(),
        challenges: state.challenge_repo(),
        webauthn: state.webauthn.clone(),
    };
    let challenge = usecase.execute(&identity).await?;
    Ok(Json(challenge))
}

// ── POST /auth/webauthn/register ──────────────────────────────────────────────

pub async fn finish_registration(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<serde_json::Value>,
) -> Result<StatusCode, AuthError> {
    let credential = parse_attestation(payload)
        .map_err(|e| AuthError::verification(state.config.debug, e))?;

    let usecase = FinishRegistrationUseCase {
        credentials: state.credential_repo(),
        challenges: state.challenge_repo(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
        debug: state.config.debug,
    };
    usecase.execute(&identity, credential).await?;
    Ok(StatusCode::CREATED)
}

// ── GET /auth/webauthn/login/options?email={email} ────────────────────────────

#[derive(Deserialize)]
pub struct LoginOptionsQuery {
    /// Without an email the ceremony is discoverable: any resident key for
    /// this relying party may answer.
    pub email: Option<String>,
}

pub async fn login_options(
    State(state): State<AppState>,
    Query(query): Query<LoginOptionsQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let usecase = StartLoginUseCase {
        credentials: state.credential_repo(),
        challenges: state.challenge_repo(),
        webauthn: state.webauthn.clone(),
    };
    let out = usecase.execute(query.email.as_deref()).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(X_PASSKEY_CEREMONY),
        HeaderValue::from_str(&out.ceremony_id.to_string()).unwrap(),
    );

    Ok((StatusCode::OK, headers, Json(out.challenge)))
}

// ── POST /auth/webauthn/login?ceremony={id}&role={slug} ───────────────────────

#[derive(Deserialize)]
pub struct FinishLoginQuery {
    pub ceremony: Uuid,
    pub role: Option<Role>,
}

pub async fn finish_login(
    State(state): State<AppState>,
    jar: CookieJar,
    meta: ClientMeta,
    Query(query): Query<FinishLoginQuery>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, AuthError> {
    let credential = parse_assertion(payload)
        .map_err(|e| AuthError::verification(state.config.debug, e))?;

    let usecase = FinishLoginUseCase {
        accounts: state.account_repo(),
        credentials: state.credential_repo(),
        challenges: state.challenge_repo(),
        sessions: state.session_repo(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
        session_ttl_days: state.config.session_ttl_days,
        debug: state.config.debug,
    };
    let outcome = usecase
        .execute(FinishLoginInput {
            ceremony_id: query.ceremony,
            role_hint: query.role,
            credential,
            ip: meta.ip,
            user_agent: meta.user_agent,
        })
        .await?;

    Ok(match outcome {
        PasskeyLoginOutcome::LoggedIn(bundle) => {
            let jar = set_session_cookie(
                jar,
                bundle.token.clone(),
                state.config.cookie_domain.clone(),
                state.config.session_ttl_days * 86_400,
            );
            (StatusCode::CREATED, jar, Json(LoggedInResponse::from(bundle))).into_response()
        }
        PasskeyLoginOutcome::RoleSelectionRequired { roles } => {
            select_role_response(roles).into_response()
        }
    })
}
