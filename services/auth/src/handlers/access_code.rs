use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use conecta_domain::role::Role;

use crate::cookie::set_session_cookie;
use crate::error::AuthError;
use crate::extract::ClientMeta;
use crate::handlers::{LoggedInResponse, role_options, select_role_response};
use crate::state::AppState;
use crate::usecase::access_code::{
    RequestCodeInput, RequestCodeOutcome, RequestCodeUseCase, RolesByEmailUseCase,
    ValidateCodeInput, ValidateCodeOutcome, ValidateCodeUseCase,
};

// ── POST /auth/request-code ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
    /// Picked profile when the email spans several roles.
    pub role: Option<Role>,
}

pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeRequest>,
) -> Result<Response, AuthError> {
    let usecase = RequestCodeUseCase {
        accounts: state.account_repo(),
        access_codes: state.access_code_repo(),
        mailer: state.mailer.clone(),
        code_length: state.config.access_code_length,
        code_ttl_hours: state.config.access_code_ttl_hours,
        debug: state.config.debug,
    };
    let outcome = usecase
        .execute(RequestCodeInput {
            email: body.email,
            role_hint: body.role,
        })
        .await?;

    Ok(match outcome {
        RequestCodeOutcome::CodeSent => Json(json!({ "status": "code_sent" })).into_response(),
        RequestCodeOutcome::RoleSelectionRequired { roles } => {
            select_role_response(roles).into_response()
        }
    })
}

// ── POST /auth/validate-code ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateCodeRequest {
    pub email: String,
    pub code: String,
    pub role: Option<Role>,
}

pub async fn validate_code(
    State(state): State<AppState>,
    jar: CookieJar,
    meta: ClientMeta,
    Json(body): Json<ValidateCodeRequest>,
) -> Result<Response, AuthError> {
    let usecase = ValidateCodeUseCase {
        accounts: state.account_repo(),
        access_codes: state.access_code_repo(),
        sessions: state.session_repo(),
        audit: state.audit_repo(),
        session_ttl_days: state.config.session_ttl_days,
    };
    let outcome = usecase
        .execute(ValidateCodeInput {
            email: body.email,
            code: body.code,
            role_hint: body.role,
            ip: meta.ip,
            user_agent: meta.user_agent,
        })
        .await?;

    Ok(match outcome {
        ValidateCodeOutcome::LoggedIn(bundle) => {
            let jar = set_session_cookie(
                jar,
                bundle.token.clone(),
                state.config.cookie_domain.clone(),
                state.config.session_ttl_days * 86_400,
            );
            (StatusCode::CREATED, jar, Json(LoggedInResponse::from(bundle))).into_response()
        }
        ValidateCodeOutcome::RoleSelectionRequired { roles } => {
            select_role_response(roles).into_response()
        }
    })
}

// ── GET /auth/roles?email={email} ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RolesQuery {
    pub email: String,
}

/// Lets the login page decide up front whether to show the profile chooser.
/// An unknown email answers with an empty list rather than 404.
pub async fn list_roles(
    State(state): State<AppState>,
    Query(query): Query<RolesQuery>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let usecase = RolesByEmailUseCase {
        accounts: state.account_repo(),
    };
    let roles = usecase.execute(&query.email).await?;
    Ok(Json(json!({ "roles": role_options(roles) })))
}
