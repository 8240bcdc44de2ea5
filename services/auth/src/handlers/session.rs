use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use conecta_domain::role::Role;

use crate::cookie::{CONECTA_SESSION, clear_session_cookie};
use crate::error::AuthError;
use crate::extract::{ClientMeta, require_role};
use crate::state::AppState;
use crate::usecase::session::{CurrentIdentityUseCase, LogoutInput, LogoutUseCase};

// ── GET /auth/session?roles={slug,slug} ───────────────────────────────────────

#[derive(Deserialize)]
pub struct SessionQuery {
    /// Comma-separated role slugs the caller must be one of. Absent means
    /// any logged-in role passes.
    pub roles: Option<String>,
}

/// The auth gate. Sibling services and the frontend middleware call this per
/// request; the body is the flat identity they act under.
///
/// An invalid session answers 401 with the cookie cleared so the browser
/// stops replaying it. A valid session in the wrong role answers 403 and
/// keeps the cookie.
pub async fn check_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SessionQuery>,
) -> Result<Response, AuthError> {
    let token = jar
        .get(CONECTA_SESSION)
        .map(|c| c.value().to_owned())
        .ok_or(AuthError::Unauthenticated)?;

    let usecase = CurrentIdentityUseCase {
        sessions: state.session_repo(),
        accounts: state.account_repo(),
    };
    let identity = match usecase.execute(&token).await {
        Ok(identity) => identity,
        Err(AuthError::Unauthenticated) => {
            let jar = clear_session_cookie(jar, state.config.cookie_domain.clone());
            return Ok((jar, AuthError::Unauthenticated).into_response());
        }
        Err(e) => return Err(e),
    };

    if let Some(raw) = query.roles.as_deref() {
        let allowed: Vec<Role> = raw.split(',').filter_map(Role::from_slug).collect();
        require_role(&identity, &allowed)?;
    }

    Ok(Json(identity).into_response())
}

// ── POST /auth/logout ─────────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    meta: ClientMeta,
) -> Result<Response, AuthError> {
    let token = jar.get(CONECTA_SESSION).map(|c| c.value().to_owned());

    if let Some(token) = token {
        let usecase = LogoutUseCase {
            sessions: state.session_repo(),
            audit: state.audit_repo(),
        };
        usecase
            .execute(LogoutInput {
                token,
                ip: meta.ip,
                user_agent: meta.user_agent,
            })
            .await?;
    }

    let jar = clear_session_cookie(jar, state.config.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar).into_response())
}
