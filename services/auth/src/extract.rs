//! Request extractors for the authenticated endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;

use conecta_domain::identity::Identity;
use conecta_domain::role::Role;

use crate::cookie::CONECTA_SESSION;
use crate::error::AuthError;
use crate::state::AppState;
use crate::usecase::session::CurrentIdentityUseCase;

/// Role-membership gate for handlers that are not open to every role.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), AuthError> {
    if identity.has_role(allowed) {
        Ok(())
    } else {
        Err(AuthError::RoleMismatch)
    }
}

/// The logged-in caller, resolved from the session cookie.
///
/// Rejects with 401 when the cookie is absent or the session is expired,
/// revoked, or attached to a deactivated account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    // axum-core 0.5 wants `fn -> impl Future + Send` here; an `async fn`
    // trips E0195 under precise capturing. Capture synchronously, return a
    // 'static block.
    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = CookieJar::from_headers(&parts.headers)
            .get(CONECTA_SESSION)
            .map(|c| c.value().to_owned());
        let state = state.clone();

        async move {
            let token = token.ok_or(AuthError::Unauthenticated)?;
            let usecase = CurrentIdentityUseCase {
                sessions: state.session_repo(),
                accounts: state.account_repo(),
            };
            let identity = usecase.execute(&token).await?;
            Ok(Self(identity))
        }
    }
}

/// Client network metadata recorded in the access log.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let meta = Self {
            ip: client_ip(&parts.headers),
            user_agent: header_str(&parts.headers, "user-agent"),
        };
        async move { Ok(meta) }
    }
}

/// First hop of `x-forwarded-for` is the original client when the service
/// sits behind the reverse proxy; `x-real-ip` is the fallback.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_owned());
            }
        }
    }
    header_str(headers, "x-real-ip")
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_owned())
}
