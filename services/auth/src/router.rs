use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use conecta_core::health::{healthz, readyz};
use conecta_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    access_code::{list_roles, request_code, validate_code},
    passkeys::{
        finish_login, finish_registration, has_credential, list_passkeys, login_options,
        registration_options, revoke_passkey,
    },
    session::{check_session, logout},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Access codes
        .route("/auth/request-code", post(request_code))
        .route("/auth/validate-code", post(validate_code))
        .route("/auth/roles", get(list_roles))
        // Session
        .route("/auth/session", get(check_session))
        .route("/auth/logout", post(logout))
        // Passkey management
        .route("/auth/passkeys", get(list_passkeys))
        .route("/auth/webauthn/revoke", post(revoke_passkey))
        .route("/auth/webauthn/has-credential", get(has_credential))
        // WebAuthn registration
        .route("/auth/webauthn/register/options", get(registration_options))
        .route("/auth/webauthn/register", post(finish_registration))
        // WebAuthn authentication
        .route("/auth/webauthn/login/options", get(login_options))
        .route("/auth/webauthn/login", post(finish_login))
        // Order matters: the id is set before tracing so spans carry it.
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
