use std::sync::Arc;

use sea_orm::Database;
use tracing::info;
use url::Url;
use webauthn_rs::prelude::WebauthnBuilder;

use conecta_auth::config::AuthConfig;
use conecta_auth::infra::mailer::SmtpMailer;
use conecta_auth::router::build_router;
use conecta_auth::state::AppState;
use conecta_core::config::Config;
use conecta_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuthConfig::from_env();
    if config.debug {
        tracing::warn!("debug mode is on; never run production this way");
    }

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let mailer = SmtpMailer::new(&config).expect("invalid SMTP configuration");

    let rp_origin = Url::parse(&config.webauthn_origin).expect("invalid WEBAUTHN_ORIGIN");
    let webauthn = WebauthnBuilder::new(&config.webauthn_rp_id, &rp_origin)
        .expect("invalid WebAuthn configuration")
        .rp_name(&config.webauthn_rp_name)
        .build()
        .expect("failed to build Webauthn");

    let state = AppState {
        db,
        webauthn: Arc::new(webauthn),
        mailer,
        config: Arc::new(config),
    };

    let router = build_router(state.clone());
    let addr = format!("0.0.0.0:{}", state.config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
