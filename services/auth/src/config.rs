use serde::Deserialize;

use conecta_core::config::Config;

/// Auth service configuration, loaded from environment variables by field
/// name (`DATABASE_URL`, `SMTP_HOST`, ...).
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on.
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,

    /// WebAuthn relying-party ID (e.g. "conectauniforme.com.br").
    pub webauthn_rp_id: String,
    /// Human-readable relying-party name shown by authenticator prompts.
    #[serde(default = "default_rp_name")]
    pub webauthn_rp_name: String,
    /// WebAuthn relying-party origin URL (e.g. "https://conectauniforme.com.br").
    pub webauthn_origin: String,

    /// Cookie domain attribute (root domain, so the session spans subdomains).
    pub cookie_domain: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,

    #[serde(default = "default_access_code_length")]
    pub access_code_length: usize,
    #[serde(default = "default_access_code_ttl_hours")]
    pub access_code_ttl_hours: i64,

    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Sender address for access code emails.
    pub smtp_from: String,
    #[serde(default = "default_smtp_from_name")]
    pub smtp_from_name: String,
    #[serde(default = "default_smtp_timeout_secs")]
    pub smtp_timeout_secs: u64,
    #[serde(default = "default_smtp_max_attempts")]
    pub smtp_max_attempts: u32,

    /// Debug mode. Failure responses carry verification detail, issued codes
    /// are echoed to the log, and a failed email send no longer aborts the
    /// code request. Never set in production.
    #[serde(default)]
    pub debug: bool,
}

impl Config for AuthConfig {}

fn default_auth_port() -> u16 {
    8080
}

fn default_rp_name() -> String {
    "Conecta Uniforme".to_owned()
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_access_code_length() -> usize {
    6
}

fn default_access_code_ttl_hours() -> i64 {
    24
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from_name() -> String {
    "Conecta Uniforme".to_owned()
}

fn default_smtp_timeout_secs() -> u64 {
    10
}

fn default_smtp_max_attempts() -> u32 {
    3
}
