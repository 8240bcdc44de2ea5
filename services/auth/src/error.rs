use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// Outcomes that belong to a successful flow (role disambiguation when one
/// email holds several accounts) are not errors; those live in the usecase
/// result enums.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no account matches that email")]
    UnknownEmail,
    #[error("access code is invalid or already used")]
    InvalidOrUsedCode,
    #[error("access code has expired")]
    CodeExpired,
    #[error("account is deactivated")]
    InactiveAccount,
    #[error("could not deliver the access code email")]
    DeliveryFailed,
    #[error("missing or invalid session")]
    Unauthenticated,
    #[error("session role is not allowed here")]
    RoleMismatch,
    #[error("no pending ceremony for this request")]
    ChallengeExpiredOrMissing,
    #[error("credential verification failed")]
    VerificationFailed { detail: Option<String> },
    #[error("credential is not registered")]
    UnknownCredential,
    #[error("service temporarily unavailable")]
    Unavailable(#[from] anyhow::Error),
}

impl AuthError {
    /// Verification failure whose diagnostic detail is carried only when
    /// `debug` is on. Production responses stay opaque.
    pub fn verification(debug: bool, detail: impl ToString) -> Self {
        Self::VerificationFailed {
            detail: debug.then(|| detail.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownEmail => "UNKNOWN_EMAIL",
            Self::InvalidOrUsedCode => "INVALID_OR_USED_CODE",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::InactiveAccount => "INACTIVE_ACCOUNT",
            Self::DeliveryFailed => "DELIVERY_FAILED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::RoleMismatch => "ROLE_MISMATCH",
            Self::ChallengeExpiredOrMissing => "CHALLENGE_EXPIRED",
            Self::VerificationFailed { .. } => "VERIFICATION_FAILED",
            Self::UnknownCredential => "UNKNOWN_CREDENTIAL",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownEmail | Self::UnknownCredential => StatusCode::NOT_FOUND,
            Self::InvalidOrUsedCode | Self::CodeExpired | Self::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::InactiveAccount | Self::RoleMismatch => StatusCode::FORBIDDEN,
            Self::ChallengeExpiredOrMissing | Self::VerificationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::DeliveryFailed => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        // Log 503s only — tower-http TraceLayer already records method/uri/status for all
        // requests. The rest are expected client errors; logging them here would be noise.
        // Unavailable carries the anyhow chain so the root cause is traceable.
        if let Self::Unavailable(ref e) = self {
            tracing::error!(error = %e, kind = "SERVICE_UNAVAILABLE", "service unavailable");
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        // The detail field is only ever populated when DEBUG is on.
        if let Self::VerificationFailed {
            detail: Some(ref detail),
        } = self
        {
            body["detail"] = serde_json::Value::String(detail.clone());
        }
        (status, axum::Json(body)).into_response()
    }
}
