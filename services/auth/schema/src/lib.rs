//! sea-orm entities for the tables owned by the auth service.

pub mod access_codes;
pub mod access_log;
pub mod accounts;
pub mod change_log;
pub mod sessions;
pub mod webauthn_challenges;
pub mod webauthn_credentials;
