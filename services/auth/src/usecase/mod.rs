pub mod access_code;
pub mod passkey;
pub mod session;
