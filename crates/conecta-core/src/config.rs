/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize` (field names map to
/// SCREAMING_SNAKE env var names, `#[serde(default = "...")]` supplies
/// optional-with-default fields) and call `Config::from_env()` once at
/// startup.
///
/// # Panics
///
/// Panics if any required env var is missing or cannot be deserialized.
/// Misconfiguration is a startup failure, never a per-request one.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Self {
        envy::from_env().expect("failed to load config from environment")
    }
}
