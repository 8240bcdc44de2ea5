pub mod profile;
pub mod repository;
pub mod types;
