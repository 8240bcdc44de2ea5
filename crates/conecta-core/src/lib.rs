//! Ambient service plumbing shared by the Conecta Uniforme services:
//! configuration loading, tracing setup, health endpoints, request-id
//! middleware, and serde helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
