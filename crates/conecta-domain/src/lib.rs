//! Domain types shared across the Conecta Uniforme services.
//!
//! This crate contains only pure types and functions with no framework
//! dependencies. Import in `usecase/` and `domain/` layers; never in
//! `infra/` or `handlers/`.

pub mod email;
pub mod identity;
pub mod role;
