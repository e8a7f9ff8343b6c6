//! Shared types and models for the Machirepo problem-report platform
//!
//! This crate contains types shared between the backend, the browser
//! frontend (via WASM), and the admin tooling.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
