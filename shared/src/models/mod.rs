//! Domain models for the Machirepo platform

mod draft;
mod notification;
mod post;
mod tag;
mod user;

pub use draft::*;
pub use notification::*;
pub use post::*;
pub use tag::*;
pub use user::*;

/// Error returned when a stored or submitted choice value is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}
