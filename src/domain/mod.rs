//! Domain model: the secret entity, its identifier and state.

pub mod id;
pub mod secret;

pub use id::SecretId;
pub use secret::{Secret, SecretContent, SecretState, SecretStateParseError};
