//! Credentials, unverified claims, and identity resolution.

pub mod credential;
pub mod identity;
pub mod resolver;
pub mod token_codec;

pub use credential::Credential;
pub use identity::Identity;
pub use resolver::{
    resolve, resolve_from_credential, LoginResponse, ResolutionFailure, ResolutionSource,
};
pub use token_codec::{decode, DecodeError, UnverifiedClaims};
