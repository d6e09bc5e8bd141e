//! `ledger-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it turns a
//! bearer token into a trusted [`Principal`] and decides whether that principal
//! may touch a resolved resource.

pub mod authorize;
pub mod claims;
pub mod jwt;

pub use authorize::{authorize_owner, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
