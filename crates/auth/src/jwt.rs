//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed or badly signed token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a raw bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError>;
}

/// HMAC-SHA256 token validator.
///
/// Expiry is checked against the RFC 3339 `issued_at`/`expires_at` claims by
/// [`validate_claims`], so the numeric `exp` claim is not required.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            decoding: DecodingKey::from_secret(&secret),
            encoding: EncodingKey::from_secret(&secret),
            validation,
        }
    }

    /// Sign claims with the same secret (dev tooling and tests).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                AuthError::InvalidToken(e.to_string())
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ledger_core::UserId;

    #[test]
    fn issued_token_round_trips_through_validation() {
        let validator = Hs256JwtValidator::new(b"secret".to_vec());
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(9), now, Duration::minutes(5));

        let token = validator.issue(&claims).unwrap();
        let decoded = validator.validate(&token, now).unwrap();
        assert_eq!(decoded.sub, UserId::new(9));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = Hs256JwtValidator::new(b"one".to_vec());
        let verifier = Hs256JwtValidator::new(b"two".to_vec());
        let now = Utc::now();
        let token = issuer
            .issue(&JwtClaims::new(UserId::new(1), now, Duration::minutes(5)))
            .unwrap();

        assert!(matches!(
            verifier.validate(&token, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let validator = Hs256JwtValidator::new(b"secret".to_vec());
        let now = Utc::now();
        let token = validator
            .issue(&JwtClaims::new(UserId::new(1), now, Duration::minutes(5)))
            .unwrap();

        assert_eq!(
            validator.validate(&token, now + Duration::minutes(6)),
            Err(AuthError::Claims(TokenValidationError::Expired))
        );
    }
}
