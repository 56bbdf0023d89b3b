use anyhow::{Context, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use shared::types::AuthClaims;

/// Why a presented token was rejected.
///
/// The distinction is internal only — every variant collapses into the same
/// client-facing denial.  It exists so the guard can log something useful
/// and so tests can assert on the exact failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Claims decoded fine but `exp` is in the past.
    Expired,
    /// Signature mismatch, or the header declares an algorithm other than
    /// the expected HMAC one.
    InvalidSignature,
    /// Not a parseable compact token at all (wrong segment count, bad
    /// base64, claims missing fields, ...).
    Malformed,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Expired => "token expired",
            Self::InvalidSignature => "invalid signature",
            Self::Malformed => "malformed token",
        };
        f.write_str(reason)
    }
}

/// Signs and verifies compact session tokens (HS256) with a single
/// process-wide secret.
///
/// The secret is injected here once at construction and nowhere else — the
/// issuer and the guard both go through this codec, so tests can run each
/// with its own key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        // Pinning the algorithm list to HS256 makes jsonwebtoken reject any
        // token whose header declares a different algorithm before the
        // signature is even checked.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Serialize and sign a claim set into a compact token.
    pub fn sign(&self, claims: &AuthClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .context("Failed to sign session token")
    }

    /// Verify a compact token and return its claims.
    ///
    /// Pure function of the token and the current time: the HMAC is
    /// recomputed and compared in constant time, and `exp` is checked with
    /// zero leeway.
    pub fn verify(&self, token: &str) -> std::result::Result<AuthClaims, TokenError> {
        decode::<AuthClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::utils::get_timestamp;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn claims_expiring_at(exp: i64) -> AuthClaims {
        AuthClaims {
            sub: "alice".to_string(),
            role: "admin".to_string(),
            iss: "blog".to_string(),
            exp,
        }
    }

    #[test]
    fn sign_then_verify_roundtrips_claims() {
        let codec = TokenCodec::new(SECRET);
        let claims = claims_expiring_at(get_timestamp() + 300);

        let token = codec.sign(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let back = codec.verify(&token).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn expired_claims_are_rejected_even_with_a_valid_signature() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .sign(&claims_expiring_at(get_timestamp() - 10))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let other = TokenCodec::new("another-secret-another-secret-00");
        let token = other
            .sign(&claims_expiring_at(get_timestamp() + 300))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .sign(&claims_expiring_at(get_timestamp() + 300))
            .unwrap();

        // Swap the claims segment for one from a differently-signed token.
        let forged_source = codec
            .sign(&AuthClaims {
                sub: "mallory".to_string(),
                role: "admin".to_string(),
                iss: "blog".to_string(),
                exp: get_timestamp() + 300,
            })
            .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = forged_source.split('.').nth(1).unwrap();
        parts[1] = forged_claims;
        let forged = parts.join(".");

        assert_eq!(codec.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn declared_algorithm_must_be_hs256() {
        let codec = TokenCodec::new(SECRET);
        let claims = claims_expiring_at(get_timestamp() + 300);

        // Same secret, different HMAC variant in the header.
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_input_is_malformed() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
        assert_eq!(codec.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(
            codec.verify("a.b.c"),
            Err(TokenError::Malformed),
            "undecodable segments should not be a signature error"
        );
    }

    #[test]
    fn claims_missing_a_field_are_malformed() {
        // A token whose payload lacks `role` decodes as far as serde and no
        // further.
        let codec = TokenCodec::new(SECRET);

        #[derive(serde::Serialize)]
        struct Partial {
            sub: String,
            iss: String,
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: "alice".to_string(),
                iss: "blog".to_string(),
                exp: get_timestamp() + 300,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Malformed));
    }
}
