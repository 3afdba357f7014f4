use core::time::Duration;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use miniblog_core::{Error, Result, TokenValidator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    nbf: u64,
    exp: u64,
}

/// HS256 bearer tokens signed with a shared secret.
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "nbf"]);
        validation.validate_nbf = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mints a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> jsonwebtoken::errors::Result<String> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl.as_secs()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }
}

impl TokenValidator for JwtValidator {
    fn validate(&self, token: &str) -> Result<String> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Ok(data.claims.sub),
            Ok(_) => Err(Error::TokenInvalid),
            Err(err) => {
                tracing::debug!(error = %err, "rejected bearer token");
                Err(Error::TokenInvalid)
            }
        }
    }
}
