use bcrypt::{hash, verify, BcryptError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[cfg(not(test))]
const BCRYPT_COST: u32 = 10;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    hash(plain, BCRYPT_COST)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    verify(plain, hashed).unwrap_or(false)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    Access,
    Reset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Reset => "reset",
        }
    }

    fn lifetime(self, config: &AppConfig) -> Duration {
        match self {
            Self::Access => Duration::minutes(config.access_token_minutes),
            Self::Reset => Duration::minutes(config.reset_token_minutes),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    purpose: String,
    exp: usize,
}

pub fn issue_token(
    config: &AppConfig,
    user_id: i32,
    purpose: TokenPurpose,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + purpose.lifetime(config)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        purpose: purpose.as_str().to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Resolves a token to its user id. Expired tokens, bad signatures and tokens
/// issued for another purpose all yield `None`.
pub fn decode_token(config: &AppConfig, token: &str, purpose: TokenPurpose) -> Option<i32> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    if claims.purpose != purpose.as_str() {
        return None;
    }
    claims.sub.parse::<i32>().ok()
}
