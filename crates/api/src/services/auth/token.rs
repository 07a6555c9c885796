//! Signed session tokens.
//!
//! Shoppers carry a `token` cookie whose claims name their user id; the
//! seller carries a `sellerToken` cookie whose claims name the seller email.
//! Both are HS256 JWTs signed with the shared `JWT_SECRET`.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use greenbasket_core::{Email, UserId};

use super::TokenError;

/// How long an issued token stays valid.
pub const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Claims carried by a shopper token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a seller token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl TokenService {
    /// Create a token service from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation: Validation::new(Algorithm::HS256),
            validity: Duration::days(TOKEN_VALIDITY_DAYS),
        }
    }

    /// Token lifetime, used for the cookie `Max-Age`.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a shopper token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue_user(&self, id: UserId) -> Result<String, TokenError> {
        let (iat, exp) = self.window();
        self.encode(&UserClaims { id, iat, exp })
    }

    /// Verify a shopper token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` with the verifier message if the token is
    /// malformed, badly signed, or expired.
    pub fn verify_user(&self, token: &str) -> Result<UserClaims, TokenError> {
        self.decode(token)
    }

    /// Issue a seller token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue_seller(&self, email: &Email) -> Result<String, TokenError> {
        let (iat, exp) = self.window();
        self.encode(&SellerClaims {
            email: email.as_str().to_string(),
            iat,
            exp,
        })
    }

    /// Verify a seller token. The email claim is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if the token does not verify.
    pub fn verify_seller(&self, token: &str) -> Result<SellerClaims, TokenError> {
        self.decode(token)
    }

    fn window(&self) -> (i64, i64) {
        let now = Utc::now();
        (now.timestamp(), (now + self.validity).timestamp())
    }

    fn encode<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(TokenError::Encode)
    }

    fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        jsonwebtoken::decode::<C>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
