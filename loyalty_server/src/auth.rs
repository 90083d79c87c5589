//! Password hashing and access tokens.
//!
//! Passwords never hit the database in the clear: they are stored as base64-encoded HMAC-SHA256 digests keyed with
//! the server's password key. Successful registration and login return an HS256 JWT in the `Authorization` response
//! header. Clients send it back as `Authorization: Bearer <token>`, and handlers that take a [`JwtClaims`] argument
//! only run for requests carrying a valid, unexpired token.
use std::time::Duration;

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::{ready, Ready};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use loyalty_common::Secret;
use loyalty_engine::db_types::UserAccount;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: i64,
    pub login: String,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> i64 {
        self.sub
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req.app_data::<web::Data<TokenIssuer>>().ok_or_else(|| {
        error!("🔐️ No token issuer is registered with the app. Authenticated routes cannot work.");
        ServerError::ConfigurationError("No token issuer has been configured".to_string())
    })?;
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))?;
    let claims = issuer.validate_token(token.trim())?;
    trace!("🔐️ Request authenticated for user #{} ({})", claims.sub, claims.login);
    Ok(claims)
}

/// The value of the `Authorization` header for the given token.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}

//--------------------------------------     TokenIssuer       ---------------------------------------------------------
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    duration: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            duration: config.token_duration,
        }
    }

    /// Issue a new access token for the given user.
    /// This method DOES NOT check the user's credentials. This must be done prior to calling `issue_token`.
    pub fn issue_token(&self, user: &UserAccount) -> Result<String, ServerError> {
        let iat = Utc::now().timestamp();
        let lifetime = i64::try_from(self.duration.as_secs()).unwrap_or(i64::MAX);
        let claims = JwtClaims { sub: user.id, login: user.login.clone(), iat, exp: iat.saturating_add(lifetime) };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServerError::CouldNotSerializeAccessToken(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("🔐️ Rejected access token. {e}");
            match e.kind() {
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthError::PoorlyFormattedToken(e.to_string())
                },
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        Ok(data.claims)
    }
}

//--------------------------------------    PasswordHasher     ---------------------------------------------------------
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    key: Secret<String>,
}

impl PasswordHasher {
    pub fn new(key: Secret<String>) -> Self {
        Self { key }
    }

    pub fn hash(&self, password: &str) -> Result<String, ServerError> {
        let mut mac = HmacSha256::new_from_slice(self.key.reveal().as_bytes())
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid password key. {e}")))?;
        mac.update(password.as_bytes());
        Ok(base64::encode(mac.finalize().into_bytes()))
    }
}
