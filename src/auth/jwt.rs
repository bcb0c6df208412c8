use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError};

/// Audience the provider stamps on user access tokens.
pub const AUTHENTICATED: &str = "authenticated";

// Must match the issuer's signing algorithm.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub audience: Option<String>,
    pub leeway: u64,
    pub access_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            audience: cfg.audience.clone(),
            leeway: cfg.leeway_seconds,
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        }
    }

    /// Issue an access token the way the identity provider does. Only the
    /// in-memory provider signs; the hosted one issues its own.
    pub fn sign_access(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            email: Some(email.to_string()),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            aud: Some(Value::String(AUTHENTICATED.into())),
            role: Some(AUTHENTICATED.into()),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = self.leeway;
        match &self.audience {
            Some(aud) => validation.set_audience(std::slice::from_ref(aud)),
            None => validation.validate_aud = false,
        }
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Token Validator: a verified token yields its email claim, anything
    /// else is `Unauthenticated`.
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        let claims = match self.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return Err(AppError::unauthenticated("Could not validate credentials"));
            }
        };

        match claims.email {
            Some(email) if !email.trim().is_empty() => Ok(email.trim().to_lowercase()),
            _ => {
                warn!(sub = %claims.sub, "token has no email claim");
                Err(AppError::unauthenticated("Could not validate credentials"))
            }
        }
    }
}
