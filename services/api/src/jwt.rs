//! RS256 access tokens
//!
//! A token names the user and the role they logged in as. It is only a
//! starting point: the middleware still loads the account on every request,
//! so deactivation takes effect before the token runs out.

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

use crate::models::{Role, User};

const DEFAULT_TOKEN_LIFETIME: u64 = 24 * 60 * 60;

/// Signing material and token lifetime
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// PEM-encoded RSA public key
    pub public_key: String,
    /// Seconds a token stays valid
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Read `JWT_PRIVATE_KEY`, `JWT_PUBLIC_KEY` (PEM text or a path to a PEM
    /// file) and `JWT_ACCESS_TOKEN_EXPIRY` (seconds, default one day)
    pub fn from_env() -> Result<Self> {
        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        Ok(Self {
            private_key: pem_from_env("JWT_PRIVATE_KEY")?,
            public_key: pem_from_env("JWT_PUBLIC_KEY")?,
            access_token_expiry,
        })
    }
}

/// Relative paths are tried from the working directory, then the crate root
fn pem_from_env(var: &str) -> Result<String> {
    let value = std::env::var(var).with_context(|| format!("{var} is not set"))?;
    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    let in_crate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(&value);
    let pem = std::fs::read_to_string(&value)
        .or_else(|_| std::fs::read_to_string(&in_crate))
        .with_context(|| format!("{var} points to an unreadable file {value}"))?;

    Ok(pem.trim().to_string())
}

/// Token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and checks access tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: u64,
}

impl JwtService {
    /// Fails when either key is not valid RSA PEM
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .context("invalid JWT private key")?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())
            .context("invalid JWT public key")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            lifetime: config.access_token_expiry,
        })
    }

    /// Sign a token for the user's current role
    pub fn issue(&self, user: &User) -> Result<String> {
        let iat = now_secs()?;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat,
            exp: iat + self.lifetime,
        };

        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Signature and expiry check
    pub fn verify(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    /// Seconds an issued token stays valid
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }
}

pub fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserDetails;
    use chrono::Utc;

    const PRIVATE_KEY: &str = include_str!("../tests/keys/private.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/keys/public.pem");

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            private_key: PRIVATE_KEY.to_string(),
            public_key: PUBLIC_KEY.to_string(),
            access_token_expiry: 3600,
        })
        .unwrap()
    }

    fn agent() -> User {
        User {
            id: Uuid::new_v4(),
            email: "agent@sponsorhub.test".to_string(),
            password_hash: String::new(),
            name: "Platform Agent".to_string(),
            phone: "9999999999".to_string(),
            role: Role::Agent,
            is_active: true,
            details: UserDetails::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_names_user_and_role() {
        let service = service();
        let user = agent();

        let claims = service.verify(&service.issue(&user).unwrap()).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.exp - claims.iat, service.lifetime());
    }

    #[test]
    fn forged_signature_is_rejected() {
        let service = service();
        let token = service.issue(&agent()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        parts[2] = "c2lnbmF0dXJl";
        assert!(service.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Sponsor,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap(),
        )
        .unwrap();

        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn invalid_pem_fails_fast() {
        let config = JwtConfig {
            private_key: "not a key".to_string(),
            public_key: PUBLIC_KEY.to_string(),
            access_token_expiry: 60,
        };
        assert!(JwtService::new(config).is_err());
    }
}
