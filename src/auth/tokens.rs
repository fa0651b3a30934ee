use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthError, AuthResult};

/// The two token classes. Each is signed with its own secret and carries its
/// own expiry window, so an access token can never be replayed as a refresh
/// token or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issuance. Timestamps have one-second granularity, so
    /// without this two tokens minted in the same second would be
    /// byte-identical and rotation could overwrite a token with itself.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub account_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

struct TokenClass {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

/// Stateless issuance and verification of access and refresh tokens.
/// Verification is pure: signature plus expiry, no storage lookups. The
/// refresh token's revocability comes from the session layer cross-checking
/// the stored value, not from anything in here.
pub struct TokenService {
    access: TokenClass,
    refresh: TokenClass,
    validation: Validation,
}

impl TokenService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let access = TokenClass {
            encoding_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            ttl: Duration::seconds(config.access_token_ttl_secs),
        };
        let refresh = TokenClass {
            encoding_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            ttl: Duration::seconds(config.refresh_token_ttl_secs),
        };

        // Expiry is checked by hand below: a token presented exactly at its
        // `exp` must already count as expired, with zero clock leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            access,
            refresh,
            validation,
        }
    }

    fn class(&self, kind: TokenKind) -> &TokenClass {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue(&self, kind: TokenKind, account_id: Uuid) -> AuthResult<SignedToken> {
        let class = self.class(kind);
        let now = Utc::now();
        let expires_at = now + class.ttl;

        let claims = TokenClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &class.encoding_key)?;

        Ok(SignedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> AuthResult<VerifiedToken> {
        self.verify_at(token, kind, Utc::now())
    }

    fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> AuthResult<VerifiedToken> {
        let class = self.class(kind);
        let data = decode::<TokenClaims>(token, &class.decoding_key, &self.validation)
            .map_err(|_| AuthError::TokenInvalid)?;

        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::TokenExpired);
        }

        let account_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AuthError::TokenInvalid)?;

        Ok(VerifiedToken {
            account_id,
            expires_at: DateTime::from_timestamp(data.claims.exp, 0)
                .ok_or(AuthError::TokenInvalid)?,
        })
    }
}
