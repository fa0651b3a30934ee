//! Session rotation state machine.
//!
//! Per account the state is encoded entirely in the stored refresh-token
//! column: `NULL` means no session, a value means exactly one active refresh
//! token. Login and refresh overwrite the column (implicitly revoking any
//! prior token), logout clears it. No in-process locking: the store's atomic
//! single-row update is the serialization point, and a caller that loses a
//! race simply fails the match check on its next refresh.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::assets::AssetStore;
use crate::auth::passwords::PasswordService;
use crate::auth::responses::AccountView;
use crate::auth::store::{AccountStore, NewAccount};
use crate::auth::tokens::{SignedToken, TokenKind, TokenService};
use crate::auth::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub avatar_path: String,
    pub cover_image_path: Option<String>,
}

/// Tokens plus account view handed back by a successful login.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub access: SignedToken,
    pub refresh: SignedToken,
    pub account: AccountView,
}

/// New token pair handed back by a successful rotation.
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountStore>,
    assets: Arc<dyn AssetStore>,
    passwords: Arc<PasswordService>,
    tokens: Arc<TokenService>,
}

impl SessionService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        assets: Arc<dyn AssetStore>,
        passwords: Arc<PasswordService>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            accounts,
            assets,
            passwords,
            tokens,
        }
    }

    /// Create an account. The new account starts with no session; the caller
    /// gets the stripped view only, never tokens or the stored hash.
    pub async fn register(&self, input: Registration) -> AuthResult<AccountView> {
        let full_name = input.full_name.trim();
        let username = input.username.trim().to_lowercase();
        let email = input.email.trim().to_lowercase();
        let password = input.password.trim();

        if full_name.is_empty() || username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("all fields are required".into()));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidInput("email must contain '@'".into()));
        }

        if self
            .accounts
            .find_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict(
                "account with this username or email already exists".into(),
            ));
        }

        let avatar_path = input.avatar_path.trim();
        if avatar_path.is_empty() {
            return Err(AuthError::InvalidInput("avatar is required".into()));
        }

        let avatar = self
            .assets
            .upload(avatar_path)
            .await?
            .ok_or_else(|| AuthError::InvalidInput("avatar is required".into()))?;

        // A failed cover upload is tolerated; the field is optional.
        let cover_image = match input.cover_image_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => self.assets.upload(path).await?,
            _ => None,
        };

        let password_hash = self.passwords.hash_password(password)?;

        let account = self
            .accounts
            .create(NewAccount {
                username,
                email,
                full_name: full_name.to_string(),
                avatar_url: avatar.url,
                cover_image_url: cover_image.map(|asset| asset.url),
                password_hash,
            })
            .await?;

        log::info!("account registered: {}", account.id);

        Ok(AccountView::from(&account))
    }

    /// Verify credentials and establish a session. Tokens are issued before
    /// the store write, so a signing failure never mutates state; the write
    /// itself overwrites any previously stored refresh token.
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> AuthResult<EstablishedSession> {
        let username = username.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty());
        let email = email.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty());
        let password = password.trim();

        let (username_key, email_key) = match (&username, &email) {
            (Some(u), Some(e)) => (u.clone(), e.clone()),
            // Single identifier: match it against both columns.
            (Some(u), None) => (u.clone(), u.clone()),
            (None, Some(e)) => (e.clone(), e.clone()),
            (None, None) => {
                return Err(AuthError::InvalidInput(
                    "username or email is required".into(),
                ));
            }
        };
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required".into()));
        }

        let account = self
            .accounts
            .find_by_username_or_email(&username_key, &email_key)
            .await?
            .ok_or_else(|| AuthError::NotFound("account not found".into()))?;

        if !self
            .passwords
            .verify_password(password, &account.password_hash)?
        {
            return Err(AuthError::Unauthorized);
        }

        let access = self.tokens.issue(TokenKind::Access, account.id)?;
        let refresh = self.tokens.issue(TokenKind::Refresh, account.id)?;

        let account = self
            .accounts
            .update_refresh_token(account.id, Some(&refresh.token))
            .await?;

        log::info!("session established for account {}", account.id);

        Ok(EstablishedSession {
            access,
            refresh,
            account: AccountView::from(&account),
        })
    }

    /// Rotate a refresh token. Every failure is the blanket `Unauthorized`:
    /// a missing token, a bad signature, an expired token, an unknown
    /// account, and a superseded token are indistinguishable to the caller.
    pub async fn refresh(&self, presented: Option<&str>) -> AuthResult<RotatedSession> {
        let presented = presented.filter(|t| !t.is_empty()).ok_or(AuthError::Unauthorized)?;

        let verified = self
            .tokens
            .verify(presented, TokenKind::Refresh)
            .map_err(AuthError::into_unauthorized)?;

        let account = self
            .accounts
            .find_by_id(verified.account_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        // The presented token must exactly match the single stored value;
        // anything else is a superseded token (prior rotation or logout).
        let stored = account.refresh_token.as_deref().ok_or(AuthError::Unauthorized)?;
        if !constant_time_eq(stored.as_bytes(), presented.as_bytes()) {
            log::warn!("superseded refresh token presented for account {}", account.id);
            return Err(AuthError::Unauthorized);
        }

        let access = self.tokens.issue(TokenKind::Access, account.id)?;
        let refresh = self.tokens.issue(TokenKind::Refresh, account.id)?;

        self.accounts
            .update_refresh_token(account.id, Some(&refresh.token))
            .await?;

        Ok(RotatedSession { access, refresh })
    }

    /// Clear the stored refresh token. Idempotent: repeated calls and calls
    /// for accounts that no longer exist are no-ops.
    pub async fn logout(&self, account_id: Uuid) -> AuthResult<()> {
        match self.accounts.update_refresh_token(account_id, None).await {
            Ok(_) => {
                log::info!("session cleared for account {}", account_id);
                Ok(())
            }
            Err(AuthError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Re-hash and persist a new password after verifying the current one.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current: &str,
        new: &str,
    ) -> AuthResult<()> {
        if new.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "new password must not be empty".into(),
            ));
        }

        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("account not found".into()))?;

        if !self
            .passwords
            .verify_password(current.trim(), &account.password_hash)?
        {
            return Err(AuthError::Unauthorized);
        }

        let password_hash = self.passwords.hash_password(new.trim())?;
        self.accounts
            .update_password_hash(account_id, &password_hash)
            .await?;

        Ok(())
    }
}

/// Constant-time comparison to avoid timing side-channels when matching the
/// presented refresh token against the stored one.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
