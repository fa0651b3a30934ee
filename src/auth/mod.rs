//! Credential and session-token lifecycle: password hashing, dual-class
//! token minting and verification, the session rotation state machine,
//! Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

pub mod assets;
pub mod config;
pub mod error;
pub mod guards;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod sessions;
pub mod store;
pub mod tokens;

pub use assets::AssetStore;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::AuthUser;
pub use passwords::PasswordService;
pub use sessions::SessionService;
pub use store::AccountStore;
pub use tokens::TokenService;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: SessionService,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        accounts: Arc<dyn AccountStore>,
        assets: Arc<dyn AssetStore>,
    ) -> AuthResult<Self> {
        let passwords = Arc::new(PasswordService::new()?);
        let tokens = Arc::new(TokenService::from_config(&config));
        let sessions = SessionService::new(accounts.clone(), assets, passwords, tokens.clone());

        Ok(Self {
            config,
            tokens,
            accounts,
            sessions,
        })
    }
}
