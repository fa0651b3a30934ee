use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocket_db_pools::sqlx::{self, FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{AuthError, AuthResult};

/// Persisted account record. Carries the password hash and the currently
/// valid refresh token, so it is never serialized to a client as-is; the
/// projection lives in [`crate::auth::responses::AccountView`].
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create an account. Username and email are expected to
/// be case-normalized and the password already hashed by the session layer.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub password_hash: String,
}

/// Narrow storage contract consumed by the session layer and the request
/// guard. The store owns persisted account state exclusively; the session
/// layer is the only writer of the refresh-token column.
#[rocket::async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AuthResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>>;

    /// Fails with `Conflict` when a uniqueness constraint is violated, even
    /// by a concurrent writer that won the race after our pre-check.
    async fn create(&self, fields: NewAccount) -> AuthResult<Account>;

    /// Atomic single-row write; `None` clears the token (logout).
    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> AuthResult<Account>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<Account>;
}

/// Production store backed by Postgres.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AuthResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE lower(username) = lower($1) OR lower(email) = lower($2)",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn create(&self, fields: NewAccount) -> AuthResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, full_name, avatar_url, cover_image_url, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&fields.username)
        .bind(&fields.email)
        .bind(&fields.full_name)
        .bind(&fields.avatar_url)
        .bind(&fields.cover_image_url)
        .bind(&fields.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(account)
    }

    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> AuthResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET refresh_token = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or_else(|| AuthError::NotFound("account not found".into()))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET password_hash = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or_else(|| AuthError::NotFound("account not found".into()))
    }
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        // Postgres unique_violation
        if db_err.code().as_deref() == Some("23505") {
            return AuthError::Conflict("username or email already registered".into());
        }
    }
    AuthError::from(err)
}

/// In-memory store used by unit and integration tests (and handy for local
/// experiments). Mirrors the Postgres store's semantics, including the
/// conflict check on create and last-writer-wins refresh-token updates.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AuthResult<Option<Account>> {
        let accounts = self.accounts.lock();
        Ok(accounts
            .values()
            .find(|account| {
                account.username.eq_ignore_ascii_case(username)
                    || account.email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        Ok(self.accounts.lock().get(&id).cloned())
    }

    async fn create(&self, fields: NewAccount) -> AuthResult<Account> {
        let mut accounts = self.accounts.lock();

        let taken = accounts.values().any(|account| {
            account.username.eq_ignore_ascii_case(&fields.username)
                || account.email.eq_ignore_ascii_case(&fields.email)
        });
        if taken {
            return Err(AuthError::Conflict(
                "username or email already registered".into(),
            ));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: fields.username,
            email: fields.email,
            full_name: fields.full_name,
            avatar_url: fields.avatar_url,
            cover_image_url: fields.cover_image_url,
            password_hash: fields.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> AuthResult<Account> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AuthError::NotFound("account not found".into()))?;
        account.refresh_token = token.map(|t| t.to_string());
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AuthResult<Account> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AuthError::NotFound("account not found".into()))?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}
