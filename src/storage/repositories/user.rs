//! User credential repository.
//!
//! The credential store collaborator: lookups by id/email/username for
//! authentication, plus the two credential mutations (create, password
//! update). Rows are never deleted; deactivation flips `is_active`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::auth::user::{NewUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: UserId::from_string(self.id),
            username: self.username,
            email: self.email,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user with an already-hashed password.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get a user by ID.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get a user with their password hash for login verification.
    async fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>>;

    /// Get just the password hash for a user id (password change).
    async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>>;

    /// Replace a user's password hash. Single UPDATE; no partial state.
    async fn update_password(&self, id: &UserId, password_hash: String) -> Result<()>;

    /// Soft-deactivate or reactivate an account.
    async fn set_active(&self, id: &UserId, active: bool) -> Result<()>;
}

pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username), name = "db_create_user")]
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to create user"))?;

        self.find_by_id(&user.id)
            .await?
            .ok_or_else(|| Error::internal("User not found after creation"))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_find_user")]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch user"))?;

        Ok(row.map(UserRow::into_user))
    }

    #[instrument(skip(self, email), name = "db_find_user_by_email")]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch user by email"))?;

        Ok(row.map(UserRow::into_user))
    }

    #[instrument(skip(self, username), name = "db_find_user_by_username")]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch user by username"))?;

        Ok(row.map(UserRow::into_user))
    }

    #[instrument(skip(self, email), name = "db_get_user_with_password")]
    async fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch user credentials"))?;

        Ok(row.map(|r| {
            let hash = r.password_hash.clone();
            (r.into_user(), hash)
        }))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_password_hash")]
    async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>> {
        let hash: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| Error::database(err, "Failed to fetch password hash"))?;

        Ok(hash.map(|(h,)| h))
    }

    #[instrument(skip(self, password_hash), fields(user_id = %id), name = "db_update_password")]
    async fn update_password(&self, id: &UserId, password_hash: String) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to update password"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_set_user_active")]
    async fn set_active(&self, id: &UserId, active: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to update user status"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }
        Ok(())
    }
}
