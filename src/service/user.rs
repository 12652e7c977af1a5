use async_trait::async_trait;

use crate::db::PgStore;
use crate::err::Error;
use crate::models::{Role, User};
use crate::service::UserService;

#[async_trait]
impl UserService for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, role, created_at, updated_at \
             FROM users WHERE email = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, LOCALTIMESTAMP, LOCALTIMESTAMP) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
