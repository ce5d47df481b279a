use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::auth_service::AccountDirectory;

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(AppError::AccountNotFound)
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Remove an account; their listings go with it (FK cascade).
    pub async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::AccountNotFound);
        }

        Ok(())
    }

    /// Fails with `PermissionDenied` unless the account has the admin role.
    pub async fn require_admin(&self, user_id: i64) -> AppResult<User> {
        let user = self.get_user_by_id(user_id).await?;

        if user.role != UserRole::Admin {
            return Err(AppError::PermissionDenied);
        }

        Ok(user)
    }
}

#[async_trait]
impl AccountDirectory for UserService {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, 'student', ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_user_by_id(result.last_insert_rowid()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn test_pool() -> SqlitePool {
        // single connection so the in-memory database is shared
        let config = crate::config::DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = crate::database::create_pool(&config).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_find_by_email() {
        let service = UserService::new(test_pool().await);

        let user = service
            .insert("Jordan Lee", "jordan@campus.edu", "hash")
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Student);

        let found = service.find_by_email("jordan@campus.edu").await.unwrap();
        assert_eq!(found.unwrap().id, user.id);

        let missing = service.find_by_email("nobody@campus.edu").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_require_admin() {
        let service = UserService::new(test_pool().await);

        let student = service
            .insert("Jordan Lee", "jordan@campus.edu", "hash")
            .await
            .unwrap();
        let err = service.require_admin(student.id).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(student.id)
            .execute(&service.pool)
            .await
            .unwrap();
        assert!(service.require_admin(student.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = UserService::new(test_pool().await);

        let user = service
            .insert("Jordan Lee", "jordan@campus.edu", "hash")
            .await
            .unwrap();
        service.delete_user(user.id).await.unwrap();

        let err = service.delete_user(user.id).await.unwrap_err();
        assert!(matches!(err, AppError::AccountNotFound));
    }
}
