use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A registered author. The password hash never leaves the `users` table
/// through this type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
}

impl User {
    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, first_name, last_name, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn email_exists(db: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn username_exists(db: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(db)
            .await?;
        Ok(count > 0)
    }

    /// Look up a user together with their stored password hash.
    pub async fn find_with_password(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<(User, String)>, sqlx::Error> {
        let row: Option<(i64, String, String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, username, first_name, last_name, email, created_at, password
            FROM users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;

        Ok(row.map(
            |(id, username, first_name, last_name, email, created_at, password)| {
                (
                    User {
                        id,
                        username,
                        first_name,
                        last_name,
                        email,
                        created_at,
                    },
                    password,
                )
            },
        ))
    }
}

/// A validated registration, ready to persist. `password_hash` is a PHC string.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub async fn insert(self, db: &SqlitePool) -> Result<User, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.username)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(&now)
        .execute(db)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            created_at: now,
        })
    }
}
