use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
