use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, slug FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Tags attached to a recipe, ordered by id.
    pub async fn for_recipe(db: &SqlitePool, recipe_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT t.id, t.name, t.slug
            FROM tags t
            JOIN recipe_tags rt ON rt.tag_id = t.id
            WHERE rt.recipe_id = ?
            ORDER BY t.id ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(db)
        .await
    }
}
