use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::covers;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    pub is_published: bool,
    /// Path of the cover image relative to the media root.
    pub cover: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Recipe {
    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<Recipe>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_published(
        db: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM recipes
            WHERE is_published = 1
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn list_by_author(db: &SqlitePool, author_id: i64) -> Result<Vec<Recipe>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM recipes WHERE author_id = ? ORDER BY id DESC")
            .bind(author_id)
            .fetch_all(db)
            .await
    }

    /// Persist every column of `self`, replacing the tag set when `tag_ids` is given.
    ///
    /// Runs the before-save cover hook first, so a replaced cover file is
    /// removed from `media_root` before the new reference is committed.
    pub async fn save(
        &mut self,
        db: &SqlitePool,
        media_root: &Path,
        tag_ids: Option<&[i64]>,
    ) -> Result<(), AppError> {
        covers::before_save(db, media_root, Some(self.id), self.cover.as_deref()).await?;

        self.updated_at = Utc::now().to_rfc3339();

        let mut tx = db.begin().await?;
        sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, description = ?, slug = ?, preparation_time = ?,
                preparation_time_unit = ?, servings = ?, servings_unit = ?,
                preparation_steps = ?, preparation_steps_is_html = ?, is_published = ?,
                cover = ?, category_id = ?, author_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.slug)
        .bind(self.preparation_time)
        .bind(&self.preparation_time_unit)
        .bind(self.servings)
        .bind(&self.servings_unit)
        .bind(&self.preparation_steps)
        .bind(self.preparation_steps_is_html)
        .bind(self.is_published)
        .bind(&self.cover)
        .bind(self.category_id)
        .bind(self.author_id)
        .bind(&self.updated_at)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        if let Some(tag_ids) = tag_ids {
            replace_tags(&mut tx, self.id, tag_ids).await?;
        }
        tx.commit().await?;

        tracing::debug!(recipe_id = self.id, "recipe saved");
        Ok(())
    }

    /// Delete a recipe by id, removing its cover file first.
    /// Returns `false` when no such recipe exists.
    pub async fn delete(db: &SqlitePool, media_root: &Path, id: i64) -> Result<bool, AppError> {
        covers::before_delete(db, media_root, id).await?;

        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(recipe_id = id, "recipe deleted");
        }
        Ok(deleted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    pub is_published: bool,
    pub cover: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub tag_ids: Vec<i64>,
}

impl NewRecipe {
    pub async fn insert(self, db: &SqlitePool, media_root: &Path) -> Result<Recipe, AppError> {
        covers::before_save(db, media_root, None, self.cover.as_deref()).await?;

        let now = Utc::now().to_rfc3339();
        let slug = slugify(&self.title);

        let mut tx = db.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO recipes (
                title, description, slug, preparation_time, preparation_time_unit,
                servings, servings_unit, preparation_steps, preparation_steps_is_html,
                is_published, cover, category_id, author_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&slug)
        .bind(self.preparation_time)
        .bind(&self.preparation_time_unit)
        .bind(self.servings)
        .bind(&self.servings_unit)
        .bind(&self.preparation_steps)
        .bind(self.preparation_steps_is_html)
        .bind(self.is_published)
        .bind(&self.cover)
        .bind(self.category_id)
        .bind(self.author_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        replace_tags(&mut tx, id, &self.tag_ids).await?;
        tx.commit().await?;

        tracing::info!(recipe_id = id, "recipe created");

        Ok(Recipe {
            id,
            title: self.title,
            description: self.description,
            slug,
            preparation_time: self.preparation_time,
            preparation_time_unit: self.preparation_time_unit,
            servings: self.servings,
            servings_unit: self.servings_unit,
            preparation_steps: self.preparation_steps,
            preparation_steps_is_html: self.preparation_steps_is_html,
            is_published: self.is_published,
            cover: self.cover,
            category_id: self.category_id,
            author_id: self.author_id,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}

async fn replace_tags(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Lowercase slug: runs of anything that isn't a letter or digit become one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
