//! Cover image cleanup around recipe saves and deletes.
//!
//! `models::recipe` calls [`before_save`] and [`before_delete`] right before it
//! writes to the `recipes` table, so a cover file on disk never outlives the
//! reference that pointed at it. Removal is best effort: a cover with no
//! usable path, or a file that is already gone, is skipped silently.

use std::io;
use std::path::{Component, Path, PathBuf};

use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::Recipe;

/// Remove the stored state's cover file of the recipe about to be deleted.
pub async fn before_delete(db: &SqlitePool, media_root: &Path, id: i64) -> Result<(), AppError> {
    let Some(stored) = Recipe::find(db, id).await? else {
        return Ok(());
    };
    delete_cover(media_root, stored.cover.as_deref()).await?;
    Ok(())
}

/// Remove the previous cover file when the incoming cover replaces it.
///
/// `id` is `None` for a recipe that has never been stored.
pub async fn before_save(
    db: &SqlitePool,
    media_root: &Path,
    id: Option<i64>,
    incoming: Option<&str>,
) -> Result<(), AppError> {
    let Some(id) = id else {
        return Ok(());
    };
    let Some(previous) = Recipe::find(db, id).await? else {
        return Ok(());
    };

    if cover_changed(previous.cover.as_deref(), incoming) {
        delete_cover(media_root, previous.cover.as_deref()).await?;
    }
    Ok(())
}

/// Delete a cover file under `media_root`.
///
/// Missing or invalid paths and files that no longer exist are not errors.
pub async fn delete_cover(media_root: &Path, cover: Option<&str>) -> io::Result<()> {
    let Some(path) = cover_path(media_root, cover) else {
        return Ok(());
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "cover removed");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn cover_changed(previous: Option<&str>, incoming: Option<&str>) -> bool {
    let previous = previous.filter(|c| !c.is_empty());
    let incoming = incoming.filter(|c| !c.is_empty());
    previous != incoming
}

/// Resolve a stored cover reference to a file under `media_root`.
/// Only plain relative paths resolve.
fn cover_path(media_root: &Path, cover: Option<&str>) -> Option<PathBuf> {
    let cover = cover?.trim();
    if cover.is_empty() {
        return None;
    }

    let relative = Path::new(cover);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(media_root.join(relative))
}
