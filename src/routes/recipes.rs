use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Recipe;
use crate::serializers::{RecipeInput, RecipeRepresentation};
use crate::AppState;

const COVER_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v2/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/v2/recipes/{id}",
            get(show_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/v2/recipes/{id}/cover",
            post(upload_cover).layer(DefaultBodyLimit::max(MAX_COVER_BYTES)),
        )
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<RecipeRepresentation>>, AppError> {
    let limit = page.limit.clamp(1, 100);
    let offset = page.offset.max(0);

    let recipes = Recipe::list_published(&state.db, limit, offset).await?;

    let mut items = Vec::with_capacity(recipes.len());
    for recipe in &recipes {
        items.push(RecipeRepresentation::load(&state.db, recipe).await?);
    }
    Ok(Json(items))
}

async fn show_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeRepresentation>, AppError> {
    let recipe = Recipe::find(&state.db, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(RecipeRepresentation::load(&state.db, &recipe).await?))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(input): Json<RecipeInput>,
) -> Result<impl IntoResponse, AppError> {
    let validated = input.validate(&state.db, false).await?;
    let recipe = validated
        .into_new_recipe()
        .insert(&state.db, &state.media_root)
        .await?;

    let representation = RecipeRepresentation::load(&state.db, &recipe).await?;
    Ok((StatusCode::CREATED, Json(representation)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<RecipeInput>,
) -> Result<Json<RecipeRepresentation>, AppError> {
    let mut recipe = Recipe::find(&state.db, id).await?.ok_or(AppError::NotFound)?;

    let validated = input.validate(&state.db, true).await?;
    let tag_ids = validated.apply(&mut recipe);
    recipe
        .save(&state.db, &state.media_root, tag_ids.as_deref())
        .await?;

    Ok(Json(RecipeRepresentation::load(&state.db, &recipe).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !Recipe::delete(&state.db, &state.media_root, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the cover with the multipart `cover` file. The previous file is
/// removed by the before-save hook.
async fn upload_cover(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<RecipeRepresentation>, AppError> {
    let mut recipe = Recipe::find(&state.db, id).await?.ok_or(AppError::NotFound)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("cover") {
            continue;
        }
        let ext = field
            .file_name()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .filter(|ext| COVER_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                AppError::BadRequest("cover must be a jpg, jpeg, png, gif or webp image".into())
            })?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((ext, data));
    }

    let (ext, data) =
        upload.ok_or_else(|| AppError::BadRequest("cover file is required".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("the submitted cover file is empty".into()));
    }

    let relative = format!(
        "recipes/covers/{}/{}.{}",
        Utc::now().format("%Y/%m/%d"),
        Uuid::new_v4(),
        ext
    );
    let path = state.media_root.join(&relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &data).await?;

    recipe.cover = Some(relative);
    if let Err(e) = recipe.save(&state.db, &state.media_root, None).await {
        tokio::fs::remove_file(&path).await.ok();
        return Err(e);
    }
    tracing::info!(recipe_id = id, path = %path.display(), "cover stored");

    Ok(Json(RecipeRepresentation::load(&state.db, &recipe).await?))
}
