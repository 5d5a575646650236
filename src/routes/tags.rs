use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::AppError;
use crate::models::Tag;
use crate::serializers::TagRepresentation;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v2/tags/{id}", get(show_tag))
}

async fn show_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TagRepresentation>, AppError> {
    let tag = Tag::find(&state.db, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(tag.into()))
}
