use axum::{Json, extract::State, response::IntoResponse};

use edushare_types::api::TagResponse;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;

pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_call(&state, |db| db.list_tags()).await?;
    let tags: Vec<TagResponse> = rows
        .into_iter()
        .map(|row| TagResponse {
            name: row.name,
            post_count: row.post_count,
            question_count: row.question_count,
        })
        .collect();
    Ok(Json(tags))
}
