use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use edushare_db::content::ContentKind;
use edushare_types::api::{Claims, CreateContentRequest};

use crate::auth::AppState;
use crate::content::{self, ListQuery, validate_content};
use crate::convert::content_response;
use crate::db_call;
use crate::error::ApiError;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateContentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req)?;

    let post_id = Uuid::new_v4();
    let (pid, aid) = (post_id.to_string(), claims.sub.to_string());
    let row = db_call(&state, move |db| {
        db.create_content(
            ContentKind::Post,
            &pid,
            &aid,
            req.title.trim(),
            &req.content,
            &req.images,
            &req.tags,
        )?;
        db.get_content(ContentKind::Post, &pid)
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post {post_id} vanished after insert")))?;

    info!("user {} created post {}", claims.sub, post_id);
    Ok((StatusCode::CREATED, Json(content_response(row))))
}

pub async fn list_posts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::list(&state, ContentKind::Post, query).await?))
}

pub async fn top_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::top(&state, ContentKind::Post).await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::detail(&state, ContentKind::Post, post_id, claims.sub).await?))
}

pub async fn get_post_comments(
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::comments(&state, ContentKind::Post, post_id).await?))
}
