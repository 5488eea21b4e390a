use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use edushare_types::api::{Claims, MarkAllReadResponse, UnreadCountResponse};

use crate::auth::AppState;
use crate::convert::notification_responses;
use crate::db_call;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<NotificationQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = claims.sub.to_string();

    let (rows, actor_rows) = db_call(&state, move |db| {
        let rows = db.list_notifications(&recipient, query.unread_only)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let actor_rows = db.get_actors_for_notifications(&ids)?;
        Ok((rows, actor_rows))
    })
    .await?;

    Ok(Json(notification_responses(rows, actor_rows)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = claims.sub.to_string();
    let count = db_call(&state, move |db| db.unread_notification_count(&recipient)).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = claims.sub.to_string();
    let updated = db_call(&state, move |db| {
        db.mark_notification_read(&recipient, &notification_id.to_string())
    })
    .await?;

    if !updated {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = claims.sub.to_string();
    let updated = db_call(&state, move |db| db.mark_all_notifications_read(&recipient)).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
