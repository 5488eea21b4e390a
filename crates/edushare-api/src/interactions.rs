use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use edushare_types::api::{
    Claims, InteractionRequest, InteractionResponse, RemoveInteractionResponse,
};
use edushare_types::models::{NotificationType, TargetRef};

use crate::auth::AppState;
use crate::convert::vote_summary;
use crate::db_call;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetQuery {
    pub post_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
}

/// The body names the acting user; it has to be the session user.
fn checked_target(req: &InteractionRequest, claims: &Claims) -> Result<TargetRef, ApiError> {
    if req.user_id != claims.sub {
        return Err(ApiError::Unauthorized);
    }
    req.target().ok_or_else(|| {
        ApiError::Validation("exactly one of postId, questionId, commentId is required".into())
    })
}

/// POST /interactions: upvote, downvote or favorite a target. A vote that
/// actually lands notifies the target's owner.
pub async fn add_interaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<InteractionRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let target = checked_target(&req, &claims)?;
    let kind = req.action_type;
    let actor = claims.sub.to_string();

    let (change, tally) = db_call(&state, move |db| {
        let Some(owner) = db.target_owner(&target)? else {
            return Ok(None);
        };

        let change = db.add_vote(&actor, &target, kind)?;
        if change.inserted {
            let outcome = db.notify(&owner, &actor, &target, NotificationType::Interaction)?;
            debug!("{:?} on {} by {}: notification {:?}", kind, target, actor, outcome);
        }

        let tally = db.vote_tally(&target, &actor)?;
        Ok(Some((change, tally)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(InteractionResponse {
        inserted: change.inserted,
        removed_opposite: change.removed_opposite,
        summary: vote_summary(tally),
    }))
}

/// DELETE /interactions: withdraw a vote. Withdrawing something never cast
/// is not an error.
pub async fn remove_interaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<InteractionRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let target = checked_target(&req, &claims)?;
    let kind = req.action_type;
    let actor = claims.sub.to_string();

    let (removed, tally) = db_call(&state, move |db| {
        if db.target_owner(&target)?.is_none() {
            return Ok(None);
        }
        let removed = db.remove_vote(&actor, &target, kind)?;
        let tally = db.vote_tally(&target, &actor)?;
        Ok(Some((removed, tally)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(RemoveInteractionResponse {
        removed,
        summary: vote_summary(tally),
    }))
}

pub async fn get_interactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<TargetQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let target = TargetRef::from_parts(query.post_id, query.question_id, query.comment_id)
        .ok_or_else(|| {
            ApiError::Validation("exactly one of postId, questionId, commentId is required".into())
        })?;
    let viewer = claims.sub.to_string();

    let tally = db_call(&state, move |db| {
        if db.target_owner(&target)?.is_none() {
            return Ok(None);
        }
        db.vote_tally(&target, &viewer).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(vote_summary(tally)))
}
