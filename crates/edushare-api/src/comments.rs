use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use edushare_db::models::CommentParent;
use edushare_types::api::{Claims, CreateCommentRequest};
use edushare_types::models::{NotificationType, TargetRef};

use crate::auth::AppState;
use crate::convert::comment_response;
use crate::db_call;
use crate::error::ApiError;

const MAX_COMMENT_CHARS: usize = 5_000;

/// Adds a comment to a post or question, or a reply to a top-level comment,
/// and notifies whoever owns the thing commented on.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    let len = content.chars().count();
    if len == 0 || len > MAX_COMMENT_CHARS {
        return Err(ApiError::Validation(format!(
            "content must be 1-{MAX_COMMENT_CHARS} characters"
        )));
    }

    // The notification target is what the comment hangs on: the post or
    // question itself, or the parent comment for replies.
    let target = TargetRef::from_parts(req.post_id, req.question_id, req.parent_id)
        .ok_or_else(|| {
            ApiError::Validation("exactly one of postId, questionId, parentId is required".into())
        })?;

    let (parent, recipient) = match target {
        TargetRef::Comment(parent_id) => {
            let pid = parent_id.to_string();
            let parent = db_call(&state, move |db| db.get_comment(&pid))
                .await?
                .ok_or(ApiError::NotFound)?;
            if parent.parent_id.is_some() {
                return Err(ApiError::Validation("replies cannot be nested".into()));
            }
            (CommentParent::Reply(parent.id), parent.author_id)
        }
        TargetRef::Post(id) | TargetRef::Question(id) => {
            let owner = db_call(&state, move |db| db.target_owner(&target))
                .await?
                .ok_or(ApiError::NotFound)?;
            let parent = match target {
                TargetRef::Post(_) => CommentParent::Post(id.to_string()),
                _ => CommentParent::Question(id.to_string()),
            };
            (parent, owner)
        }
    };

    let comment_id = Uuid::new_v4();
    let (cid, actor) = (comment_id.to_string(), claims.sub.to_string());
    let row = db_call(&state, move |db| {
        db.insert_comment(&cid, &actor, &content, &parent)?;
        let outcome = db.notify(&recipient, &actor, &target, NotificationType::Comment)?;
        debug!("comment {} on {}: notification {:?}", cid, target, outcome);
        db.get_comment(&cid)
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("comment {comment_id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(comment_response(row))))
}
