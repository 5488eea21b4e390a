//! Handler bodies shared by posts and questions.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use edushare_db::content::{ContentFilter, ContentKind};
use edushare_types::api::{CommentResponse, ContentResponse, CreateContentRequest, TopContentResponse};
use edushare_types::models::TargetRef;

use crate::auth::AppState;
use crate::convert::{comment_thread, content_response};
use crate::db_call;
use crate::error::ApiError;

/// Number of items the top endpoints return.
pub const TOP_LIMIT: u32 = 3;
/// Only items this recent compete for the top endpoints.
pub const TOP_WINDOW_HOURS: i64 = 24;

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 20_000;
const MAX_IMAGES: usize = 9;
const MAX_TAGS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub tag: Option<String>,
    pub author: Option<Uuid>,
}

fn default_limit() -> u32 {
    20
}

/// Length and count checks for post/question bodies.
pub(crate) fn validate_content(req: &CreateContentRequest) -> Result<(), ApiError> {
    let title = req.title.trim().chars().count();
    if title == 0 || title > MAX_TITLE_CHARS {
        return Err(ApiError::Validation(format!("title must be 1-{MAX_TITLE_CHARS} characters")));
    }
    let content = req.content.trim().chars().count();
    if content == 0 || content > MAX_CONTENT_CHARS {
        return Err(ApiError::Validation(format!(
            "content must be 1-{MAX_CONTENT_CHARS} characters"
        )));
    }
    if req.images.len() > MAX_IMAGES {
        return Err(ApiError::Validation(format!("at most {MAX_IMAGES} images")));
    }
    if req.images.iter().any(|url| url.trim().is_empty()) {
        return Err(ApiError::Validation("image urls must not be empty".into()));
    }
    if edushare_db::content::normalize_tags(&req.tags).len() > MAX_TAGS {
        return Err(ApiError::Validation(format!("at most {MAX_TAGS} tags")));
    }
    Ok(())
}

pub(crate) async fn list(
    state: &AppState,
    kind: ContentKind,
    query: ListQuery,
) -> Result<Vec<ContentResponse>, ApiError> {
    let filter = ContentFilter {
        tag: query.tag,
        author_id: query.author.map(|id| id.to_string()),
        limit: query.limit.clamp(1, 100),
        offset: query.offset,
    };

    let rows = db_call(state, move |db| db.list_content(kind, &filter)).await?;
    Ok(rows.into_iter().map(content_response).collect())
}

pub(crate) async fn top(state: &AppState, kind: ContentKind) -> Result<Vec<TopContentResponse>, ApiError> {
    let since = edushare_db::format_timestamp(Utc::now() - Duration::hours(TOP_WINDOW_HOURS));

    let rows = db_call(state, move |db| db.top_content(kind, &since, TOP_LIMIT)).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let score = row.score();
            TopContentResponse {
                item: content_response(row),
                score,
            }
        })
        .collect())
}

/// Loads one item. When the viewer owns it, their notifications on it are
/// marked read.
pub(crate) async fn detail(
    state: &AppState,
    kind: ContentKind,
    id: Uuid,
    viewer: Uuid,
) -> Result<ContentResponse, ApiError> {
    let row = db_call(state, move |db| {
        let row = db.get_content(kind, &id.to_string())?;
        if let Some(row) = &row {
            let viewer = viewer.to_string();
            if row.author_id == viewer {
                let target = TargetRef::new(kind.target_kind(), id);
                let flipped = db.mark_target_read(&viewer, &target)?;
                if flipped > 0 {
                    debug!("owner read of {} cleared {} notifications", target, flipped);
                }
            }
        }
        Ok(row)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(content_response(row))
}

pub(crate) async fn comments(
    state: &AppState,
    kind: ContentKind,
    id: Uuid,
) -> Result<Vec<CommentResponse>, ApiError> {
    let rows = db_call(state, move |db| {
        let item_id = id.to_string();
        if db.target_owner(&TargetRef::new(kind.target_kind(), id))?.is_none() {
            return Ok(None);
        }
        db.list_comments(kind, &item_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(comment_thread(rows))
}
