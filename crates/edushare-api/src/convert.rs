//! Row -> response mapping. Stored ids and timestamps that fail to parse are
//! logged and defaulted rather than failing the whole response.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use edushare_db::models::{CommentRow, ContentRow, NotificationActorRow, NotificationRow, VoteTally};
use edushare_types::api::{
    AuthorSummary, CommentResponse, ContentResponse, ContentStats, NotificationResponse, VoteSummary,
};
use edushare_types::models::{NotificationType, TargetKind, TargetRef};

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_time(raw: &str) -> DateTime<Utc> {
    edushare_db::parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}'", raw);
        DateTime::default()
    })
}

pub(crate) fn content_response(row: ContentRow) -> ContentResponse {
    ContentResponse {
        id: parse_id(&row.id, "content id"),
        author: AuthorSummary {
            id: parse_id(&row.author_id, "author_id"),
            name: row.author_name,
        },
        title: row.title,
        content: row.content,
        images: row.images,
        tags: row.tags,
        stats: ContentStats {
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            favorites: row.favorites,
            comments_count: row.comments_count,
        },
        is_solved: row.is_solved,
        created_at: parse_time(&row.created_at),
    }
}

pub(crate) fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_id(&row.id, "comment id"),
        author: AuthorSummary {
            id: parse_id(&row.author_id, "author_id"),
            name: row.author_name,
        },
        content: row.content,
        is_helpful: row.is_helpful,
        post_id: row.post_id.as_deref().map(|id| parse_id(id, "post_id")),
        question_id: row.question_id.as_deref().map(|id| parse_id(id, "question_id")),
        parent_id: row.parent_id.as_deref().map(|id| parse_id(id, "parent_id")),
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        favorites: row.favorites,
        replies: vec![],
        created_at: parse_time(&row.created_at),
    }
}

/// Nests replies under their parent, preserving the query order.
pub(crate) fn comment_thread(rows: Vec<CommentRow>) -> Vec<CommentResponse> {
    let mut replies: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    let mut top_level = Vec::new();

    for row in rows {
        match row.parent_id.clone() {
            Some(parent) => replies.entry(parent).or_default().push(comment_response(row)),
            None => top_level.push(row),
        }
    }

    top_level
        .into_iter()
        .map(|row| {
            let children = replies.remove(&row.id).unwrap_or_default();
            let mut comment = comment_response(row);
            comment.replies = children;
            comment
        })
        .collect()
}

pub(crate) fn vote_summary(tally: VoteTally) -> VoteSummary {
    VoteSummary {
        upvotes: tally.upvotes,
        downvotes: tally.downvotes,
        favorites: tally.favorites,
        upvoted: tally.upvoted,
        downvoted: tally.downvoted,
        favorited: tally.favorited,
    }
}

pub(crate) fn notification_responses(
    rows: Vec<NotificationRow>,
    actor_rows: Vec<NotificationActorRow>,
) -> Vec<NotificationResponse> {
    let mut actors: HashMap<String, Vec<Uuid>> = HashMap::new();
    for a in &actor_rows {
        actors
            .entry(a.notification_id.clone())
            .or_default()
            .push(parse_id(&a.actor_id, "actor_id"));
    }

    rows.into_iter()
        .filter_map(|row| {
            let kind: TargetKind = match row.target_type.parse() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("Skipping notification '{}': {}", row.id, e);
                    return None;
                }
            };
            let notification_type: NotificationType = match row.notification_type.parse() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping notification '{}': {}", row.id, e);
                    return None;
                }
            };

            Some(NotificationResponse {
                id: parse_id(&row.id, "notification id"),
                target: TargetRef::new(kind, parse_id(&row.target_id, "target_id")),
                notification_type,
                last_notify_user_id: parse_id(&row.last_notify_user_id, "last_notify_user_id"),
                actors: actors.remove(&row.id).unwrap_or_default(),
                is_read: row.is_read,
                created_at: parse_time(&row.created_at),
                updated_at: parse_time(&row.updated_at),
            })
        })
        .collect()
}
