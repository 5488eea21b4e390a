use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationType, TargetRef, VoteKind};

// -- JWT Claims --

/// Session claims carried by the JWT in the bearer header or session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub points: i64,
    pub last_sign_date: Option<String>,
    pub post_count: i64,
    pub question_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySignResponse {
    pub points: i64,
    pub reward: i64,
    pub last_sign_date: String,
}

// -- Posts & questions --

/// Body for both `POST /posts` and `POST /questions`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
    pub comments_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: Uuid,
    pub author: AuthorSummary,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub stats: ContentStats,
    /// Only present on questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_solved: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopContentResponse {
    #[serde(flatten)]
    pub item: ContentResponse,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateQuestionRequest {
    pub solved: Option<bool>,
    pub helpful_comment_id: Option<Uuid>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub post_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub author: AuthorSummary,
    pub content: String,
    pub is_helpful: bool,
    pub post_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
    pub replies: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
}

// -- Interactions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InteractionRequest {
    pub user_id: Uuid,
    pub post_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub action_type: VoteKind,
}

impl InteractionRequest {
    pub fn target(&self) -> Option<TargetRef> {
        TargetRef::from_parts(self.post_id, self.question_id, self.comment_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
    pub upvoted: bool,
    pub downvoted: bool,
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub inserted: bool,
    pub removed_opposite: bool,
    pub summary: VoteSummary,
}

#[derive(Debug, Serialize)]
pub struct RemoveInteractionResponse {
    pub removed: bool,
    pub summary: VoteSummary,
}

// -- Notifications --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub target: TargetRef,
    pub notification_type: NotificationType,
    pub last_notify_user_id: Uuid,
    /// Every distinct actor that triggered this notification, latest first.
    pub actors: Vec<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

// -- Tags --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub name: String,
    pub post_count: i64,
    pub question_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_request_reads_camel_case() {
        let user = Uuid::new_v4();
        let post = Uuid::new_v4();
        let body = format!(
            r#"{{"userId":"{user}","postId":"{post}","actionType":"favorite"}}"#
        );
        let req: InteractionRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.action_type, VoteKind::Favorite);
        assert_eq!(req.target(), Some(TargetRef::Post(post)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = r#"{"title":"t","content":"c","extra":1}"#;
        assert!(serde_json::from_str::<CreateContentRequest>(body).is_err());
    }
}
