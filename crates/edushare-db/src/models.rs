//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the edushare-types API models.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub points: i64,
    pub last_sign_date: Option<String>,
    pub created_at: String,
}

/// Authored totals shown on a profile.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub posts: i64,
    pub questions: i64,
    pub comments: i64,
}

/// A post or question joined with its author, aggregated counts and tags.
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    /// `Some` for questions only.
    pub is_solved: Option<bool>,
    pub created_at: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
    pub comments_count: i64,
    pub tags: Vec<String>,
}

impl ContentRow {
    /// Popularity used by the top endpoints. Downvotes do not count; the
    /// same weighting orders `top_content` in SQL.
    pub fn score(&self) -> i64 {
        self.upvotes + self.favorites + self.comments_count * 5
    }
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub is_helpful: bool,
    pub post_id: Option<String>,
    pub question_id: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
}

pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub target_type: String,
    pub target_id: String,
    pub notification_type: String,
    pub last_notify_user_id: String,
    pub is_read: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NotificationActorRow {
    pub notification_id: String,
    pub actor_id: String,
    pub notified_at: String,
}

pub struct TagRow {
    pub name: String,
    pub post_count: i64,
    pub question_count: i64,
}

/// Result of inserting into a vote ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    /// False when the actor already had this vote.
    pub inserted: bool,
    /// True when an opposing up/down vote was deleted first.
    pub removed_opposite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    /// Another account already holds the email.
    EmailTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Actor is the owner; nothing written.
    Suppressed,
    Created,
    /// Existing row for the key was pointed at the new actor and marked unread.
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendOutcome {
    /// Balance after the spend.
    Spent { balance: i64 },
    Insufficient { balance: i64 },
    /// Balance changed between read and write.
    RaceLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    Signed { points: i64 },
    AlreadySigned,
    RaceLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpfulOutcome {
    Marked,
    /// Comment missing, a reply, or attached to another question.
    NotAnAnswer,
}

/// Where a new comment hangs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentParent {
    Post(String),
    Question(String),
    Reply(String),
}

/// Vote counts for one target plus what the viewer has cast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub favorites: i64,
    pub upvoted: bool,
    pub downvoted: bool,
    pub favorited: bool,
}
