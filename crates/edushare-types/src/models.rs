use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of content a vote, favorite or notification can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Question,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Question => "question",
            Self::Comment => "comment",
        }
    }
}

impl FromStr for TargetKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "question" => Ok(Self::Question),
            "comment" => Ok(Self::Comment),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A concrete target: exactly one of post, question or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    Post(Uuid),
    Question(Uuid),
    Comment(Uuid),
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: Uuid) -> Self {
        match kind {
            TargetKind::Post => Self::Post(id),
            TargetKind::Question => Self::Question(id),
            TargetKind::Comment => Self::Comment(id),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Post(_) => TargetKind::Post,
            Self::Question(_) => TargetKind::Question,
            Self::Comment(_) => TargetKind::Comment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Post(id) | Self::Question(id) | Self::Comment(id) => *id,
        }
    }

    /// Builds a target from the optional id triple used in request bodies.
    /// Returns `None` unless exactly one id is present.
    pub fn from_parts(
        post_id: Option<Uuid>,
        question_id: Option<Uuid>,
        comment_id: Option<Uuid>,
    ) -> Option<Self> {
        match (post_id, question_id, comment_id) {
            (Some(id), None, None) => Some(Self::Post(id)),
            (None, Some(id), None) => Some(Self::Question(id)),
            (None, None, Some(id)) => Some(Self::Comment(id)),
            _ => None,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

/// The three parallel vote ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
    Favorite,
}

impl VoteKind {
    pub const ALL: [VoteKind; 3] = [Self::Upvote, Self::Downvote, Self::Favorite];

    /// Backing table. Static so it can be spliced into SQL safely.
    pub fn table(self) -> &'static str {
        match self {
            Self::Upvote => "upvotes",
            Self::Downvote => "downvotes",
            Self::Favorite => "favorites",
        }
    }

    /// Upvote and downvote exclude each other; favorites stand alone.
    pub fn opposite(self) -> Option<VoteKind> {
        match self {
            Self::Upvote => Some(Self::Downvote),
            Self::Downvote => Some(Self::Upvote),
            Self::Favorite => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Comment,
    Interaction,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Interaction => "interaction",
        }
    }
}

impl FromStr for NotificationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(Self::Comment),
            "interaction" => Ok(Self::Interaction),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}
