use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{LogAction, Role, SpaceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub fullname: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Staff and superusers bypass role checks.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSpace {
    pub id: String,
    pub kind: SpaceKind,
    pub name: String,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's membership in one note space. Unique per (space, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub space_id: String,
    pub user_id: String,
    pub role: Role,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub space_id: String,
    pub name: String,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub space_id: String,
    pub title: String,
    /// Opaque structured document; never interpreted by the server.
    pub content: Value,
    /// Bumped only when title or content changes; flag toggles and
    /// tagging leave it alone. Clients use it to detect stale writes.
    pub revision: i64,
    pub is_archived: bool,
    pub is_pinned: bool,
    pub is_deleted: bool,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three independently-toggled note flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFlag {
    Archived,
    Pinned,
    Deleted,
}

impl NoteFlag {
    /// Field (and column) name of this flag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            NoteFlag::Archived => "is_archived",
            NoteFlag::Pinned => "is_pinned",
            NoteFlag::Deleted => "is_deleted",
        }
    }

    /// Log action recorded when this flag is set to `value`.
    #[must_use]
    pub const fn action(self, value: bool) -> LogAction {
        match (self, value) {
            (NoteFlag::Archived, true) => LogAction::Archived,
            (NoteFlag::Archived, false) => LogAction::Unarchived,
            (NoteFlag::Pinned, true) => LogAction::Pinned,
            (NoteFlag::Pinned, false) => LogAction::Unpinned,
            (NoteFlag::Deleted, true) => LogAction::Deleted,
            (NoteFlag::Deleted, false) => LogAction::Restored,
        }
    }

    /// Current value of this flag on a note.
    #[must_use]
    pub const fn get(self, note: &Note) -> bool {
        match self {
            NoteFlag::Archived => note.is_archived,
            NoteFlag::Pinned => note.is_pinned,
            NoteFlag::Deleted => note.is_deleted,
        }
    }
}

/// One immutable record of a state-changing action on a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteLog {
    pub id: String,
    pub note_id: String,
    pub user_id: String,
    pub action: LogAction,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
}

impl NoteLog {
    /// Builds a log entry for an action taken now by `user_id`.
    #[must_use]
    pub fn record(note_id: &str, user_id: &str, action: LogAction, extras: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            note_id: note_id.to_string(),
            user_id: user_id.to_string(),
            action,
            extras,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A tag reference embedded in note responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteWithTags {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<TagRef>,
}
