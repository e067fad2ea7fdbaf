use std::fmt;

use serde::{Deserialize, Serialize};

/// A user's role within one note space.
///
/// Capability order is Owner > Member > Guest: owners manage the space,
/// members read and write notes, guests are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
    Guest,
}

impl Role {
    /// Database code for this role.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Role::Owner => 1,
            Role::Member => 2,
            Role::Guest => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Role> {
        match code {
            1 => Some(Role::Owner),
            2 => Some(Role::Member),
            3 => Some(Role::Guest),
            _ => None,
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Member => 2,
            Role::Guest => 1,
        }
    }

    /// Returns true if this role has at least the capability of `threshold`.
    #[must_use]
    pub const fn meets(self, threshold: Role) -> bool {
        self.rank() >= threshold.rank()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Member => "member",
            Role::Guest => "guest",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "owner" => Some(Role::Owner),
            "member" => Some(Role::Member),
            "guest" => Some(Role::Guest),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a note space: a user's personal space or a shared team space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceKind {
    Personal,
    Team,
}

impl SpaceKind {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            SpaceKind::Personal => 1,
            SpaceKind::Team => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<SpaceKind> {
        match code {
            1 => Some(SpaceKind::Personal),
            2 => Some(SpaceKind::Team),
            _ => None,
        }
    }
}

/// The closed set of actions recorded in the note log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    Created,
    Updated,
    /// Moved to trash.
    Deleted,
    /// Restored from trash.
    Restored,
    Archived,
    Unarchived,
    Tagged,
    Untagged,
    Pinned,
    Unpinned,
}

impl LogAction {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            LogAction::Created => 1,
            LogAction::Updated => 2,
            LogAction::Deleted => 3,
            LogAction::Restored => 4,
            LogAction::Archived => 5,
            LogAction::Unarchived => 6,
            LogAction::Tagged => 7,
            LogAction::Untagged => 8,
            LogAction::Pinned => 9,
            LogAction::Unpinned => 10,
        }
    }

    pub fn from_code(code: i64) -> Option<LogAction> {
        match code {
            1 => Some(LogAction::Created),
            2 => Some(LogAction::Updated),
            3 => Some(LogAction::Deleted),
            4 => Some(LogAction::Restored),
            5 => Some(LogAction::Archived),
            6 => Some(LogAction::Unarchived),
            7 => Some(LogAction::Tagged),
            8 => Some(LogAction::Untagged),
            9 => Some(LogAction::Pinned),
            10 => Some(LogAction::Unpinned),
            _ => None,
        }
    }
}
