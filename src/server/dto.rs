use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Role, SpaceKind};

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Query parameters for listing resources owned by a note space. Every
/// such list must name the space explicitly.
#[derive(Debug, Default, Deserialize)]
pub struct SpaceScopedParams {
    #[serde(default)]
    pub notespace: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    pub name: String,
    #[serde(default)]
    pub kind: Option<SpaceKind>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSpaceRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    #[serde(default)]
    pub notespace: Option<String>,
    pub user: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub notespace: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub notespace: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub content: Value,
}

/// Absent fields mean "leave unchanged".
#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNoteLogsParams {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub fullname: Option<String>,
}

/// Outcome of a note flag or tag action. `changed: false` marks the
/// idempotent no-op case: the state already matched the request.
#[derive(Debug, Serialize)]
pub struct ActionOutcome {
    pub changed: bool,
    pub message: String,
}
