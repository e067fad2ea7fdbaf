use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::ListNoteLogsParams;
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};

use super::access::{Action, Resource, require_access, rule_for};

/// Log access mirrors note read access: the caller names the note, and
/// the note's space decides visibility.
pub async fn list_note_logs(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListNoteLogsParams>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let note_id = params
        .note
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing note parameter"))?;

    let note = store
        .get_note(note_id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::NoteLog, Action::List),
    )?;

    let logs = store
        .list_note_logs(&note.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list note logs")?;

    let (logs, next_cursor, has_more) =
        paginate(logs, DEFAULT_PAGE_SIZE as usize, |l| l.created_at.to_rfc3339());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(logs, next_cursor, has_more)))
}

pub async fn get_note_log(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let log = store
        .get_note_log(&id)
        .api_err("Failed to get note log")?
        .or_not_found("Note log not found")?;

    let note = store
        .get_note(&log.note_id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::NoteLog, Action::Retrieve),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(log)))
}
