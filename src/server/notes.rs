use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{ActionOutcome, CreateNoteRequest, SpaceScopedParams, UpdateNoteRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_note_title;
use crate::store::Store;
use crate::types::{LogAction, Note, NoteFlag, NoteLog, NoteWithTags, TagRef, User};

use super::access::{Action, Resource, require_access, resolve_space, rule_for};

fn with_tags(store: &dyn Store, note: Note) -> Result<NoteWithTags, ApiError> {
    let tags = store
        .list_note_tags(&note.id)
        .api_err("Failed to list note tags")?
        .into_iter()
        .map(TagRef::from)
        .collect();
    Ok(NoteWithTags { note, tags })
}

pub async fn list_notes(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpaceScopedParams>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let space = resolve_space(store, params.notespace.as_deref())?;
    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Note, Action::List),
    )?;

    let notes = store
        .list_notes(&space.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list notes")?;

    let (notes, next_cursor, has_more) =
        paginate(notes, DEFAULT_PAGE_SIZE as usize, |n| n.id.clone());

    let notes = notes
        .into_iter()
        .map(|n| with_tags(store, n))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(PaginatedResponse::new(notes, next_cursor, has_more)))
}

pub async fn create_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNoteRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let space = resolve_space(store, req.notespace.as_deref())?;
    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Note, Action::Create),
    )?;

    let title = req.title.unwrap_or_default();
    validate_note_title(&title)?;

    let now = Utc::now();
    let note = Note {
        id: Uuid::new_v4().to_string(),
        space_id: space.id,
        title,
        content: req.content,
        revision: 1,
        is_archived: false,
        is_pinned: false,
        is_deleted: false,
        extras: json!({}),
        created_at: now,
        updated_at: now,
    };
    let log = NoteLog::record(
        &note.id,
        &principal.id,
        LogAction::Created,
        json!({"title": note.title, "content": note.content}),
    );

    // Note and its creation log commit together or not at all.
    store
        .create_note(&note, &log)
        .api_err("Failed to create note")?;

    let body = NoteWithTags {
        note,
        tags: Vec::new(),
    };
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

pub async fn get_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let note = store
        .get_note(&id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Retrieve),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_tags(store, note)?)))
}

pub async fn update_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let mut note = store
        .get_note(&id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Update),
    )?;

    let new_title = req.title.unwrap_or_else(|| note.title.clone());
    validate_note_title(&new_title)?;
    let new_content = req.content.unwrap_or_else(|| note.content.clone());

    // A save that changes nothing is a plain success: no revision bump,
    // no log entry, no write.
    if new_title == note.title && new_content == note.content {
        return Ok::<_, ApiError>(Json(ApiResponse::success(with_tags(store, note)?)));
    }

    let log = NoteLog::record(
        &note.id,
        &principal.id,
        LogAction::Updated,
        json!({
            "old": {"title": note.title, "content": note.content},
            "new": {"title": new_title.clone(), "content": new_content.clone()},
        }),
    );

    note.title = new_title;
    note.content = new_content;
    note.revision += 1;
    note.updated_at = Utc::now();

    store
        .update_note_content(&note, &log)
        .api_err("Failed to update note")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_tags(store, note)?)))
}

pub async fn delete_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let note = store
        .get_note(&id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    // Hard delete erases the note's log history by design; regular
    // members go through the trash flag instead.
    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Delete),
    )?;

    store
        .delete_note(&note.id)
        .api_err("Failed to delete note")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

fn set_flag(
    store: &dyn Store,
    principal: &User,
    note_id: &str,
    flag: NoteFlag,
    value: bool,
) -> Result<Response, ApiError> {
    let note = store
        .get_note(note_id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Update),
    )?;

    // Idempotence guard: requesting the current value writes nothing and
    // logs nothing, but still succeeds.
    if flag.get(&note) == value {
        let outcome = ActionOutcome {
            changed: false,
            message: format!("The value of {} is already {}", flag.name(), value),
        };
        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(outcome))).into_response());
    }

    let log = NoteLog::record(&note.id, &principal.id, flag.action(value), json!({}));
    store
        .set_note_flag(&note.id, flag, value, &log)
        .api_err("Failed to update note flag")?;

    let outcome = ActionOutcome {
        changed: true,
        message: "Success".to_string(),
    };
    Ok(Json(ApiResponse::success(outcome)).into_response())
}

pub async fn archive_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Archived, true)
}

pub async fn unarchive_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Archived, false)
}

pub async fn pin_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Pinned, true)
}

pub async fn unpin_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Pinned, false)
}

pub async fn trash_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Deleted, true)
}

pub async fn restore_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_flag(state.store.as_ref(), &auth.principal, &id, NoteFlag::Deleted, false)
}

pub async fn add_note_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let note = store
        .get_note(&id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Update),
    )?;

    let tag = store
        .get_tag(&tag_id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    if tag.space_id != note.space_id {
        return Err(ApiError::bad_request(
            "Tag belongs to a different note space",
        ));
    }

    if store
        .note_has_tag(&note.id, &tag.id)
        .api_err("Failed to check note tag")?
    {
        let outcome = ActionOutcome {
            changed: false,
            message: "Note already has this tag".to_string(),
        };
        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(outcome))).into_response());
    }

    let log = NoteLog::record(
        &note.id,
        &principal.id,
        LogAction::Tagged,
        json!({"tag": tag.id, "name": tag.name}),
    );
    store
        .add_note_tag(&note.id, &tag.id, &log)
        .api_err("Failed to tag note")?;

    let outcome = ActionOutcome {
        changed: true,
        message: "Success".to_string(),
    };
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)).into_response())
}

pub async fn remove_note_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let note = store
        .get_note(&id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")?;

    require_access(
        store,
        principal,
        Some(&note.space_id),
        rule_for(Resource::Note, Action::Update),
    )?;

    let tag = store
        .get_tag(&tag_id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    if !store
        .note_has_tag(&note.id, &tag.id)
        .api_err("Failed to check note tag")?
    {
        let outcome = ActionOutcome {
            changed: false,
            message: "Note does not have this tag".to_string(),
        };
        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(outcome))).into_response());
    }

    let log = NoteLog::record(
        &note.id,
        &principal.id,
        LogAction::Untagged,
        json!({"tag": tag.id, "name": tag.name}),
    );
    store
        .remove_note_tag(&note.id, &tag.id, &log)
        .api_err("Failed to untag note")?;

    let outcome = ActionOutcome {
        changed: true,
        message: "Success".to_string(),
    };
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)).into_response())
}
