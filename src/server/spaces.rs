use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{CreateSpaceRequest, PaginationParams, UpdateSpaceRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_space_name;
use crate::types::{Member, NoteSpace, Role, SpaceKind};

use super::access::{Action, Resource, require_access, rule_for};

pub async fn list_spaces(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    require_access(store, principal, None, rule_for(Resource::Space, Action::List))?;

    let spaces = store
        .list_spaces(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list note spaces")?;

    let (spaces, next_cursor, has_more) =
        paginate(spaces, DEFAULT_PAGE_SIZE as usize, |s| s.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(spaces, next_cursor, has_more)))
}

pub async fn create_space(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSpaceRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    require_access(
        store,
        principal,
        None,
        rule_for(Resource::Space, Action::Create),
    )?;

    validate_space_name(&req.name)?;

    let now = Utc::now();
    let space = NoteSpace {
        id: Uuid::new_v4().to_string(),
        kind: req.kind.unwrap_or(SpaceKind::Personal),
        name: req.name,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };
    // The creator becomes Owner in the same transaction; a space never
    // exists without its owner membership.
    let owner = Member {
        id: Uuid::new_v4().to_string(),
        space_id: space.id.clone(),
        user_id: principal.id.clone(),
        role: Role::Owner,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };

    store
        .create_space(&space, &owner)
        .api_err("Failed to create note space")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(space))))
}

pub async fn get_space(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let space = store
        .get_space(&id)
        .api_err("Failed to get note space")?
        .or_not_found("Note space not found")?;

    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Space, Action::Retrieve),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(space)))
}

pub async fn update_space(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSpaceRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let mut space = store
        .get_space(&id)
        .api_err("Failed to get note space")?
        .or_not_found("Note space not found")?;

    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Space, Action::Update),
    )?;

    if let Some(name) = req.name {
        validate_space_name(&name)?;
        space.name = name;
    }
    space.updated_at = Utc::now();

    store
        .update_space(&space)
        .api_err("Failed to update note space")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(space)))
}

pub async fn delete_space(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let space = store
        .get_space(&id)
        .api_err("Failed to get note space")?
        .or_not_found("Note space not found")?;

    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Space, Action::Delete),
    )?;

    // Members, tags, notes, and note logs go with the space.
    store
        .delete_space(&space.id)
        .api_err("Failed to delete note space")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
