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
use crate::server::dto::{CreateTagRequest, SpaceScopedParams, UpdateTagRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_tag_name;
use crate::types::Tag;

use super::access::{Action, Resource, require_access, resolve_space, rule_for};

pub async fn list_tags(
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
        rule_for(Resource::Tag, Action::List),
    )?;

    let tags = store
        .list_tags(&space.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tags")?;

    let (tags, next_cursor, has_more) =
        paginate(tags, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(tags, next_cursor, has_more)))
}

pub async fn create_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let space = resolve_space(store, req.notespace.as_deref())?;
    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Tag, Action::Create),
    )?;

    validate_tag_name(&req.name)?;

    if store
        .get_tag_by_name(&space.id, &req.name)
        .api_err("Failed to check tag")?
        .is_some()
    {
        return Err(ApiError::conflict("Tag already exists"));
    }

    let now = Utc::now();
    let tag = Tag {
        id: Uuid::new_v4().to_string(),
        space_id: space.id,
        name: req.name,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };

    store.create_tag(&tag).api_err("Failed to create tag")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn get_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    require_access(
        store,
        principal,
        Some(&tag.space_id),
        rule_for(Resource::Tag, Action::Retrieve),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tag)))
}

pub async fn update_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTagRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let mut tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    require_access(
        store,
        principal,
        Some(&tag.space_id),
        rule_for(Resource::Tag, Action::Update),
    )?;

    if let Some(name) = req.name {
        validate_tag_name(&name)?;

        if name != tag.name
            && store
                .get_tag_by_name(&tag.space_id, &name)
                .api_err("Failed to check tag name")?
                .is_some()
        {
            return Err(ApiError::conflict("Tag name already exists"));
        }
        tag.name = name;
    }
    tag.updated_at = Utc::now();

    store.update_tag(&tag).api_err("Failed to update tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tag)))
}

pub async fn delete_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    require_access(
        store,
        principal,
        Some(&tag.space_id),
        rule_for(Resource::Tag, Action::Delete),
    )?;

    store.delete_tag(&tag.id).api_err("Failed to delete tag")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
