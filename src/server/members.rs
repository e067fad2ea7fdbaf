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
use crate::server::dto::{CreateMemberRequest, SpaceScopedParams, UpdateMemberRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::types::Member;

use super::access::{Action, Resource, require_access, resolve_space, rule_for};

pub async fn list_members(
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
        rule_for(Resource::Member, Action::List),
    )?;

    let members = store
        .list_members(&space.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list members")?;

    let (members, next_cursor, has_more) =
        paginate(members, DEFAULT_PAGE_SIZE as usize, |m| m.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(members, next_cursor, has_more)))
}

pub async fn create_member(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemberRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let space = resolve_space(store, req.notespace.as_deref())?;
    require_access(
        store,
        principal,
        Some(&space.id),
        rule_for(Resource::Member, Action::Create),
    )?;

    let user = store
        .get_user(&req.user)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if store
        .get_member_by_user(&space.id, &user.id)
        .api_err("Failed to check membership")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "User is already a member of this note space",
        ));
    }

    let now = Utc::now();
    let member = Member {
        id: Uuid::new_v4().to_string(),
        space_id: space.id,
        user_id: user.id,
        role: req.role,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };

    store
        .create_member(&member)
        .api_err("Failed to create member")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(member))))
}

pub async fn get_member(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let member = store
        .get_member(&id)
        .api_err("Failed to get member")?
        .or_not_found("Member not found")?;

    require_access(
        store,
        principal,
        Some(&member.space_id),
        rule_for(Resource::Member, Action::Retrieve),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(member)))
}

pub async fn update_member(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMemberRequest>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let mut member = store
        .get_member(&id)
        .api_err("Failed to get member")?
        .or_not_found("Member not found")?;

    require_access(
        store,
        principal,
        Some(&member.space_id),
        rule_for(Resource::Member, Action::Update),
    )?;

    member.role = req.role;
    member.updated_at = Utc::now();

    store
        .update_member(&member)
        .api_err("Failed to update member")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(member)))
}

pub async fn delete_member(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let principal = &auth.principal;
    let store = state.store.as_ref();

    let member = store
        .get_member(&id)
        .api_err("Failed to get member")?
        .or_not_found("Member not found")?;

    require_access(
        store,
        principal,
        Some(&member.space_id),
        rule_for(Resource::Member, Action::Delete),
    )?;

    store
        .delete_member(&member.id)
        .api_err("Failed to delete member")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
