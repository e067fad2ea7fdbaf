use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use super::{logs, members, notes, spaces, tags, users};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub data_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, data_dir: PathBuf) -> Self {
        Self { store, data_dir }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Users
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::me))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", patch(users::update_user))
        // Note spaces
        .route("/spaces", get(spaces::list_spaces))
        .route("/spaces", post(spaces::create_space))
        .route("/spaces/{id}", get(spaces::get_space))
        .route("/spaces/{id}", patch(spaces::update_space))
        .route("/spaces/{id}", delete(spaces::delete_space))
        // Members
        .route("/members", get(members::list_members))
        .route("/members", post(members::create_member))
        .route("/members/{id}", get(members::get_member))
        .route("/members/{id}", patch(members::update_member))
        .route("/members/{id}", delete(members::delete_member))
        // Tags
        .route("/tags", get(tags::list_tags))
        .route("/tags", post(tags::create_tag))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/tags/{id}", patch(tags::update_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        // Notes
        .route("/notes", get(notes::list_notes))
        .route("/notes", post(notes::create_note))
        .route("/notes/{id}", get(notes::get_note))
        .route("/notes/{id}", patch(notes::update_note))
        .route("/notes/{id}", delete(notes::delete_note))
        // Note flag actions; "delete" moves to the trash, the DELETE
        // verb above is the permanent one
        .route("/notes/{id}/archive", post(notes::archive_note))
        .route("/notes/{id}/unarchive", post(notes::unarchive_note))
        .route("/notes/{id}/pin", post(notes::pin_note))
        .route("/notes/{id}/unpin", post(notes::unpin_note))
        .route("/notes/{id}/delete", post(notes::trash_note))
        .route("/notes/{id}/restore", post(notes::restore_note))
        // Note tags (many-to-many)
        .route("/notes/{id}/tags/{tag_id}", put(notes::add_note_tag))
        .route("/notes/{id}/tags/{tag_id}", delete(notes::remove_note_tag))
        // Note logs (read-only)
        .route("/note-logs", get(logs::list_note_logs))
        .route("/note-logs/{id}", get(logs::get_note_log))
}
