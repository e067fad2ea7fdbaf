use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use quill::auth::TokenGenerator;
use quill::server::{AppState, create_router};
use quill::store::{SqliteStore, Store};
use quill::types::{Token, User};

/// An in-process server on an ephemeral port, backed by a scratch
/// database that lives as long as the struct.
pub struct TestServer {
    _temp_dir: TempDir,
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    pub admin: User,
    pub admin_token: String,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store =
            Arc::new(SqliteStore::new(temp_dir.path().join("quill.db")).expect("open store"));
        store.initialize().expect("initialize store");

        // The first user created bootstraps as staff + superuser.
        let (admin, admin_token) =
            create_user_with_token(store.as_ref(), "admin@example.com", "Admin");

        let state = Arc::new(AppState::new(
            store.clone(),
            temp_dir.path().to_path_buf(),
        ));
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        Self {
            _temp_dir: temp_dir,
            base_url: format!("http://{addr}"),
            store,
            admin,
            admin_token,
        }
    }

    /// Creates a user directly in the store and mints a token for them.
    /// User creation is not exposed over HTTP, so fixtures go this way.
    pub fn create_user(&self, email: &str, fullname: &str) -> (User, String) {
        create_user_with_token(self.store.as_ref(), email, fullname)
    }
}

pub fn create_user_with_token(store: &dyn Store, email: &str, fullname: &str) -> (User, String) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        fullname: fullname.to_string(),
        is_staff: false,
        is_superuser: false,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };
    let user = store.create_user(&user).expect("create user");

    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator.generate().expect("generate token");
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: now,
        expires_at: None,
        last_used_at: None,
    };
    store.create_token(&token).expect("create token");

    (user, raw_token)
}
