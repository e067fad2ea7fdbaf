use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use quill::auth::TokenGenerator;
use quill::config::ServerConfig;
use quill::error::Error;
use quill::server::{AppState, create_router};
use quill::store::{SqliteStore, Store};
use quill::types::{Token, User};

fn create_token(
    generator: &TokenGenerator,
    user_id: String,
    expires_in_seconds: Option<i64>,
) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id,
        created_at: Utc::now(),
        expires_at: expires_in_seconds.map(|s| Utc::now() + Duration::seconds(s)),
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "A note-taking server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Optional TOML config file; command-line flags override it
        #[arg(long)]
        config: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the database and create the first (admin) user
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email address of the admin user
        #[arg(long)]
        email: String,

        /// Display name of the admin user
        #[arg(long)]
        fullname: String,
    },

    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Token management
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    New {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        fullname: String,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Mint an access token for an existing user
    New {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email address of the token's user
        #[arg(long)]
        email: String,

        /// Token lifetime in seconds (never expires if omitted)
        #[arg(long)]
        expires_in_seconds: Option<i64>,
    },
}

fn open_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let dir = PathBuf::from(data_dir);
    fs::create_dir_all(&dir)?;
    let store = SqliteStore::new(dir.join("quill.db"))?;
    store.initialize()?;
    Ok(store)
}

fn new_user(email: &str, fullname: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        fullname: fullname.to_string(),
        is_staff: false,
        is_superuser: false,
        extras: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

fn admin_init(data_dir: &str, email: &str, fullname: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;

    if !store.list_users("", 1)?.is_empty() {
        bail!("database is already initialized; use `quill admin user new` to add users");
    }

    // The first user comes out of the store staff + superuser.
    let user = store.create_user(&new_user(email, fullname))?;

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_token(&generator, user.id.clone(), None)?;
    store.create_token(&token)?;

    let token_path = PathBuf::from(data_dir).join(".admin_token");
    fs::write(&token_path, format!("{raw_token}\n"))?;
    #[cfg(unix)]
    set_restrictive_permissions(&token_path);

    println!("Created admin user {} ({})", user.fullname, user.email);
    println!("Admin token (also saved to {}):", token_path.display());
    println!("{raw_token}");
    Ok(())
}

fn admin_user_new(data_dir: &str, email: &str, fullname: &str) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;

    let user = match store.create_user(&new_user(email, fullname)) {
        Ok(user) => user,
        Err(Error::AlreadyExists) => bail!("a user with email {email} already exists"),
        Err(e) => return Err(e.into()),
    };

    println!("Created user {} ({})", user.fullname, user.email);
    println!("id: {}", user.id);
    Ok(())
}

fn admin_token_new(
    data_dir: &str,
    email: &str,
    expires_in_seconds: Option<i64>,
) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;

    let Some(user) = store.get_user_by_email(email)? else {
        bail!("no user with email {email}");
    };

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_token(&generator, user.id, expires_in_seconds)?;
    store.create_token(&token)?;

    println!("{raw_token}");
    Ok(())
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
    config: Option<String>,
) -> anyhow::Result<()> {
    let base = match config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    let config = ServerConfig {
        host: host.unwrap_or(base.host),
        port: port.unwrap_or(base.port),
        data_dir: data_dir.map(PathBuf::from).unwrap_or(base.data_dir),
    };

    fs::create_dir_all(&config.data_dir)?;
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let state = Arc::new(AppState::new(Arc::new(store), config.data_dir.clone()));
    let router = create_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                fullname,
            } => admin_init(&data_dir, &email, &fullname),
            AdminCommands::User { command } => match command {
                UserCommands::New {
                    data_dir,
                    email,
                    fullname,
                } => admin_user_new(&data_dir, &email, &fullname),
            },
            AdminCommands::Token { command } => match command {
                TokenCommands::New {
                    data_dir,
                    email,
                    expires_in_seconds,
                } => admin_token_new(&data_dir, &email, expires_in_seconds),
            },
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
        } => serve(host, port, data_dir, config).await,
    }
}
