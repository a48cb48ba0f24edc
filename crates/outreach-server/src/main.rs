//! outreach-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `OUTREACH_*`
//! environment variables, opens the SQLite store, and serves the JSON API
//! under `/api`.
//!
//! # Seeding a demo user
//!
//! ```text
//! cargo run -p outreach-server -- create-user --name Demo --email demo@example.com
//! ```
//!
//! prints the new user's id, suitable for `demo_user_id`.
//!
//! ```text
//! cargo run -p outreach-server -- seed --user-id <id>
//! ```
//!
//! fills that user's account with demo campaigns and leads.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use outreach_core::{store::OutreachStore as _, user::NewUser};
use outreach_server::ServerConfig;
use outreach_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Outreach campaign tracker server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Create an email/password user and print its id. The password is read
  /// from stdin.
  CreateUser {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    email: String,
  },
  /// Create demo campaigns and leads owned by an existing user.
  Seed {
    #[arg(long)]
    user_id: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::CreateUser { name, email } => create_user(&store, name, email).await,
    Command::Seed { user_id } => {
      let summary = outreach_server::seed::seed_demo_data(&store, &user_id)
        .await
        .context("failed to seed demo data")?;
      println!("seeded {} campaigns and {} leads", summary.campaigns, summary.leads);
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  if server_cfg.demo_mode {
    tracing::warn!(
      demo_user_id = server_cfg.demo_user_id.as_deref().unwrap_or_default(),
      "demo mode enabled: unauthenticated requests act as the demo user"
    );
  }

  let app = outreach_server::app(Arc::new(store), server_cfg);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

async fn create_user(store: &SqliteStore, name: String, email: String) -> anyhow::Result<()> {
  let password = read_password()?;
  if password.chars().count() < outreach_api::auth::MIN_PASSWORD_LEN {
    anyhow::bail!(
      "password must be at least {} characters",
      outreach_api::auth::MIN_PASSWORD_LEN
    );
  }
  let password_hash =
    outreach_api::auth::hash_password(&password).context("failed to hash password")?;

  let user = store
    .create_user(NewUser { name, email, password_hash })
    .await
    .map_err(outreach_core::Error::from)
    .context("failed to create user")?;

  println!("{}", user.id);
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
    _ = terminate => tracing::info!("received SIGTERM, shutting down"),
  }
}
