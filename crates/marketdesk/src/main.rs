use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use marketdesk::app;
use marketdesk::config::DeskConfig;
use marketdesk::models::{CreateProfile, Role};
use marketdesk::storage::sqlite::SqliteBackend;
use marketdesk::storage::ProfileStore;

#[derive(Parser)]
#[command(
    name = "marketdesk",
    about = "Marketing operations backend with an LLM intelligence desk"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, env = "MARKETDESK_DB", default_value = "marketdesk.db")]
        db: String,
    },
    /// Initialize the database
    Init {
        #[arg(long, env = "MARKETDESK_DB", default_value = "marketdesk.db")]
        db: String,
    },
    /// Create a profile and print a session token for it
    AddProfile {
        #[arg(long, env = "MARKETDESK_DB", default_value = "marketdesk.db")]
        db: String,
        #[arg(long)]
        email: String,
        /// cmo, manager or member
        #[arg(long, default_value = "member", value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        name: Option<String>,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::from_str(&raw.trim().to_lowercase())
        .ok_or_else(|| format!("unknown role '{raw}' (expected cmo, manager or member)"))
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marketdesk=info,tower_http=warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, db } => {
            let mut config = DeskConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }
            if let Err(e) = app::run_server(config, &db).await {
                tracing::error!(error = %e, "server stopped with an error");
                return ExitCode::FAILURE;
            }
        }
        Commands::Init { db } => match marketdesk::db::init_db(&db) {
            Ok(_) => tracing::info!(db = %db, "database initialized"),
            Err(e) => {
                tracing::error!(db = %db, error = %e, "failed to initialize database");
                return ExitCode::FAILURE;
            }
        },
        Commands::AddProfile {
            db,
            email,
            role,
            name,
        } => {
            let result = SqliteBackend::open(&db).and_then(|storage| {
                let profile = storage.create_profile(&CreateProfile {
                    email,
                    display_name: name,
                    role,
                })?;
                let token = storage.create_session(&profile.id)?;
                Ok((profile, token))
            });
            match result {
                Ok((profile, token)) => {
                    tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "profile created");
                    // The token is only shown once.
                    println!("{token}");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to create profile");
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    ExitCode::SUCCESS
}
