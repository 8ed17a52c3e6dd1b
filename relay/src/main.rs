use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::time::{self, Duration};
use tracing_subscriber::EnvFilter;

use marketdesk_models::CronResponse;

const CRON_PATH: &str = "/api/intelligence-desk/cron";
const CRON_SECRET_HEADER: &str = "x-cron-secret";

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "marketdesk-relay",
    about = "Triggers scheduled MarketDesk intelligence reports"
)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, env = "MARKETDESK_RELAY_CONFIG")]
    config: PathBuf,

    /// Trigger once then exit (for system cron)
    #[arg(long)]
    once: bool,
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Config {
    server: ServerConfig,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    url: String,
    secret_file: PathBuf,
    #[serde(default = "default_interval")]
    interval_secs: u64,
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
}

fn default_interval() -> u64 {
    3600
}
fn default_timeout() -> u64 {
    120
}

#[derive(Debug, thiserror::Error)]
enum RelayError {
    #[error("can't read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("secret file '{0}' is empty")]
    EmptySecret(String),

    #[error("interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Config with the secret loaded and validated.
#[derive(Debug)]
struct Relay {
    cron_url: String,
    secret: String,
    interval: Duration,
    timeout: Duration,
}

impl Relay {
    fn load(path: &Path) -> Result<Self, RelayError> {
        let text = read(path)?;
        let config: Config = toml::from_str(&text)?;
        Self::from_config(&config.server)
    }

    fn from_config(server: &ServerConfig) -> Result<Self, RelayError> {
        let secret = read(&server.secret_file)?.trim().to_string();
        if secret.is_empty() {
            return Err(RelayError::EmptySecret(
                server.secret_file.display().to_string(),
            ));
        }
        if server.interval_secs == 0 {
            return Err(RelayError::ZeroInterval);
        }

        Ok(Self {
            cron_url: format!("{}{}", server.url.trim_end_matches('/'), CRON_PATH),
            secret,
            interval: Duration::from_secs(server.interval_secs),
            timeout: Duration::from_secs(server.timeout_secs),
        })
    }
}

fn read(path: &Path) -> Result<String, RelayError> {
    std::fs::read_to_string(path).map_err(|source| RelayError::Read {
        path: path.display().to_string(),
        source,
    })
}

// ── Core logic ──────────────────────────────────────────────────────

async fn trigger(client: &reqwest::Client, relay: &Relay) -> Result<CronResponse, RelayError> {
    let resp = client
        .get(&relay.cron_url)
        .header(CRON_SECRET_HEADER, &relay.secret)
        .timeout(relay.timeout)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RelayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

async fn trigger_and_log(client: &reqwest::Client, relay: &Relay) -> bool {
    match trigger(client, relay).await {
        Ok(done) => {
            tracing::info!(generated_at = %done.generated_at, "scheduled report generated");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "cron trigger failed");
            false
        }
    }
}

async fn run_loop(relay: Relay) {
    let client = reqwest::Client::new();
    let mut interval = time::interval(relay.interval);
    // First tick fires immediately
    loop {
        interval.tick().await;
        trigger_and_log(&client, &relay).await;
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marketdesk_relay=info")),
        )
        .init();

    let cli = Cli::parse();

    let relay = match Relay::load(&cli.config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(config = %cli.config.display(), error = %e, "config error");
            return ExitCode::FAILURE;
        }
    };

    // --once mode: a single trigger, exit status reflects the outcome
    if cli.once {
        let client = reqwest::Client::new();
        return if trigger_and_log(&client, &relay).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    tracing::info!(
        url = %relay.cron_url,
        interval_secs = relay.interval.as_secs(),
        "relay started"
    );
    tokio::select! {
        _ = run_loop(relay) => {}
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => tracing::info!("shutting down"),
            Err(e) => tracing::error!(error = %e, "signal handler error"),
        },
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn secret_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn server(url: &str, secret: &Path) -> ServerConfig {
        let text = format!(
            "[server]\nurl = \"{url}\"\nsecret_file = \"{}\"\n",
            secret.display()
        );
        toml::from_str::<Config>(&text).unwrap().server
    }

    #[test]
    fn defaults_and_trimmed_secret() {
        let secret = secret_file("  s3cret\n");
        let cfg = server("http://localhost:8080/", secret.path());
        assert_eq!(cfg.interval_secs, 3600);
        assert_eq!(cfg.timeout_secs, 120);

        let relay = Relay::from_config(&cfg).unwrap();
        assert_eq!(
            relay.cron_url,
            "http://localhost:8080/api/intelligence-desk/cron"
        );
        assert_eq!(relay.secret, "s3cret");
        assert_eq!(relay.interval, Duration::from_secs(3600));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let secret = secret_file("   \n");
        let cfg = server("http://localhost:8080", secret.path());
        assert!(matches!(
            Relay::from_config(&cfg),
            Err(RelayError::EmptySecret(_))
        ));
    }

    #[test]
    fn missing_secret_file_is_rejected() {
        let cfg = ServerConfig {
            url: "http://localhost:8080".into(),
            secret_file: PathBuf::from("/nonexistent/marketdesk/cron.secret"),
            interval_secs: 60,
            timeout_secs: 5,
        };
        assert!(matches!(Relay::from_config(&cfg), Err(RelayError::Read { .. })));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let secret = secret_file("s3cret");
        let mut cfg = server("http://localhost:8080", secret.path());
        cfg.interval_secs = 0;
        assert!(matches!(
            Relay::from_config(&cfg),
            Err(RelayError::ZeroInterval)
        ));
    }

    #[test]
    fn server_section_is_required() {
        assert!(toml::from_str::<Config>("[other]\nurl = \"x\"").is_err());
    }
}
