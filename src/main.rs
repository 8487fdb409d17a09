use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdf_learning_assistant::cli::{Cli, Command, run_extract_command};
use pdf_learning_assistant::config::Config;
use pdf_learning_assistant::llm::GeminiClient;
use pdf_learning_assistant::media::PdfExtractor;
use pdf_learning_assistant::session::{PruningConfig, SessionStore};
use pdf_learning_assistant::web::{self, AppState, WebServer};
use pdf_learning_assistant::wizard::Controller;

const DEFAULT_LOG_FILTER: &str = "pdf_learning_assistant=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before parsing so clap's `env` fallbacks see .env values.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing();

    match cli.command() {
        Command::Extract { file } => run_extract_command(&file),
        Command::Serve { bind } => serve(bind).await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("QUIZ_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(addr) = bind {
        config.bind_addr = addr;
    }

    let client = GeminiClient::from_config(&config)?;
    let extractor = PdfExtractor::new().with_max_bytes(config.max_upload_bytes);
    let controller = Controller::new(Arc::new(extractor), Arc::new(client), config.model.clone());

    let sessions = SessionStore::new(PruningConfig::with_max_idle(config.session_idle_timeout));
    let pruner = sessions.spawn_pruner();

    tracing::info!(model = %config.model, "Starting PDF Learning Assistant");
    let app = web::router(AppState::new(controller, sessions), config.max_upload_bytes);
    let mut server = WebServer::new(config.bind_addr, app);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    pruner.abort();
    Ok(())
}
