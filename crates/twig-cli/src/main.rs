mod attach;
mod command;
mod render;
mod repl;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use twig_app::AppConfig;
use twig_core::ChatSession;
use twig_llm_openai::OpenAIConfig;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "twig", version, about = "Branching chat in the terminal.")]
struct Cli {
    /// Model id sent with every request.
    #[arg(long, env = "TWIG_MODEL")]
    model: Option<String>,

    /// Chat Completions compatible endpoint, e.g. http://localhost:11434/v1.
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// System prompt the conversation starts with.
    #[arg(long)]
    system: Option<String>,

    /// Config file to use instead of the one in the user config directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `twig_core=debug`. Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            system_prompt: self.system.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `.env` has to be loaded before clap reads env-backed flags.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing(cli.log.as_deref())?;

    let file = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let config = file.merge(cli.overrides());

    let mut openai = OpenAIConfig::from_env();
    if let Some(base_url) = &config.base_url {
        openai.base_url = base_url.clone();
    }
    if let Some(timeout) = config.request_timeout() {
        openai.timeout = timeout;
    }
    if openai.api_key.is_empty() {
        tracing::info!("OPENAI_API_KEY is not set; sending requests without authorization");
    }

    let model = twig_llm_openai::model(openai, config.model_id())?;
    tracing::info!(model = model.model_id(), "starting session");
    let session = ChatSession::new(model, config.session_config());

    repl::run(&session).await
}

fn init_tracing(filter: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match filter {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}
