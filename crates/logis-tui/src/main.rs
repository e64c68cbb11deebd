use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use logis_core::{Config, ConversationState, LogisClient, SendOutcome, SessionController};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "logis")]
#[command(about = "Terminal client for the Logis stock and pricing assistant")]
struct Cli {
    /// Base URL of the Logis API (overrides LOGIS_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where to write logs while the TUI is running
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the exchange
    Ask {
        /// Your question
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Check whether the API is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_else(|_| Config::new());
    let log_filter = config.log_filter.clone();

    match &cli.command {
        None => {
            let path = logging::init_file(log_filter.as_deref(), cli.log_file.clone())?;
            tracing::info!(log_file = %path.display(), "starting logis");
        }
        Some(_) => logging::init_stderr(log_filter.as_deref()),
    }
    if let Err(err) = &loaded {
        tracing::warn!(error = %err, "could not load config, using defaults");
    }

    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let client = LogisClient::new(&api_url)
        .with_health_timeout(config.health_timeout())
        .with_chat_timeout(config.chat_timeout());

    match cli.command {
        None => run_tui(client, api_url).await.map(|()| ExitCode::SUCCESS),
        Some(Commands::Ask { question }) => run_ask(client, &question.join(" "))
            .await
            .map(|()| ExitCode::SUCCESS),
        Some(Commands::Health) => run_health(client, &api_url).await,
    }
}

async fn run_tui(client: LogisClient, api_url: String) -> Result<()> {
    let (controller, _probe) = SessionController::start(client);
    let mut app = App::new(controller, api_url);
    let mut events = tui::EventHandler::new(app.controller.subscribe());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    events: &mut tui::EventHandler,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn run_ask(client: LogisClient, question: &str) -> Result<()> {
    let (controller, _probe) = SessionController::start(client);

    if let SendOutcome::Rejected(reason) = controller.send(Some(question)).await {
        bail!("question not sent: {:?}", reason);
    }

    for turn in controller.snapshot().turns() {
        println!("[{}] {}:", turn.time_label(), turn.role().display_name());
        println!("{}\n", turn.content());
    }
    Ok(())
}

fn health_summary(state: &ConversationState, api_url: &str) -> String {
    match (state.connected(), state.product_count()) {
        (true, Some(count)) => format!("API activa ({} productos) - {}", count, api_url),
        (true, None) => format!("API activa - {}", api_url),
        (false, _) => format!("Sin conexión - {}", api_url),
    }
}

/// Exit status is a failure when the API can't be reached.
async fn run_health(client: LogisClient, api_url: &str) -> Result<ExitCode> {
    let (controller, probe) = SessionController::start(client);
    let connected = probe.await?;

    println!("{}", health_summary(&controller.snapshot(), api_url));
    Ok(if connected { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
