use std::path::PathBuf;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use fintrack_core::{ChatController, Config, Level, sanitize};

mod app;
mod clipboard;
mod handler;
mod markdown;
mod picker;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "fintrack")]
#[command(version, about = "Chat with a financial report PDF through a document backend")]
struct Cli {
    /// Backend base URL (overrides config file and FINTRACK_BACKEND_URL)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Seconds to wait for a document to be processed
    #[arg(long, global = true)]
    upload_timeout: Option<u64>,

    /// Preselect a PDF to process
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a PDF and ask questions without the interface
    Ask {
        /// PDF to process
        #[arg(short, long)]
        file: PathBuf,
        /// Questions, asked in order within one conversation
        #[arg(required = true)]
        questions: Vec<String>,
    },
    /// Show the configuration file path and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = match cli.command {
        None => init_file_logging(),
        Some(_) => {
            init_stderr_logging();
            None
        }
    };

    let mut config = load_config();
    config.apply_env();
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }
    if let Some(secs) = cli.upload_timeout {
        config.upload_timeout_secs = secs;
    }

    match cli.command {
        None => run_tui(&config, cli.file).await,
        Some(Commands::Ask { file, questions }) => run_ask(&config, file, &questions).await,
        Some(Commands::Config) => show_config(&config),
    }
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "could not read config file, using defaults");
            Config::new()
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The terminal belongs to the interface, so its logs go to a daily file.
fn init_file_logging() -> Option<WorkerGuard> {
    let log_dir = dirs::data_local_dir()?.join("fintrack").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(log_dir, "fintrack.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

async fn run_tui(config: &Config, file: Option<PathBuf>) -> Result<()> {
    tracing::info!(backend = %config.backend_url, "starting interface");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(config, file);
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn run_ask(config: &Config, file: PathBuf, questions: &[String]) -> Result<()> {
    let mut controller = ChatController::new(std::sync::Arc::new(config.client()));
    controller.upload.select(file);

    if !controller.upload().await {
        bail!("{}", last_error(&controller).unwrap_or("upload failed"));
    }

    for question in questions {
        match controller.ask(question).await {
            Some(answer) => {
                println!("> {}\n", question.trim());
                println!("{}\n", sanitize::for_display(&answer));
            }
            None => bail!("{}", last_error(&controller).unwrap_or("question failed")),
        }
    }
    Ok(())
}

fn last_error<B: ?Sized>(controller: &ChatController<B>) -> Option<&str> {
    controller
        .notifications
        .latest()
        .filter(|note| note.level == Level::Error)
        .map(|note| note.description.as_str())
}

fn show_config(config: &Config) -> Result<()> {
    println!("config file:     {}", Config::get_config_path()?.display());
    println!("backend_url:     {}", config.backend_url);
    println!("upload_timeout:  {}s", config.upload_timeout_secs);
    match config.chat_timeout_secs {
        Some(secs) => println!("chat_timeout:    {secs}s"),
        None => println!("chat_timeout:    none"),
    }
    if let Some(dir) = &config.last_directory {
        println!("last_directory:  {}", dir.display());
    }
    Ok(())
}
