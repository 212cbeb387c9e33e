use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use hirehelp_bus::EventBus;
use hirehelp_core::{
    ensure_skeleton_config, import_file, load_config, AdoptRequest, Assistant, ChatCommand,
    AdoptionReport, CompanyStore, HireHelpConfig, QuickAction,
};
use hirehelp_provider::{GeminiLiveConnector, GeminiProvider, GenerativeModel, StubProvider};
use hirehelp_server::AppState;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const BUS_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "hirehelp", version, about = "HireHelp onboarding assistant")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.hirehelp",
        help = "Config root directory (contains config/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP API server")]
    Start {
        #[arg(long, help = "HTTP API server port (overrides server.bind)")]
        port: Option<u16>,
    },
    #[command(about = "Local REPL against the configured model")]
    Chat,
    #[command(about = "Validate config/main.yaml")]
    Validate,
    #[command(about = "Preview how a .txt/.md handbook would be adopted")]
    Import {
        #[arg(help = "Handbook file (.txt or .md)")]
        file: PathBuf,
        #[arg(long, help = "Company name (defaults to the name suggested by the file)")]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.config_root = expand_home(cli.config_root, std::env::var_os("HOME"));

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "hirehelp.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config_dir = cli.config_root.join("config");
    match command {
        Commands::Validate => println!("{}", validation_summary(&config_dir)?),
        Commands::Start { port } => {
            if ensure_skeleton_config(&config_dir)? {
                tracing::info!("wrote default config to {}", config_dir.join("main.yaml").display());
            }
            let config = load_config(&config_dir)?;
            let bind = match port {
                Some(port) => format!("0.0.0.0:{port}"),
                None => config.server.bind.clone(),
            };
            let (bus, assistant) = bootstrap(&config);
            let connector = Arc::new(
                GeminiLiveConnector::new(config.api_key().unwrap_or_default())
                    .with_url(&config.gemini.live_url),
            );
            let state = AppState::new(assistant, bus, connector);
            hirehelp_server::serve(state, &bind).await?;
        }
        Commands::Chat => {
            let config = load_config(&config_dir)?;
            let (_bus, assistant) = bootstrap(&config);
            run_repl(&assistant).await?;
        }
        Commands::Import { file, name } => {
            let config = load_config(&config_dir)?;
            run_import(&config, &file, name).await?;
        }
    }

    Ok(())
}

fn expand_home(root: PathBuf, home: Option<OsString>) -> PathBuf {
    match (root.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => root,
    }
}

fn validation_summary(config_dir: &Path) -> Result<String> {
    let config = load_config(config_dir)?;
    Ok(format!(
        "Config valid. chat={}, speech={}, live={}, api key {}.",
        config.gemini.chat_model,
        config.gemini.speech_model,
        config.gemini.live_model,
        if config.api_key().is_some() { "set" } else { "missing" }
    ))
}

fn build_model(config: &HireHelpConfig) -> Arc<dyn GenerativeModel> {
    match config.api_key() {
        Some(key) => Arc::new(
            GeminiProvider::with_timeout(key, Duration::from_secs(config.gemini.timeout_secs))
                .with_base_url(&config.gemini.base_url),
        ),
        None => {
            tracing::warn!("no Gemini API key configured, answers come from the offline stub");
            Arc::new(StubProvider)
        }
    }
}

fn bootstrap(config: &HireHelpConfig) -> (Arc<EventBus>, Arc<Assistant>) {
    let bus = Arc::new(EventBus::new(BUS_CAPACITY));
    let assistant = Arc::new(Assistant::new(
        build_model(config),
        Arc::new(CompanyStore::default()),
        config.assistant_settings(),
        bus.publisher(),
    ));
    (bus, assistant)
}

async fn run_repl(assistant: &Assistant) -> Result<()> {
    println!("hirehelp REPL for {}. Type 'quit' to exit.", assistant.company().name);
    println!("Shortcuts: /quick <it-assets|mentors|security|benefits>, /ask <section number>");
    println!("---");
    if let Some(greeting) = assistant.messages().await.first() {
        println!("{}\n", greeting.content);
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let result = if let Some(id) = input.strip_prefix("/quick ") {
            match QuickAction::from_id(id.trim()) {
                Some(action) => assistant.dispatch(ChatCommand::Quick(action)).await,
                None => {
                    println!("unknown quick action: {id}");
                    continue;
                }
            }
        } else if let Some(n) = input.strip_prefix("/ask ") {
            match n.trim().parse::<usize>() {
                Ok(n) if n > 0 => {
                    assistant
                        .dispatch(ChatCommand::AskHandbook { index: n - 1 })
                        .await
                }
                _ => {
                    println!("expected a section number starting at 1");
                    continue;
                }
            }
        } else {
            assistant.send(input).await
        };

        match result {
            Ok(exchange) => {
                if let Some(reply) = exchange.reply {
                    println!("{}", reply.content);
                    for link in &reply.grounding_links {
                        println!("  [{}]({})", link.title, link.uri);
                    }
                }
            }
            Err(e) => println!("[error] {e}"),
        }
        println!();
    }

    Ok(())
}

async fn run_import(config: &HireHelpConfig, file: &Path, name: Option<String>) -> Result<()> {
    let (_bus, assistant) = bootstrap(config);
    let report = adopt_file(&assistant, file, name).await?;

    println!("Company: {}", report.config.name);
    println!("Handbook: {:?}", report.handbook);
    println!("---");
    print!("{}", serde_yaml::to_string(&report.config.handbook_sections)?);
    Ok(())
}

async fn adopt_file(assistant: &Assistant, file: &Path, name: Option<String>) -> Result<AdoptionReport> {
    let document = import_file(file)?;
    let name = name
        .or(document.suggested_name)
        .ok_or_else(|| anyhow::anyhow!("no company name given and none could be suggested"))?;

    let report = assistant
        .adopt(&AdoptRequest {
            name,
            handbook_text: Some(document.handbook_text),
            holidays_text: None,
        })
        .await?;
    Ok(report)
}
