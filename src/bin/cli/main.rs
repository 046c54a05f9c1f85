mod commands;
mod output;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use output::{OutputConfig, OutputFormat};
use studyflow::StudyEngine;
use studyflow::config::{self, CliArgs};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Adaptive study planner
#[derive(Parser, Debug)]
#[clap(name = "studyflow", about = "Plan, track and adapt study sessions")]
struct Cli {
    #[command(flatten)]
    config: CliArgs,

    /// Acting user; defaults to the login name
    #[clap(long, env = "STUDYFLOW_USER", global = true)]
    user: Option<String>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Quiet mode: minimal output (just IDs)
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage events and their plans
    #[command(subcommand)]
    Event(commands::event::EventCommands),
    /// Run study sessions
    #[command(subcommand)]
    Session(commands::session::SessionCommands),
    /// Emotional check-ins
    #[command(subcommand)]
    Mood(commands::mood::MoodCommands),
    /// Diagnostic tests
    #[command(subcommand)]
    Diagnostic(commands::diagnostic::DiagnosticCommands),
    /// Review plan adjustment suggestions
    #[command(subcommand)]
    Suggestion(commands::suggestion::SuggestionCommands),
    /// Daily capacity and focus mode
    #[command(subcommand)]
    Prefs(commands::prefs::PrefsCommands),
}

/// Installs the tracing subscriber
///
/// Logs go to stderr so stdout stays parseable. With a log directory, a
/// daily rolling JSON file is written as well; the returned guard flushes it.
fn init_tracing(debug: bool, json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "studyflow=debug" } else { "warn" }));

    let stderr_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "studyflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn resolve_user(cli_user: Option<String>) -> String {
    cli_user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "default".to_string())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = config::get_config(cli.config.clone());
    let _guard = init_tracing(
        cli.config.debug,
        cli.format == OutputFormat::Json,
        config.log_dir.as_deref(),
    );

    let engine = match StudyEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };
    let user = resolve_user(cli.user);
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Event(cmd) => commands::event::execute(&engine, &user, cmd, &output_config).await,
        Commands::Session(cmd) => commands::session::execute(&engine, &user, cmd, &output_config).await,
        Commands::Mood(cmd) => commands::mood::execute(&engine, &user, cmd, &output_config).await,
        Commands::Diagnostic(cmd) => commands::diagnostic::execute(&engine, &user, cmd, &output_config).await,
        Commands::Suggestion(cmd) => commands::suggestion::execute(&engine, &user, cmd, &output_config).await,
        Commands::Prefs(cmd) => commands::prefs::execute(&engine, &user, cmd, &output_config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
