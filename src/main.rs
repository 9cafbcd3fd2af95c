use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use verisolve::api::{self, AppState, ServiceInfo};
use verisolve::banner::{format_outcome, format_usage, print_banner};
use verisolve::client::ollama::OllamaClient;
use verisolve::config::{Config, ConfigArgs, ServerArgs};
use verisolve::engine::repair::RepairEngine;
use verisolve::engine::{Engine, SolveRequest, solve_or_cancel};
use verisolve::spinner::Spinner;

#[derive(Parser)]
#[command(name = "verisolve", version, about = "Solve, self-verify, and repair with a local model.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    server: ServerArgs,

    /// Open the page in a browser once listening
    #[arg(long, global = true, default_value_t = false)]
    open: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web form and JSON API (default)
    Serve,
    /// Solve one question in the terminal and exit
    Solve {
        /// One of mcq, numeric, proof_outline, short_answer
        #[arg(short = 'k', long)]
        task_type: String,

        /// Print the full outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// The question text
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Some(Command::Solve { .. }) => "verisolve=warn",
        _ => "verisolve=info,tower_http=info",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.into_config().context("invalid configuration")?;

    match cli.command {
        Some(Command::Solve {
            task_type,
            json,
            question,
        }) => run_once(config, &task_type, question, json).await,
        Some(Command::Serve) | None => run_server(config, cli.server, cli.open).await,
    }
}

async fn run_server(config: Config, server: ServerArgs, open_browser: bool) -> anyhow::Result<()> {
    let client = Arc::new(OllamaClient::new(&config));
    match client.health().await {
        Ok(()) => tracing::info!("Backend reachable at {}", config.endpoint),
        Err(e) => tracing::warn!(
            "Backend check failed: {}. Requests will fail until it is reachable.",
            e
        ),
    }

    let info = ServiceInfo::from(&config);
    let engine: Arc<dyn Engine> = Arc::new(RepairEngine::new(client, config.clone()));
    let state = Arc::new(AppState::new(engine, info));

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let url = format!("http://{}", listener.local_addr()?);

    print_banner(&config, &url);

    if open_browser {
        // Headless machines have no browser; the URL is in the banner anyway.
        if let Err(e) = open::that(&url) {
            tracing::warn!("could not open browser: {}", e);
        }
    }

    api::serve(listener, state).await
}

async fn run_once(config: Config, task_type: &str, question: String, json: bool) -> anyhow::Result<()> {
    let request = SolveRequest::from_parts(task_type, question)?;
    let engine = RepairEngine::new(Arc::new(OllamaClient::new(&config)), config);

    let spinner = Spinner::start("solving");
    let result = solve_or_cancel(&engine, &request, ctrl_c()).await;
    spinner.stop().await;

    let Some(result) = result else {
        anyhow::bail!("interrupted");
    };
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", format_outcome(&outcome));
        if let Some(line) = format_usage(outcome.usage) {
            eprintln!("{line}");
        }
    }
    Ok(())
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
