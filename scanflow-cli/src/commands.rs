//! Command handlers.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use scanflow::artifacts::ArtifactResolver;
use scanflow::cancellation::CancellationToken;
use scanflow::config::ScanConfig;
use scanflow::pipeline::{scan_pipeline, PipelineRun, PipelineRunner};
use scanflow::process::ShellExecutor;
use scanflow::server::ServerController;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands, ServerCommands};
use crate::console::ConsoleListener;

/// Routes the command to its handler.
pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Scan { targets } => scan(&config, &targets, cli.json).await,
        Commands::Server { command } => server(&config, command, cli.json).await,
        Commands::Paths { target } => paths(&config, &target, cli.json),
    }
}

fn load_config(cli: &Cli) -> Result<ScanConfig> {
    let config = match &cli.config {
        Some(path) => ScanConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ScanConfig::default(),
    };
    let mut config = config
        .apply_env()
        .context("invalid SCANFLOW_* environment override")?;
    if let Some(root) = &cli.workspace {
        config = config.with_workspace_root(root);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Runner with a shared cancellation token wired to Ctrl-C.
fn runner(config: &ScanConfig) -> PipelineRunner {
    let token = Arc::new(CancellationToken::new());
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_signal.cancel("interrupted");
        }
    });

    PipelineRunner::from_config(Arc::new(ShellExecutor::default()), config)
        .with_cancellation(token)
}

async fn scan(config: &ScanConfig, targets: &[String], json: bool) -> Result<()> {
    let pipeline = scan_pipeline(config).context("invalid scan pipeline")?;
    let base = runner(config);

    let runs = join_all(targets.iter().map(|target| {
        let runner = base
            .clone()
            .with_listener(Arc::new(ConsoleListener::new(target.clone())));
        let pipeline = &pipeline;
        async move {
            runner
                .run(target, pipeline)
                .await
                .with_context(|| format!("scan of '{target}' could not run"))
        }
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<PipelineRun>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
    } else {
        for run in &runs {
            print_summary(run);
        }
    }

    let failed: Vec<&str> = runs
        .iter()
        .filter(|run| !run.is_success())
        .map(|run| run.target.as_str())
        .collect();
    if !failed.is_empty() {
        bail!("scan failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn print_summary(run: &PipelineRun) {
    println!("{} [{}] ({:.0} ms)", run.target, run.status, run.duration_ms);
    for path in run.artifacts() {
        println!("  artifact: {}", path.display());
    }
    for warning in run.warnings() {
        println!("  warning: {warning}");
    }
    if let Some(err) = run.terminal_error() {
        println!("  error: {err}");
    }
}

async fn server(config: &ScanConfig, command: ServerCommands, json: bool) -> Result<()> {
    let controller = ServerController::new(Arc::new(runner(config)), config)
        .context("invalid server stages")?;

    match command {
        ServerCommands::Start => {
            let session = controller
                .start()
                .await
                .context("failed to start server")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                println!("Server running on port {}", session.port);
            }
        }
        ServerCommands::Stop => {
            controller
                .stop(None)
                .await
                .context("failed to stop server")?;
            if !json {
                println!("Server stopped");
            }
        }
    }
    Ok(())
}

fn paths(config: &ScanConfig, target: &str, json: bool) -> Result<()> {
    let set = ArtifactResolver::from_config(config).paths_for(target)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        println!("fragment: {}", set.fragment);
        println!("markdown: {}", set.markdown.display());
        println!("audit:    {}", set.audit_json.display());
        println!("html:     {}", set.html.display());
    }
    Ok(())
}
