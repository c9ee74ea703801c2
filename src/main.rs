use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use greyflow_core::config::AppConfig;
use greyflow_core::event::EventBus;
use greyflow_core::types::{OperatorRequestKind, WorkflowEvent};
use greyflow_core::WorkflowDocument;

use greyflow_docs::FileRenderer;
use greyflow_engine::{Collaborators, NodeDispatcher, OperatorBroker, RunOutcome, WorkflowExecutor};
use greyflow_http::ApiCaller;

#[derive(Parser)]
#[command(name = "greyflow", version, about = "Run agent workflow graphs from the terminal")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "greyflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow document
    Run {
        /// Workflow file (.gre or .json)
        workflow: PathBuf,
        /// Starting input; input nodes prompt for it when omitted
        #[arg(short, long)]
        input: Option<String>,
        /// Read the starting input from stdin
        #[arg(long, conflicts_with = "input")]
        stdin: bool,
    },
    /// Check a workflow without executing any node
    Validate {
        /// Workflow file (.gre or .json)
        workflow: PathBuf,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("greyflow=info,warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "greyflow", &mut io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Validate { workflow } => {
            let document = load_workflow(&workflow)?;
            let report = greyflow_engine::validate(&document.graph(), &config.engine);
            for issue in &report.issues {
                eprintln!("{}", issue);
            }
            if report.unresolved.is_empty() {
                println!("Processing order: {}", report.order.join(" -> "));
            } else {
                println!("Unresolved nodes: {}", report.unresolved.join(", "));
            }
            if !report.is_runnable() {
                std::process::exit(1);
            }
        }
        Commands::Run {
            workflow,
            input,
            stdin,
        } => {
            let document = load_workflow(&workflow)?;
            let input = match (input, stdin) {
                (Some(text), _) => text,
                (None, true) => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf.trim_end().to_string()
                }
                (None, false) => String::new(),
            };
            run_workflow(&config, document, &input).await?;
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn load_workflow(path: &Path) -> anyhow::Result<WorkflowDocument> {
    let document = WorkflowDocument::load(path)
        .with_context(|| format!("loading workflow {}", path.display()))?;
    info!(
        name = %document.name,
        nodes = document.nodes.len(),
        edges = document.edges.len(),
        "Workflow loaded"
    );
    Ok(document)
}

async fn run_workflow(
    config: &AppConfig,
    document: WorkflowDocument,
    input: &str,
) -> anyhow::Result<()> {
    let event_bus = Arc::new(EventBus::default());
    let broker = Arc::new(OperatorBroker::new(event_bus.clone()));

    let generator = greyflow_llm::create_generator(&config.model);
    let collaborators = Collaborators {
        generator: generator.clone(),
        http: Arc::new(ApiCaller::new(&config.http)?),
        structurer: greyflow_docs::create_structurer(config, generator),
        renderer: Arc::new(FileRenderer::new(config.output_dir())),
    };
    let dispatcher = NodeDispatcher::new(collaborators, config.model.endpoint.clone());
    let executor = WorkflowExecutor::new(dispatcher, config.engine.clone())
        .with_observer(event_bus.clone())
        .with_operator(broker.clone());

    // Subscribe before the run so no step is missed
    let rx = event_bus.subscribe();
    let listener = tokio::spawn(print_events(rx, broker.clone()));

    let token = executor.cancel_token();
    let ctrl_c_broker = broker.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling workflow");
            token.cancel();
            ctrl_c_broker.cancel_all().await;
        }
    });

    let graph = document.into_graph();
    let result = executor.run(&graph, input).await;
    let cancelled = matches!(result, Ok(RunOutcome::Cancelled));
    event_bus.publish(WorkflowEvent::RunFinished { cancelled });

    if cancelled {
        eprintln!("Workflow cancelled");
        // The listener may still be blocked on a terminal prompt
        std::process::exit(130);
    }
    listener.await.ok();

    if let RunOutcome::Completed(result) = result? {
        info!(
            nodes = result.node_results.len(),
            elapsed_ms = result.total_elapsed_ms,
            "Run complete"
        );
        println!("{}", result.output);
    }
    Ok(())
}

/// Print trace lines and answer operator requests from the terminal.
async fn print_events(
    mut rx: tokio::sync::broadcast::Receiver<WorkflowEvent>,
    broker: Arc<OperatorBroker>,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Trace listener lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            WorkflowEvent::Step(line) => eprintln!("{}", line),
            WorkflowEvent::StatusChanged { .. } | WorkflowEvent::OperatorResolved { .. } => {}
            WorkflowEvent::OperatorRequested {
                request_id,
                kind,
                message,
            } => {
                let label = match kind {
                    OperatorRequestKind::RawInput => "Input",
                    OperatorRequestKind::AdditionalInfo => "More info",
                };
                eprintln!("\n[{}] {}", label, message);
                let answer = tokio::task::spawn_blocking(|| {
                    dialoguer::Input::<String>::new()
                        .with_prompt(">")
                        .allow_empty(true)
                        .interact_text()
                        .unwrap_or_default()
                })
                .await
                .unwrap_or_default();
                broker.respond(&request_id, answer).await;
            }
            WorkflowEvent::RunFinished { .. } => break,
        }
    }
}
