use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use coding_agent::{
    AgentConfig, CodingAgent, SessionStatus, SqliteStorage, Storage, TaskReport, create_provider,
};

#[derive(Parser)]
#[command(name = "coding-agent", version)]
#[command(about = "A minimal LLM coding agent: write code, run it, read files", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// LLM provider to use (anthropic, openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for an instruction, save it and run it
    Run {
        /// What the code should do
        instruction: String,

        /// File to write the generated code to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Command used to run the generated file
        #[arg(long)]
        interpreter: Option<String>,

        /// Leave writing the file to the model instead of saving it directly
        #[arg(long)]
        no_write: bool,

        /// Save the task as a resumable session
        #[arg(long)]
        save_session: bool,
    },

    /// Ask the agent to read a file and return its content
    Read {
        /// Path of the file to read
        path: PathBuf,
    },

    /// Resume a saved session
    Resume {
        /// Session ID to resume
        session_id: String,
    },

    /// List saved sessions
    Sessions {
        /// Show only sessions with this status (pending, in_progress, completed, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a saved session
    DeleteSession {
        /// Session ID to delete
        session_id: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_agent(config: &AgentConfig) -> Result<CodingAgent> {
    let provider = create_provider(config.provider_name(), config.model.as_deref())
        .context("failed to create LLM provider")?;
    Ok(CodingAgent::from_config(config, provider)?)
}

fn print_report(report: &TaskReport) {
    if report.generated.extraction_missed() {
        eprintln!("warning: the model's response contained no code block");
    }

    println!("# Generated code");
    if let Some(path) = &report.artifact {
        println!("({})", path.display());
    }
    println!("{}\n", report.generated.content());
    println!("# Execution output");
    println!("{}", report.execution.content());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AgentConfig::load().unwrap_or_else(|e| {
        debug!(error = %e, "failed to load config, using defaults");
        AgentConfig::default()
    });
    if let Some(provider) = cli.provider {
        config.provider = Some(provider);
    }
    if let Some(model) = cli.model {
        config.model = Some(model);
    }

    match cli.command {
        Commands::Run {
            instruction,
            output,
            interpreter,
            no_write,
            save_session,
        } => {
            if let Some(output) = output {
                config.artifact_path = output;
            }
            if let Some(interpreter) = interpreter {
                config.interpreter = interpreter;
            }
            if no_write {
                config.persist_artifact = false;
            }

            info!(provider = config.provider_name(), "starting task");

            let mut agent = build_agent(&config)?;
            if save_session || config.save_sessions {
                let storage = SqliteStorage::default_location()
                    .context("failed to initialize session storage")?;
                agent = agent.with_storage(Box::new(storage));
            }

            let report = agent.run(&instruction).await.context("task failed")?;
            print_report(&report);
            if save_session || config.save_sessions {
                eprintln!("session: {}", report.session_id);
            }
        }

        Commands::Read { path } => {
            let agent = build_agent(&config)?;
            let result = agent.read_file(path).await.context("read failed")?;
            println!("{}", result.content());
        }

        Commands::Resume { session_id } => {
            let storage = SqliteStorage::default_location()
                .context("failed to initialize session storage")?;
            let mut agent = build_agent(&config)?.with_storage(Box::new(storage));

            let report = agent
                .resume(&session_id)
                .await
                .context("resume failed")?;
            print_report(&report);
        }

        Commands::Sessions { status } => {
            let filter = status
                .as_deref()
                .map(str::parse::<SessionStatus>)
                .transpose()?;
            let storage = SqliteStorage::default_location()
                .context("failed to initialize session storage")?;

            let sessions: Vec<_> = storage
                .list()
                .await?
                .into_iter()
                .filter(|s| filter.is_none_or(|f| s.status == f))
                .collect();

            if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                println!("{:<10} {:<12} {:<28} INSTRUCTION", "ID", "STATUS", "STATE");
                for session in sessions {
                    println!("{}", session);
                }
            }
        }

        Commands::DeleteSession { session_id } => {
            let storage = SqliteStorage::default_location()
                .context("failed to initialize session storage")?;
            storage.delete(&session_id).await?;
            println!("Deleted session {}", session_id);
        }
    }

    Ok(())
}
