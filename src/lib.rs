//! ludus-magnus: an evolutionary trainer for LLM system prompts.
//!
//! Given a stated user need and an executable scoring pipeline, the trainer
//! produces a population of prompt variants, runs them as contestants
//! through scored challenges organized into tournaments, selects winners,
//! mutates them into a next generation, and repeats until a target score is
//! met or the generation budget is exhausted. The surviving prompts are
//! emitted as a deployable manifest.
//!
//! # Architecture
//!
//! - [`core`]: errors, ids, the persisted state tree and its store,
//!   cancellation, cost tracking, and the provider capability.
//! - [`engine`]: generation and evolution prompt synthesis plus api/cli
//!   execution.
//! - [`arena`]: harness, scoring, challenges, tournaments, selection,
//!   mutation, the training loop, and its outputs (checkpoints, reports,
//!   manifests).
//! - [`commands`]: the transactional session commands behind the CLI.
//!
//! All persistent state lives in `.ludus-magnus/state.json`; tournaments and
//! training loops are transient aggregates serialized only as checkpoints or
//! reports.
//!
//! # Examples
//!
//! ```bash
//! # Create a session and its first agent
//! ludus-magnus quickstart init --need "customer support agent"
//!
//! # Execute the latest agent and score the result
//! ludus-magnus run ses_1a2b3c4d --input "How do I reset my password?"
//! ludus-magnus evaluate art_5e6f7a8b --score 3 --comment "too generic"
//!
//! # Evolve, branch, and train
//! ludus-magnus iterate ses_1a2b3c4d
//! ludus-magnus promote ses_1a2b3c4d --strategy variations
//! ludus-magnus training iterate ses_1a2b3c4d
//! ```

pub mod arena;
pub mod commands;
pub mod core;
pub mod engine;

use crate::commands::{FactorySource, OutputMode};
use crate::core::error::LudusError;
use crate::core::provider;
use crate::core::store::Store;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "ludus-magnus",
    version = env!("CARGO_PKG_VERSION"),
    about = "Evolutionary trainer for LLM system prompts"
)]
struct Cli {
    /// Emit machine-readable JSON instead of text
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

/// Provider selection flags, accepted wherever a provider call may occur.
/// Overrides take precedence over environment variables.
#[derive(clap::Args, Debug, Default, Clone)]
struct ProviderOpts {
    /// Provider name (anthropic, openai-compatible, or mock)
    #[clap(long, default_value = "")]
    provider: String,
    /// Override provider model
    #[clap(long, default_value = "")]
    model: String,
    /// Override provider base URL
    #[clap(long = "base-url", default_value = "")]
    base_url: String,
    /// Override provider API key
    #[clap(long = "api-key", default_value = "")]
    api_key: String,
}

impl ProviderOpts {
    fn to_config(&self) -> provider::Config {
        provider::Config {
            provider: self.provider.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct SessionCli {
    #[clap(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Create a new session
    New {
        /// Session mode: quickstart or training
        #[clap(long, default_value = "quickstart")]
        mode: String,
        /// Intent for the session
        #[clap(long, default_value = "")]
        need: String,
    },
    /// List sessions
    List,
    /// Inspect a session
    Inspect { session_id: String },
}

#[derive(clap::Args, Debug)]
struct QuickstartCli {
    #[clap(subcommand)]
    command: QuickstartCommand,
}

#[derive(Subcommand, Debug)]
enum QuickstartCommand {
    /// Initialize a quickstart session
    Init {
        /// Intent for the session
        #[clap(long)]
        need: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },
}

#[derive(clap::Args, Debug)]
struct TrainingCli {
    #[clap(subcommand)]
    command: TrainingCommand,
}

#[derive(Subcommand, Debug)]
enum TrainingCommand {
    /// Initialize a training session with lineages A/B/C/D
    Init {
        /// Intent for the session
        #[clap(long)]
        need: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },
    /// Regenerate unlocked training lineages
    Iterate {
        session_id: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },
}

#[derive(clap::Args, Debug)]
struct LineageCli {
    #[clap(subcommand)]
    command: LineageCommand,
}

#[derive(Subcommand, Debug)]
enum LineageCommand {
    /// Lock one lineage
    Lock {
        session_id: String,
        lineage_name: String,
    },
    /// Unlock one lineage
    Unlock {
        session_id: String,
        lineage_name: String,
    },
}

#[derive(clap::Args, Debug)]
struct DirectiveCli {
    #[clap(subcommand)]
    command: DirectiveCommand,
}

#[derive(Subcommand, Debug)]
enum DirectiveCommand {
    /// Add a one-shot or sticky directive to one lineage
    Set {
        session_id: String,
        lineage_name: String,
        /// Directive instruction text
        #[clap(long)]
        text: String,
        /// Store as one-shot directive
        #[clap(long)]
        oneshot: bool,
        /// Store as sticky directive
        #[clap(long)]
        sticky: bool,
    },
    /// Remove a directive from one lineage
    Clear {
        session_id: String,
        lineage_name: String,
        directive_id: String,
    },
}

#[derive(clap::Args, Debug)]
struct ArtifactCli {
    #[clap(subcommand)]
    command: ArtifactCommand,
}

#[derive(Subcommand, Debug)]
enum ArtifactCommand {
    /// List all artifacts for a session
    List { session_id: String },
    /// Inspect one artifact in detail
    Inspect { artifact_id: String },
}

#[derive(clap::Args, Debug)]
struct ExportCli {
    #[clap(subcommand)]
    command: ExportCommand,
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Export one agent definition
    Agent {
        agent_id: String,
        /// Export format: json, python, typescript
        #[clap(long, default_value = "json")]
        format: String,
    },
    /// Export one session evidence pack
    Evidence {
        session_id: String,
        /// Export format: json
        #[clap(long, default_value = "json")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage sessions
    Session(SessionCli),

    /// Manage quickstart flows
    Quickstart(QuickstartCli),

    /// Promote a quickstart session into training mode
    Promote {
        session_id: String,
        /// Promotion strategy: variations or alternatives
        #[clap(long, default_value = "variations")]
        strategy: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },

    /// Manage training mode flows
    Training(TrainingCli),

    /// Generate the next agent version from lineage evolution feedback
    Iterate {
        session_id: String,
        /// Lineage name (main, A, B, C, D)
        #[clap(long, default_value = "")]
        lineage: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },

    /// Manage lineage lock state
    Lineage(LineageCli),

    /// Run the latest agent on one input and store an artifact
    Run {
        session_id: String,
        /// Input for agent execution
        #[clap(long)]
        input: String,
        /// Lineage name (main, A, B, C, D)
        #[clap(long, default_value = "")]
        lineage: String,
        /// Execution mode: api or cli
        #[clap(long, default_value = "api")]
        mode: String,
        /// CLI executor for mode=cli: claude or codex
        #[clap(long, default_value = "")]
        executor: String,
        #[clap(flatten)]
        provider: ProviderOpts,
    },

    /// Evaluate one artifact with score and optional comment
    Evaluate {
        artifact_id: String,
        /// Evaluation score (1-10)
        #[clap(long)]
        score: i64,
        /// Optional evaluation comment
        #[clap(long, default_value = "")]
        comment: String,
    },

    /// Manage per-lineage directives
    Directive(DirectiveCli),

    /// List and inspect artifacts
    Artifact(ArtifactCli),

    /// Export agents and evidence
    Export(ExportCli),

    /// Run environment diagnostics
    Doctor {
        #[clap(flatten)]
        provider: ProviderOpts,
    },
}

/// Parses the command line, runs the command, and returns the process exit
/// code. Errors render as one line on stderr (text) or `{"error": ...}` on
/// stdout (JSON).
pub fn run() -> i32 {
    let cli = Cli::parse();
    let output = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match dispatch(cli.command, output) {
        Ok(()) => 0,
        Err(err) => {
            match output {
                OutputMode::Json => {
                    println!("{}", serde_json::json!({ "error": err.to_string() }))
                }
                OutputMode::Text => eprintln!("Error: {}", err),
            }
            1
        }
    }
}

fn dispatch(command: Command, output: OutputMode) -> Result<(), LudusError> {
    let store = Store::default();
    let source = FactorySource;

    match command {
        Command::Session(session_cli) => match session_cli.command {
            SessionCommand::New { mode, need } => {
                commands::session::run_new_cli(&store, &mode, &need, output)
            }
            SessionCommand::List => commands::session::run_list_cli(&store, output),
            SessionCommand::Inspect { session_id } => {
                commands::session::run_inspect_cli(&store, &session_id, output)
            }
        },
        Command::Quickstart(quickstart_cli) => match quickstart_cli.command {
            QuickstartCommand::Init { need, provider } => commands::quickstart::run_init_cli(
                &store,
                &need,
                &provider.to_config(),
                &source,
                output,
            ),
        },
        Command::Promote {
            session_id,
            strategy,
            provider,
        } => commands::promote::run_promote_cli(
            &store,
            &session_id,
            &strategy,
            &provider.to_config(),
            &source,
            output,
        ),
        Command::Training(training_cli) => match training_cli.command {
            TrainingCommand::Init { need, provider } => commands::training::run_init_cli(
                &store,
                &need,
                &provider.to_config(),
                &source,
                output,
            ),
            TrainingCommand::Iterate {
                session_id,
                provider,
            } => commands::training::run_iterate_cli(
                &store,
                &session_id,
                &provider.to_config(),
                &source,
                output,
            ),
        },
        Command::Iterate {
            session_id,
            lineage,
            provider,
        } => {
            let lineage = if lineage.trim().is_empty() {
                None
            } else {
                Some(lineage.as_str())
            };
            commands::iterate::run_iterate_cli(
                &store,
                &session_id,
                lineage,
                &provider.to_config(),
                &source,
                output,
            )
        }
        Command::Lineage(lineage_cli) => match lineage_cli.command {
            LineageCommand::Lock {
                session_id,
                lineage_name,
            } => commands::lineage::run_lock_cli(&store, &session_id, &lineage_name, true, output),
            LineageCommand::Unlock {
                session_id,
                lineage_name,
            } => commands::lineage::run_lock_cli(&store, &session_id, &lineage_name, false, output),
        },
        Command::Run {
            session_id,
            input,
            lineage,
            mode,
            executor,
            provider,
        } => {
            let lineage = if lineage.trim().is_empty() {
                None
            } else {
                Some(lineage.as_str())
            };
            commands::run::run_run_cli(
                &store,
                &session_id,
                lineage,
                &input,
                &mode,
                &executor,
                &provider.to_config(),
                &source,
                output,
            )
        }
        Command::Evaluate {
            artifact_id,
            score,
            comment,
        } => commands::evaluate::run_evaluate_cli(&store, &artifact_id, score, &comment, output),
        Command::Directive(directive_cli) => match directive_cli.command {
            DirectiveCommand::Set {
                session_id,
                lineage_name,
                text,
                oneshot,
                sticky,
            } => commands::directive::run_set_cli(
                &store,
                &session_id,
                &lineage_name,
                &text,
                oneshot,
                sticky,
                output,
            ),
            DirectiveCommand::Clear {
                session_id,
                lineage_name,
                directive_id,
            } => commands::directive::run_clear_cli(
                &store,
                &session_id,
                &lineage_name,
                &directive_id,
                output,
            ),
        },
        Command::Artifact(artifact_cli) => match artifact_cli.command {
            ArtifactCommand::List { session_id } => {
                commands::artifact::run_list_cli(&store, &session_id, output)
            }
            ArtifactCommand::Inspect { artifact_id } => {
                commands::artifact::run_inspect_cli(&store, &artifact_id, output)
            }
        },
        Command::Export(export_cli) => match export_cli.command {
            ExportCommand::Agent { agent_id, format } => {
                commands::export::run_agent_cli(&store, &agent_id, &format, output)
            }
            ExportCommand::Evidence { session_id, format } => {
                commands::export::run_evidence_cli(&store, &session_id, &format, output)
            }
        },
        Command::Doctor { provider } => {
            commands::doctor::run_doctor_cli(&store, &provider.to_config(), output)
        }
    }
}
