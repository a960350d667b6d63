//! contextkeeper CLI: the main entry point.
//!
//! Commands:
//! - `init`    : Write the default config and create the sessions directory
//! - `status`  : Show configuration and session counts
//! - `session` : Start, end, list, inspect, or clear sessions
//! - `process` : Run a user message through the pipeline
//! - `reply`   : Record the assistant's reply
//! - `prompt`  : Synthesize the prompt for the main model
//! - `export`  : Dump a session's context snapshot
//! - `import`  : Load a context snapshot into a session
//! - `serve`   : Answer JSON-lines tool requests on stdin

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "contextkeeper",
    about = "contextkeeper: hierarchical conversation memory for LLM assistants",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the sessions directory
    Init,

    /// Show configuration and session counts
    Status,

    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Process a user message: classify, extract keywords, store, guide
    Process {
        /// The user's message
        message: String,

        /// Session to store into (a new one is started if absent or unknown)
        #[arg(short, long)]
        session: Option<String>,

        /// Intent label(s) for the message, e.g. PROBLEM_DEFINITION
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },

    /// Record the assistant's reply in a session
    Reply {
        /// The assistant's reply
        message: String,

        #[arg(short, long)]
        session: String,
    },

    /// Print the synthesized prompt for a message
    Prompt {
        /// The user's current message
        message: String,

        #[arg(short, long)]
        session: String,

        /// Print the full synthesis breakdown as JSON
        #[arg(long)]
        debug: bool,
    },

    /// Export a session's context snapshot
    Export {
        #[arg(short, long)]
        session: String,

        /// Write the snapshot to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a context snapshot into a session
    Import {
        /// Snapshot file (as written by `export --output`)
        file: PathBuf,

        /// Target session (a new one is started if unknown)
        #[arg(short, long)]
        session: String,
    },

    /// Answer JSON-lines tool requests on stdin until EOF
    Serve {
        /// Intent label(s) for messages that carry none of their own
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start a new, empty session
    Start,
    /// End a session and delete its snapshot
    End { id: String },
    /// List all sessions
    List,
    /// Show statistics for a session
    Stats { id: String },
    /// End a session, reporting what was cleared
    Clear { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing. Logs go to stderr so stdout stays clean JSON.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Session { action } => match action {
            SessionAction::Start => commands::session::start().await?,
            SessionAction::End { id } => commands::session::end(&id).await?,
            SessionAction::List => commands::session::list().await?,
            SessionAction::Stats { id } => commands::session::stats(&id).await?,
            SessionAction::Clear { id } => commands::session::clear(&id).await?,
        },
        Commands::Process {
            message,
            session,
            labels,
        } => commands::process::run(&message, session.as_deref(), &labels).await?,
        Commands::Reply { message, session } => commands::process::reply(&session, &message).await?,
        Commands::Prompt {
            message,
            session,
            debug,
        } => commands::prompt::run(&session, &message, debug).await?,
        Commands::Export { session, output } => {
            commands::snapshot::export(&session, output.as_deref()).await?
        }
        Commands::Import { file, session } => commands::snapshot::import(&file, &session).await?,
        Commands::Serve { labels } => commands::serve::run(&labels).await?,
    }

    Ok(())
}
