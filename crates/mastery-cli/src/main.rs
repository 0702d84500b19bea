//! mastery CLI: record evaluations and inspect topic proficiency.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mastery_core::model::{EvaluationTier, SourceType};

mod commands;

#[derive(Parser)]
#[command(name = "mastery", version, about = "Decay-weighted topic mastery tracker")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User to act as (falls back to `default_user` in the config)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one evaluation. The first topic is the primary one.
    Record {
        /// Comma-separated topic ids, primary first
        #[arg(long, value_delimiter = ',', required = true)]
        topics: Vec<String>,

        /// Performance score, 0-100
        #[arg(long, conflicts_with = "tier")]
        score: Option<f64>,

        /// Shorthand outcome instead of a score: strong, moderate, weak
        #[arg(long)]
        tier: Option<EvaluationTier>,

        /// Where the evaluation came from
        #[arg(long, default_value = "free-practice")]
        source: SourceType,

        /// Free-form reference, e.g. an exam name
        #[arg(long)]
        source_ref: Option<String>,

        /// When it happened (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        occurred_at: Option<String>,
    },

    /// Show proficiency for every topic
    Scores {
        /// Score as of this instant (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        as_of: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List topics most often evaluated together with a topic
    Related {
        /// Anchor topic id
        #[arg(long)]
        topic: String,

        /// Maximum number of topics to show
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show the direct evaluations behind a topic's score
    History {
        /// Topic id
        #[arg(long)]
        topic: String,

        /// Weigh evaluations as of this instant (default now)
        #[arg(long)]
        as_of: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Delete every evaluation that mentions a topic
    Reset {
        /// Topic id
        #[arg(long)]
        topic: String,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mastery=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Record {
            topics,
            score,
            tier,
            source,
            source_ref,
            occurred_at,
        } => {
            commands::record::execute(
                config,
                user,
                topics,
                score,
                tier,
                source,
                source_ref,
                occurred_at,
            )
            .await
        }
        Commands::Scores { as_of, format } => {
            commands::scores::execute(config, user, as_of, format).await
        }
        Commands::Related {
            topic,
            limit,
            format,
        } => commands::related::execute(config, user, topic, limit, format).await,
        Commands::History {
            topic,
            as_of,
            format,
        } => commands::history::execute(config, user, topic, as_of, format).await,
        Commands::Reset { topic } => commands::reset::execute(config, user, topic).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
