use crate::domain::models::{ProposalStatus, Style};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "feedgate",
    version,
    about = "Feedback triage and policy-safe patch promotion"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Redact, validate and append feedback cards
    Ingest(IngestArgs),
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Deduplicate and cluster stored feedback by task and jurisdiction
    Cluster,
    /// Map clusters (or one card) to guardrailed change proposals
    Promote {
        #[arg(long, help = "Promote a single card's proposed tuning")]
        card: Option<String>,
    },
    Proposals {
        #[command(subcommand)]
        command: ProposalCommands,
    },
    Digest {
        #[command(subcommand)]
        command: DigestCommands,
    },
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug)]
pub struct IngestArgs {
    #[arg(long, help = "JSON object, JSON array, or JSON lines of feedback input")]
    pub file: Option<PathBuf>,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub user: Option<String>,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub session: Option<String>,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub task: Option<String>,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub jurisdiction: Option<String>,
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub satisfaction: Option<f64>,
    #[arg(long = "issue", conflicts_with = "file")]
    pub issues: Vec<String>,
    #[arg(long, conflicts_with = "file")]
    pub note: Option<String>,
    #[arg(long, value_enum, requires_all = ["threshold_delta", "depth"], conflicts_with = "file")]
    pub style: Option<Style>,
    #[arg(long, allow_negative_numbers = true, requires = "style")]
    pub threshold_delta: Option<f64>,
    #[arg(long, requires = "style")]
    pub depth: Option<u8>,
    #[arg(long, conflicts_with = "file", help = "RFC 3339 timestamp (defaults to now)")]
    pub ts: Option<String>,
    #[arg(long, default_value_t = false, help = "Attach an ed25519 attestation")]
    pub sign: bool,
}

#[derive(Subcommand, Debug)]
pub enum FeedbackCommands {
    List {
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        jurisdiction: Option<String>,
    },
    /// Check card ids and attestations against their content
    Verify,
}

#[derive(Subcommand, Debug)]
pub enum ProposalCommands {
    List {
        #[arg(long, value_enum)]
        status: Option<ProposalStatus>,
    },
    Show {
        id: String,
    },
    Approve {
        id: String,
        #[arg(long)]
        actor: String,
    },
    Reject {
        id: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Apply {
        id: String,
        #[arg(long)]
        actor: String,
    },
    /// Show the applied policy per task/jurisdiction
    Applied,
}

#[derive(Subcommand, Debug)]
pub enum DigestCommands {
    /// Sign a Merkle digest over all stored cards
    Build,
    Verify {
        #[arg(long, help = "Digest file (defaults to the latest digest)")]
        file: Option<PathBuf>,
    },
    /// Inclusion proof for one card against the current store
    Prove {
        card_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    Init {
        #[arg(long, default_value_t = false, help = "Rotate an existing key")]
        force: bool,
    },
    Show,
    Trust {
        public_key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Show,
}
