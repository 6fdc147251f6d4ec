//! Clap CLI definitions for Murmur.

use clap::{Parser, Subcommand, ValueEnum};
use murmur_memory::history::TurnRole;
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1mHint:\x1b[0m Commands suffixed with [*] have subcommands. Run `<command> --help` for details.

\x1b[1;36mExamples:\x1b[0m
  murmur classify \"what is beskar?\"             Show the context key for a mention
  murmur --actor mando_bot lookup \"what is beskar?\"
  murmur --actor mando_bot admit \"what is beskar?\" --response \"Mandalorian steel.\"
  murmur emitted check \"This is the way.\"        Has the persona posted this already?
  murmur --actor mando_bot history show --user grogu   Recent thread with one user
  murmur stats                                  Row counts for every store";

/// Murmur: tiered reply memory and duplicate-post guard for a persona agent.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Persona account the memory belongs to.
    #[arg(long, global = true, default_value = "default")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a mention into its {intent, topic, tone} context key.
    Classify {
        /// Mention text.
        text: String,
    },
    /// Look a mention up in the exact tier, then the semantic tier.
    Lookup {
        /// Mention text.
        query: String,
    },
    /// Store a reply for a mention in both tiers.
    Admit {
        /// Mention text the reply answers.
        query: String,
        /// Reply text.
        #[arg(long)]
        response: String,
        /// Short summary of the reply.
        #[arg(long, default_value = "")]
        summary: String,
    },
    /// Check or record content the persona has posted [*].
    #[command(subcommand)]
    Emitted(EmittedCommands),
    /// Show or append conversation history for the actor [*].
    #[command(subcommand)]
    History(HistoryCommands),
    /// Row counts for every store.
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum EmittedCommands {
    /// Whether this text has already been posted.
    Check {
        text: String,
    },
    /// Record that this text was posted.
    Record {
        text: String,
    },
    /// Most recently recorded texts, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// First candidate that has not been posted yet.
    Pick {
        #[arg(required = true)]
        candidates: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Recent turns, oldest first.
    Show {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only the thread with this user.
        #[arg(long)]
        user: Option<String>,
    },
    /// Append a turn.
    Append {
        content: String,
        #[arg(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
        /// User on the other side of the thread.
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    User,
    Persona,
}

impl From<RoleArg> for TurnRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => TurnRole::User,
            RoleArg::Persona => TurnRole::Persona,
        }
    }
}
