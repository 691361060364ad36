use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatmind")]
#[command(author, version, about = "Streaming LLM chat with topic-aware memory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session (resumes the active conversation)
    Chat {
        /// System prompt sent ahead of every request
        #[arg(short = 's', long)]
        system: Option<String>,

        /// Start a fresh conversation instead of resuming
        #[arg(short = 'n', long)]
        new: bool,
    },

    /// Send a single message and print the streamed reply
    Ask {
        prompt: String,

        #[arg(short = 's', long)]
        system: Option<String>,
    },

    /// List saved conversations grouped by date
    History,

    /// Print a saved conversation
    Show {
        /// Conversation id as listed by `history`
        id: String,
    },

    /// List stored topics, most recently updated first
    Topics,

    /// Show topics related to a query
    Related { query: String },

    /// Extract and clean keywords from text
    Keywords {
        text: String,

        /// Use the local tokenizer instead of the model
        #[arg(short, long)]
        local: bool,
    },

    /// Delete all saved conversations, topics and the active session
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
