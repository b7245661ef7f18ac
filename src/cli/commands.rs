use clap::{Parser, Subcommand};
use graphmind::workflows::AgentProfile;
use std::path::PathBuf;

/// `graphmind` - LLM workflow graphs: tool-augmented agents and iterative refinement.
#[derive(Parser, Debug)]
#[command(name = "graphmind")]
#[command(version)]
#[command(about = "Tool-augmented chat agents and an iterative blog writer.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with an agent (interactive)
    Chat {
        /// Agent profile: chatbot (search, clock, calculator) or stocks (quotes, trades)
        #[arg(short, long, default_value = "chatbot")]
        profile: AgentProfile,

        /// Continue an existing session instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Write a blog post, revising until the judge is satisfied
    Blog {
        /// Blog topic
        #[arg(short, long)]
        topic: String,

        /// Write the finished post as markdown to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List session ids, most recent first
    List,
    /// Print one session's transcript or blog report
    Show {
        /// Session id
        id: String,
    },
    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },
}
