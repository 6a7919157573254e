use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cache::{SortField, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "notebridge")]
#[command(version, about = "Command-line client for a RAG-backed note service")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "NOTEBRIDGE_URL", value_name = "URL")]
    pub server: Option<String>,

    /// YAML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List notes
    List {
        /// Only notes whose title, content or tags contain this text
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Only notes carrying this exact tag
        #[arg(long, short = 't')]
        tag: Option<String>,

        /// Sort field (title, created_at, updated_at)
        #[arg(long, default_value = "updated_at")]
        sort: SortField,

        /// Sort order (asc, desc)
        #[arg(long, default_value = "desc")]
        order: SortOrder,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Get {
        /// Note ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a note
    Create {
        /// Note title
        title: Option<String>,

        /// Note body
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read the body from stdin
        #[arg(long)]
        stdin: bool,

        /// Tags (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a note; fields not given keep their current value
    Update {
        /// Note ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New body
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read the new body from stdin
        #[arg(long)]
        stdin: bool,

        /// Replace the tags (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search notes on the backend
    Search {
        /// Search query
        query: String,

        /// Use retrieval-augmented (semantic) search
        #[arg(long)]
        rag: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all tags, or the notes under one tag
    Tags {
        /// Show notes carrying this tag instead
        tag: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recently changed notes
    Recent {
        /// How many notes to show
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Have the backend check a note without saving it
    Validate {
        /// Note title
        title: Option<String>,

        /// Note body
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read the body from stdin
        #[arg(long)]
        stdin: bool,

        /// Tags (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show backend note statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check backend reachability
    Health {
        /// Probe every subsystem, not just the health endpoint
        #[arg(long)]
        full: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
