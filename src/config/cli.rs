use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

use crate::domain::entities::NoteType;

/// Command-line arguments for the Marginalia client.
#[derive(Debug, Parser)]
#[command(name = "marginalia", version, about = "Reading-notes client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "MARGINALIA_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings overrides accepted by every subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the API base URL.
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the page size for list reads.
    #[arg(long = "per-page", value_name = "COUNT", global = true)]
    pub per_page: Option<u32>,

    /// Override the search debounce delay.
    #[arg(long = "debounce-ms", value_name = "MILLIS", global = true)]
    pub debounce_ms: Option<u64>,

    /// Override how long cached reads stay fresh.
    #[arg(long = "stale-seconds", value_name = "SECONDS", global = true)]
    pub stale_seconds: Option<u64>,

    /// Override the empty-page policy (freeze|step_back).
    #[arg(long = "empty-page-policy", value_name = "POLICY", global = true)]
    pub empty_page_policy: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Manage books.
    #[command(subcommand)]
    Books(BooksCmd),
    /// Manage notes.
    #[command(subcommand)]
    Notes(NotesCmd),
    /// Manage tags.
    #[command(subcommand)]
    Tags(TagsCmd),
    /// Interactively search and page through a list.
    Browse(BrowseArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum BooksCmd {
    List(ListArgs),
    Show {
        id: i64,
    },
    /// List the notes attached to a book.
    Notes(BookNotesArgs),
    Create(BookCreateArgs),
    Update(BookUpdateArgs),
    Delete {
        id: i64,
    },
}

#[derive(Debug, Args, Clone)]
pub struct BookNotesArgs {
    pub id: i64,
    #[command(flatten)]
    pub list: ListArgs,
    #[arg(long = "type", value_name = "TYPE")]
    pub note_type: Option<NoteType>,
}

#[derive(Debug, Args, Clone)]
pub struct BookCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub author: String,
    #[arg(long)]
    pub isbn: Option<String>,
    #[arg(long)]
    pub publisher: Option<String>,
    #[arg(long = "page-count")]
    pub page_count: Option<i32>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct BookUpdateArgs {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub isbn: Option<String>,
    #[arg(long)]
    pub publisher: Option<String>,
    #[arg(long = "page-count")]
    pub page_count: Option<i32>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum NotesCmd {
    List(NoteListArgs),
    Show {
        id: i64,
    },
    Create(NoteCreateArgs),
    Update(NoteUpdateArgs),
    /// Replace the tags of a note.
    Tags(NoteTagsArgs),
    Delete {
        id: i64,
    },
}

#[derive(Debug, Args, Clone)]
pub struct NoteListArgs {
    #[command(flatten)]
    pub list: ListArgs,
    #[arg(long = "type", value_name = "TYPE")]
    pub note_type: Option<NoteType>,
    #[arg(long = "book", value_name = "BOOK_ID")]
    pub book_id: Option<i64>,
}

#[derive(Debug, Args, Clone)]
pub struct NoteCreateArgs {
    #[arg(long)]
    pub content: String,
    #[arg(long = "book", value_name = "BOOK_ID")]
    pub book_id: Option<i64>,
    #[arg(long = "type", value_name = "TYPE", default_value = "general")]
    pub note_type: NoteType,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long = "page-ref")]
    pub page_reference: Option<i32>,
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub favorite: bool,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct NoteUpdateArgs {
    pub id: i64,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long = "book", value_name = "BOOK_ID")]
    pub book_id: Option<i64>,
    #[arg(long = "type", value_name = "TYPE")]
    pub note_type: Option<NoteType>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long = "page-ref")]
    pub page_reference: Option<i32>,
    #[arg(long, value_parser = BoolishValueParser::new())]
    pub favorite: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct NoteTagsArgs {
    pub id: i64,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum TagsCmd {
    List(ListArgs),
    /// Most used tags.
    Popular {
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: i64,
    },
    Create {
        name: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowseTarget {
    Books,
    Notes,
    Tags,
}

#[derive(Debug, Args, Clone)]
pub struct BrowseArgs {
    #[arg(value_enum)]
    pub target: BrowseTarget,
    /// Browse the notes of one book (only with `notes`).
    #[arg(long = "book", value_name = "BOOK_ID")]
    pub book_id: Option<i64>,
}
