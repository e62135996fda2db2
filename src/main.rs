//! # Lectern CLI (`lct`)
//!
//! The `lct` binary is the primary interface for Lectern. It provides
//! commands for database initialization, user and subject administration,
//! lecture ingestion and summarization, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! lct --config ./config/lct.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lct init` | Create the SQLite database, run migrations, seed the admin user |
//! | `lct bootstrap` | Turn a directory into a git repo with an initial commit |
//! | `lct user <add\|remove\|set-role\|list>` | Manage user accounts |
//! | `lct subject <add\|rename\|remove\|list>` | Manage subjects |
//! | `lct lectures` | List lectures, optionally per subject |
//! | `lct ingest <file>` | Extract, chunk, and store a lecture document |
//! | `lct summarize <lecture-id>` | Generate (or fetch cached) summary |
//! | `lct delete <lecture-id>` | Delete a lecture, its chunks, and summaries |
//! | `lct serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! lct init --config ./config/lct.toml
//!
//! # Add a subject and ingest a lecture into it
//! lct subject add "Operating Systems"
//! lct ingest notes/os-week3.pdf --title "Scheduling" --subject "Operating Systems"
//!
//! # Summarize at a 300-word target, bypassing the cache
//! lct summarize scheduling-1a2b3c4d --words 300 --force
//!
//! # Start the HTTP server
//! lct serve --config ./config/lct.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lectern::{
    bootstrap, config, ingest, lectures, migrate, server, subjects, summarize, users,
};

/// Lectern CLI — a lecture ingestion and summarization service.
///
/// All commands except `bootstrap` accept a `--config` flag pointing to a
/// TOML configuration file. See `config/lct.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lct",
    about = "Lectern — a lecture ingestion and summarization service",
    version,
    long_about = "Lectern ingests lecture documents (PDF), splits them into overlapping \
    chunks stored in SQLite, and produces single-shot LLM summaries at a requested word \
    count, served via a CLI and a JSON HTTP API with token-based authentication."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lct.toml`. Database, chunking, summarizer,
    /// server, and intro settings are read from this file.
    #[arg(long, global = true, default_value = "./config/lct.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (users,
    /// subjects, lectures, lecture_chunks, summaries) and seeds the default
    /// `admin` account when no users exist. Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Turn a directory into a git repository with one initial commit.
    ///
    /// Runs `git init`, stages everything, commits, and renames the branch.
    /// Each step is checked; the first failing step aborts the sequence.
    /// Finishes by printing the remote-add and push follow-ups.
    Bootstrap {
        /// Directory to bootstrap. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Branch name for the initial commit.
        #[arg(long, default_value = bootstrap::DEFAULT_BRANCH)]
        branch: String,

        /// Commit message for the initial commit.
        #[arg(long, short = 'm', default_value = bootstrap::DEFAULT_MESSAGE)]
        message: String,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage subjects.
    Subject {
        #[command(subcommand)]
        action: SubjectAction,
    },

    /// List lectures.
    Lectures {
        /// Only show lectures belonging to this subject.
        #[arg(long)]
        subject: Option<String>,
    },

    /// Ingest a lecture document.
    ///
    /// Reads the file, extracts its text, splits it into overlapping
    /// chunks, and stores the lecture under the given subject. The subject
    /// must already exist.
    Ingest {
        /// Path to the document (PDF).
        file: PathBuf,

        /// Lecture title. Also the basis of the generated lecture id.
        #[arg(long)]
        title: String,

        /// Subject the lecture belongs to.
        #[arg(long)]
        subject: String,
    },

    /// Summarize a lecture.
    ///
    /// Returns the cached summary for this (lecture, word count) pair when
    /// one exists, otherwise calls the configured summarizer and stores the
    /// result. Requires `[summarizer].provider = "openrouter"` and the
    /// `OPENROUTER_API_KEY` environment variable.
    Summarize {
        /// Lecture id, as printed by `lct ingest` and `lct lectures`.
        lecture_id: String,

        /// Target summary length in words.
        #[arg(long, default_value_t = 600)]
        words: i64,

        /// Regenerate even when a cached summary exists.
        #[arg(long)]
        force: bool,
    },

    /// Delete a lecture, its chunks, and its cached summaries.
    Delete {
        /// Lecture id to delete.
        lecture_id: String,
    },

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves the JSON API plus the intro and
    /// login pages.
    Serve,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user account.
    Add {
        username: String,
        /// Plain-text password; stored as a bcrypt hash.
        #[arg(long)]
        password: String,
        /// Either `student` or `admin`.
        #[arg(long, default_value = "student")]
        role: String,
    },
    /// Delete a user account. The main `admin` account cannot be deleted.
    Remove { username: String },
    /// Change a user's role.
    SetRole {
        username: String,
        /// Either `student` or `admin`.
        role: String,
    },
    /// List all user accounts.
    List,
}

#[derive(Subcommand)]
enum SubjectAction {
    /// Create a subject.
    Add { name: String },
    /// Rename a subject. Its lectures follow the new name.
    Rename { old_name: String, new_name: String },
    /// Delete a subject and all of its lectures.
    Remove { name: String },
    /// List subjects with their lectures.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Bootstrap works on any directory and needs no config file
    if let Commands::Bootstrap { dir, branch, message } = &cli.command {
        return bootstrap::run_bootstrap(dir, branch, message);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Bootstrap { .. } => unreachable!("handled above"),
        Commands::User { action } => match action {
            UserAction::Add {
                username,
                password,
                role,
            } => {
                users::run_user_add(&cfg, &username, &password, &role).await?;
            }
            UserAction::Remove { username } => {
                users::run_user_remove(&cfg, &username).await?;
            }
            UserAction::SetRole { username, role } => {
                users::run_user_set_role(&cfg, &username, &role).await?;
            }
            UserAction::List => {
                users::run_user_list(&cfg).await?;
            }
        },
        Commands::Subject { action } => match action {
            SubjectAction::Add { name } => {
                subjects::run_subject_add(&cfg, &name).await?;
            }
            SubjectAction::Rename { old_name, new_name } => {
                subjects::run_subject_rename(&cfg, &old_name, &new_name).await?;
            }
            SubjectAction::Remove { name } => {
                subjects::run_subject_remove(&cfg, &name).await?;
            }
            SubjectAction::List => {
                subjects::run_subject_list(&cfg).await?;
            }
        },
        Commands::Lectures { subject } => {
            lectures::run_list(&cfg, subject.as_deref()).await?;
        }
        Commands::Ingest {
            file,
            title,
            subject,
        } => {
            ingest::run_ingest(&cfg, &file, &title, &subject).await?;
        }
        Commands::Summarize {
            lecture_id,
            words,
            force,
        } => {
            summarize::run_summarize(&cfg, &lecture_id, words, force).await?;
        }
        Commands::Delete { lecture_id } => {
            lectures::run_delete(&cfg, &lecture_id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
