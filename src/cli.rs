// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// The subcommands map one-to-one onto the engine's operations:
//   scan    -> which videos contain the find-text (read-only preview)
//   update  -> apply the replacement to a selection, with backups
//   links   -> audit every link in every description
//   restore -> push a backed-up description back to the remote
//   backups -> list what is restorable
//
// Rust concepts:
// - Derive macros: #[derive(Parser)] generates all the parsing code
// - Doc comments on fields become --help text
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tube-sweep",
    version = "0.1.0",
    about = "Bulk-edit YouTube video descriptions and audit the links inside them",
    long_about = "tube-sweep finds literal text across all of your channel's video descriptions, \
                  replaces it on the videos you select (taking a backup first and rolling back \
                  on failure), and can health-check every hyperlink your descriptions contain."
)]
pub struct Cli {
    /// OAuth access token for the YouTube Data API.
    ///
    /// Falls back to the YOUTUBE_ACCESS_TOKEN environment variable
    /// (a .env file is honored). The token is used as-is; tube-sweep
    /// never acquires or refreshes credentials itself.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path of the backup file (JSON map of video id -> saved description)
    #[arg(long, global = true, default_value = "description_backups.json")]
    pub backup_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the videos whose description contains the given text
    ///
    /// Example: tube-sweep scan "http://old-site.example.com"
    Scan {
        /// Exact text to search for (literal match, case-sensitive)
        pattern: String,

        /// Output results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replace text in the descriptions of selected videos
    ///
    /// Scans first, then applies the edit to the selection. A backup of each
    /// description is written before its video is touched, and a failed
    /// write is rolled back from that backup automatically.
    ///
    /// Example: tube-sweep update "old.example.com" "new.example.com" --all
    Update {
        /// Exact text to search for (literal match, case-sensitive)
        pattern: String,

        /// Text to replace it with
        replacement: String,

        /// Update every matching video
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Update only these video ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Output outcomes as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Extract and health-check every link in every video description
    ///
    /// Example: tube-sweep links --concurrency 10
    Links {
        /// Output the report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum number of link probes in flight at once
        #[arg(long, default_value_t = 20)]
        concurrency: usize,
    },

    /// Restore a video's description from its backup
    ///
    /// The backup record is kept afterwards, so a restore can be repeated.
    ///
    /// Example: tube-sweep restore dQw4w9WgXcQ
    Restore {
        /// The video id to restore
        video_id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List all stored backups
    Backups,
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does global = true do?
//    - The flag is accepted after any subcommand, not just before it
//    - So `tube-sweep links --token X` and `tube-sweep --token X links`
//      both work
//
// 2. What is conflicts_with?
//    - clap rejects the command line if both flags appear
//    - --all and --ids are two ways to express one selection, so giving
//      both is ambiguous and refused up front
//
// 3. What is value_delimiter?
//    - Splits one argument on a character into a Vec
//    - `--ids a,b,c` becomes vec!["a", "b", "c"]
// -----------------------------------------------------------------------------
