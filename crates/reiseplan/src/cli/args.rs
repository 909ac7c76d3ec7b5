//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reiseplan")]
#[command(version)]
#[command(about = "A replicated, offline-first trip planner", long_about = None)]
pub struct Cli {
    /// Storage key selecting which collection to open
    #[arg(short = 'k', long, global = true)]
    pub storage_key: Option<String>,

    /// Path to the notes database (default: the platform data directory)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a stop to the trip
    Add {
        /// Name of the stop
        name: String,

        /// First day, YYYY-MM-DD (default: the next free day)
        #[arg(short, long)]
        start: Option<String>,

        /// Last day inclusive, YYYY-MM-DD (default: same as start)
        #[arg(short, long)]
        end: Option<String>,

        /// Who is coming along
        #[arg(short, long)]
        participants: Option<String>,

        /// Where to sleep
        #[arg(long)]
        sleeping_place: Option<String>,

        /// Free-text note line (repeatable)
        #[arg(short, long)]
        note: Vec<String>,
    },

    /// List the trip in order
    #[command(alias = "ls")]
    List {
        /// Print the raw JSON wire format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Edit fields of an existing stop
    Edit {
        /// Id (or unique id prefix) of the stop
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New first day, YYYY-MM-DD
        #[arg(short, long)]
        start: Option<String>,

        /// New last day inclusive, YYYY-MM-DD
        #[arg(short, long)]
        end: Option<String>,

        /// New participants
        #[arg(short, long)]
        participants: Option<String>,

        /// New sleeping place
        #[arg(long)]
        sleeping_place: Option<String>,

        /// Append a free-text note line (repeatable)
        #[arg(long)]
        note: Vec<String>,
    },

    /// Remove a stop
    #[command(alias = "rm")]
    Remove {
        /// Id (or unique id prefix) of the stop
        id: String,
    },

    /// Set or clear a stop's map location
    SetLocation {
        /// Id (or unique id prefix) of the stop
        id: String,

        /// Latitude in degrees
        #[arg(required_unless_present = "clear")]
        lat: Option<f64>,

        /// Longitude in degrees
        #[arg(required_unless_present = "clear")]
        lng: Option<f64>,

        /// Remove the location instead of setting one
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        clear: bool,
    },

    /// Show the next free day for a new stop
    FreeDay,

    /// Export the trip to another replica
    Export {
        #[command(subcommand)]
        channel: Channel,
    },

    /// Import a trip, replacing the local one
    Import {
        #[command(subcommand)]
        channel: Channel,
    },

    /// Log in to Matrix and store the session
    Login {
        /// Matrix username (localpart or full user id)
        username: String,

        /// Homeserver URL (default: the configured one)
        #[arg(long)]
        homeserver: Option<String>,
    },

    /// Forget the stored Matrix session
    Logout,

    /// Show or set the Matrix room used for export and import
    Room {
        /// Room id or alias (shows the current one when omitted)
        room: Option<String>,
    },

    /// Show or switch the active collection
    Key {
        /// Storage key to make active (shows the current one when omitted)
        key: Option<String>,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
pub enum Channel {
    /// The clipboard (stdout on export, stdin on import)
    Clipboard,

    /// The configured Matrix room
    Matrix {
        /// Room id or alias (default: the configured room)
        #[arg(long)]
        room: Option<String>,
    },
}
