//! Command-line interface for reiseplan
//!
//! Wires the core `Planner` to the terminal: notes are listed and edited
//! through subcommands, exports go to stdout, imports come from stdin,
//! and the Matrix channel shares a collection between machines.

/// Argument parsing - clap command and option definitions
mod args;

/// Note commands - add, list, edit, remove and date queries
mod notes;

/// Transfer commands - export, import and the Matrix session
mod transfer;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use reiseplan_core::config::Config;
use reiseplan_core::crdt::{MemoryStorage, MirrorStorage, SqliteStorage};
use reiseplan_core::error::Result;
use reiseplan_core::notify::{NotificationSink, Severity, Toast};
use reiseplan_core::planner::Planner;
use reiseplan_core::transport::Clipboard;

use args::{Cli, Commands};

/// Main entry point for the CLI application
pub fn run_cli() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Could not read config: {}", e);
            std::process::exit(1);
        }
    };

    let db_path = cli.database.clone().unwrap_or_else(default_db_path);
    let storage = open_storage(&db_path);
    let storage_key = cli
        .storage_key
        .clone()
        .unwrap_or_else(|| config.storage_key.clone());
    log::debug!("Using database {} (collection '{}')", db_path.display(), storage_key);

    let planner = Planner::new(
        Arc::clone(&storage),
        Arc::new(StdioClipboard),
        Arc::new(CliSink),
        &storage_key,
    );

    let success = match cli.command {
        Commands::Add {
            name,
            start,
            end,
            participants,
            sleeping_place,
            note,
        } => notes::handle_add(&planner, &name, start, end, participants, sleeping_place, note),
        Commands::List { json } => notes::handle_list(&planner, json),
        Commands::Edit {
            id,
            name,
            start,
            end,
            participants,
            sleeping_place,
            note,
        } => notes::handle_edit(&planner, &id, name, start, end, participants, sleeping_place, note),
        Commands::Remove { id } => notes::handle_remove(&planner, &id),
        Commands::SetLocation { id, lat, lng, clear } => {
            notes::handle_set_location(&planner, &id, lat, lng, clear)
        }
        Commands::FreeDay => notes::handle_free_day(&planner),
        Commands::Export { channel } => transfer::handle_export(&planner, channel, &config),
        Commands::Import { channel } => transfer::handle_import(&planner, channel, &config),
        Commands::Login { username, homeserver } => {
            transfer::handle_login(&username, homeserver, &config)
        }
        Commands::Logout => transfer::handle_logout(&config),
        Commands::Room { room } => handle_room(room, &config),
        Commands::Key { key } => handle_key(key, &config, storage.as_ref()),
        Commands::Config => {
            show_config(&config, &db_path);
            true
        }
    };

    // Flush the pending mirror write before the process exits
    planner.close();

    if !success {
        std::process::exit(1);
    }
}

/// Default location of the notes database under the platform data directory
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reiseplan")
        .join("notes.db")
}

/// Open the SQLite store at `path`, falling back to an in-memory store
/// (with a warning) so note commands still work without persistence
fn open_storage(path: &Path) -> Arc<dyn MirrorStorage> {
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Warning: Could not create {}: {}", parent.display(), e);
    }
    match SqliteStorage::open(path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            eprintln!(
                "Warning: Could not open {}: {}. Changes will not be saved.",
                path.display(),
                e
            );
            Arc::new(MemoryStorage::new())
        }
    }
}

/// Show or switch the active collection key
fn handle_key(key: Option<String>, config: &Config, storage: &dyn MirrorStorage) -> bool {
    match key {
        Some(new_key) => {
            let mut new_config = config.clone();
            new_config.storage_key = new_key.clone();
            if let Err(e) = new_config.save() {
                eprintln!("✗ Could not save config: {}", e);
                return false;
            }
            println!("✓ Switched to collection '{}'", new_key);
            true
        }
        None => {
            println!("Active collection: {}", config.storage_key);
            match storage.list_keys() {
                Ok(keys) => {
                    for key in keys {
                        if key == config.storage_key {
                            println!("  {} (active)", key);
                        } else {
                            println!("  {}", key);
                        }
                    }
                }
                Err(e) => eprintln!("Warning: Could not list collections: {}", e),
            }
            true
        }
    }
}

/// Show or set the Matrix room used by `export matrix` / `import matrix`
fn handle_room(room: Option<String>, config: &Config) -> bool {
    match room {
        Some(room_id) => {
            let mut new_config = config.clone();
            new_config.room_id = Some(room_id.clone());
            if let Err(e) = new_config.save() {
                eprintln!("✗ Could not save config: {}", e);
                return false;
            }
            println!("✓ Matrix room set to {}", room_id);
            true
        }
        None => {
            match &config.room_id {
                Some(room_id) => println!("Matrix room: {}", room_id),
                None => println!("No Matrix room configured. Set one with 'reiseplan room <room-id>'."),
            }
            true
        }
    }
}

/// Print the resolved configuration
fn show_config(config: &Config, db_path: &Path) {
    println!("Reiseplan Configuration");
    println!("=======================");
    println!("Collection:  {}", config.storage_key);
    println!("Database:    {}", db_path.display());
    println!("Homeserver:  {}", config.homeserver());
    match &config.room_id {
        Some(room_id) => println!("Room:        {}", room_id),
        None => println!("Room:        (not set)"),
    }
    match config.session() {
        Some(session) => println!("Logged in:   {}", session.user_id()),
        None => println!("Logged in:   no"),
    }
    match Config::config_path() {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (no config directory)"),
    }
}

/// Notification sink that prints outcome toasts as ✓/✗ lines on stderr,
/// keeping stdout reserved for data such as exports and listings
pub struct CliSink;

impl NotificationSink for CliSink {
    fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Success => eprintln!("✓ {}", toast.description),
            Severity::Error => eprintln!("✗ {}", toast.description),
        }
    }
}

/// Clipboard backed by the terminal: writes go to stdout and reads drain
/// stdin, so exports pipe straight into files or other replicas
pub struct StdioClipboard;

impl Clipboard for StdioClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn read_text(&self) -> Result<String> {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}
