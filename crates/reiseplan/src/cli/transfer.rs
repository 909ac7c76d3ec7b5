//! Handlers for export and import over the transport channels, and for
//! the Matrix session commands (login, logout)

use std::io::{self, Write};

use reiseplan_core::config::Config;
use reiseplan_core::planner::Planner;
use reiseplan_core::transport::{login_to_matrix, MatrixLog};

use super::args::Channel;
use super::CliSink;

/// Export the collection over the chosen channel
pub fn handle_export(planner: &Planner, channel: Channel, config: &Config) -> bool {
    match channel {
        Channel::Clipboard => planner.export_clipboard(),
        Channel::Matrix { room } => match matrix_log(config, room) {
            Some(log) => planner.export_remote(&log),
            None => false,
        },
    }
}

/// Import a collection over the chosen channel, replacing the local one
pub fn handle_import(planner: &Planner, channel: Channel, config: &Config) -> bool {
    match channel {
        Channel::Clipboard => planner.import_clipboard(),
        Channel::Matrix { room } => match matrix_log(config, room) {
            Some(log) => planner.import_remote(&log),
            None => false,
        },
    }
}

/// Build a Matrix log from the stored session and the configured (or
/// overridden) room, explaining what is missing when it cannot be built
fn matrix_log(config: &Config, room_override: Option<String>) -> Option<MatrixLog> {
    let session = match config.session() {
        Some(session) => session,
        None => {
            eprintln!("✗ Not logged in. Run 'reiseplan login <username>' first.");
            return None;
        }
    };

    let room = match room_override.or_else(|| config.room_id.clone()) {
        Some(room) => room,
        None => {
            eprintln!("✗ No room configured. Pass --room or run 'reiseplan room <room-id>'.");
            return None;
        }
    };

    match MatrixLog::new(config.homeserver(), &room, session) {
        Ok(log) => Some(log),
        Err(e) => {
            eprintln!("✗ Could not set up the Matrix client: {}", e);
            None
        }
    }
}

/// Log in to Matrix with a password prompt and store the session
pub fn handle_login(username: &str, homeserver: Option<String>, config: &Config) -> bool {
    let homeserver = homeserver.unwrap_or_else(|| config.homeserver().to_string());

    print!("Password for {}: ", username);
    io::stdout().flush().unwrap();

    let mut password = String::new();
    if io::stdin().read_line(&mut password).is_err() {
        eprintln!("✗ Failed to read input");
        return false;
    }
    // Only strip the line ending; passwords may contain spaces
    let password = password.trim_end_matches(['\r', '\n']);

    match login_to_matrix(&homeserver, username, password, &CliSink) {
        Some(session) => {
            let mut new_config = config.clone();
            new_config.homeserver_url = Some(homeserver);
            new_config.set_session(&session);
            if let Err(e) = new_config.save() {
                eprintln!("Warning: Could not save config: {}", e);
            }
            println!("  Logged in as {}", session.user_id());
            true
        }
        None => false,
    }
}

/// Forget the stored Matrix session. Homeserver and room stay configured
/// so logging back in is a single command.
pub fn handle_logout(config: &Config) -> bool {
    if config.session().is_none() {
        println!("Not logged in.");
        return true;
    }

    let mut new_config = config.clone();
    new_config.session_user_id = None;
    new_config.session_access_token = None;
    if let Err(e) = new_config.save() {
        eprintln!("✗ Could not save config: {}", e);
        return false;
    }

    println!("✓ Logged out.");
    true
}
