//! Reiseplan command-line interface.
//!
//! A terminal front-end for the `reiseplan_core` collection: manage the
//! notes of a trip, move them between replicas over the clipboard or a
//! Matrix room, and keep everything in a local SQLite database.

/// CLI module - command-line interface for reiseplan
mod cli;

fn main() {
    cli::run_cli();
}
