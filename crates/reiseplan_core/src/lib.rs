#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Replicated collection (CRDT) and durable mirror
pub mod crdt;

/// Error (common error types)
pub mod error;

/// Core data types (notes, dates, locations)
pub mod model;

/// User-facing outcome notifications
pub mod notify;

/// Position-derived entry colors
pub mod palette;

/// The main Reiseplan instance
pub mod planner;

/// Date-slot allocation for new entries
pub mod schedule;

/// Cancellable waits for map selections
pub mod selection;

/// Transport channels (clipboard, remote log)
pub mod transport;
