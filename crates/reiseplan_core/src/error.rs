use thiserror::Error;

/// Unified error type for reiseplan operations
#[derive(Debug, Error)]
pub enum ReiseplanError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Durable mirror errors
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to decode stored update: {0}")]
    UpdateDecode(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Date errors
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote log rejected the request ({status}): {message}")]
    RemoteLog { status: u16, message: String },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // Selection coordinator
    #[error("Selection wait was cancelled")]
    SelectionCancelled,
}

/// Result type alias for reiseplan operations
pub type Result<T> = std::result::Result<T, ReiseplanError>;
