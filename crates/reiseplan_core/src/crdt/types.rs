//! Types shared by the durable mirror and its storage backends.

use serde::{Deserialize, Serialize};

/// Origin of a logged update, recorded so history can distinguish how a
/// change entered the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOrigin {
    /// A local user mutation (append, replace, delete)
    Local,

    /// A transport import replacing the collection wholesale
    Import,

    /// An update applied from another replica's encoded state
    Remote,
}

impl std::fmt::Display for UpdateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOrigin::Local => write!(f, "local"),
            UpdateOrigin::Import => write!(f, "import"),
            UpdateOrigin::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for UpdateOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(UpdateOrigin::Local),
            "import" => Ok(UpdateOrigin::Import),
            "remote" => Ok(UpdateOrigin::Remote),
            _ => Err(format!("Unknown update origin: {}", s)),
        }
    }
}

/// One persisted update record from a mirror's log.
#[derive(Debug, Clone)]
pub struct LoggedUpdate {
    /// Unique, monotonically increasing identifier within the storage
    pub update_id: i64,

    /// Storage key of the collection this update belongs to
    pub storage_key: String,

    /// Binary yrs update data
    pub data: Vec<u8>,

    /// Unix timestamp when this update was logged (milliseconds)
    pub timestamp: i64,

    /// How the change entered the collection
    pub origin: UpdateOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_origin_display() {
        assert_eq!(UpdateOrigin::Local.to_string(), "local");
        assert_eq!(UpdateOrigin::Import.to_string(), "import");
        assert_eq!(UpdateOrigin::Remote.to_string(), "remote");
    }

    #[test]
    fn test_update_origin_from_str() {
        assert_eq!(
            "local".parse::<UpdateOrigin>().unwrap(),
            UpdateOrigin::Local
        );
        assert_eq!(
            "import".parse::<UpdateOrigin>().unwrap(),
            UpdateOrigin::Import
        );
        assert_eq!(
            "remote".parse::<UpdateOrigin>().unwrap(),
            UpdateOrigin::Remote
        );
        assert!("invalid".parse::<UpdateOrigin>().is_err());
    }
}
