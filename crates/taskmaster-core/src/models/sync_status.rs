//! Sync status model

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the last or current reconciliation attempt.
///
/// Transitions: `None -> Pending -> {Synced, Failed}`, and back to `Pending`
/// from `Synced`/`Failed` on the next sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    None,
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Pending => 1,
            Self::Synced => 2,
            Self::Failed => 3,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Pending,
            2 => Self::Synced,
            3 => Self::Failed,
            _ => Self::None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_encoding_is_lossless() {
        for status in [
            SyncStatus::None,
            SyncStatus::Pending,
            SyncStatus::Synced,
            SyncStatus::Failed,
        ] {
            assert_eq!(SyncStatus::from_u8(status.to_u8()), status);
        }
    }
}
