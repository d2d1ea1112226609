//! Address book sync
//!
//! Imports contacts from a [`DeviceContactsSource`](crate::device::DeviceContactsSource)
//! and merges them into the local list.
//!
//! ## Merge rules
//!
//! 1. Device entries without a phone number are skipped
//! 2. Entries are keyed by their digit-normalized phone number
//! 3. Local contacts are inserted first, device entries after them
//! 4. On a phone conflict the [`SyncPolicy`] decides who wins; a local
//!    contact replaced by device data keeps its local ID
//! 5. Several device entries sharing a number collapse to the last one

mod merge;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use merge::{contact_from_device, merge_contacts, MergeResult, NO_NAME, NO_PHONE};

/// Conflict policy when a device contact shares a phone with a local one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPolicy {
    /// Device data replaces the local contact's fields
    #[default]
    #[serde(rename = "overwrite")]
    OverwriteWithDevice,
    /// The local contact is left untouched
    #[serde(rename = "keep-local")]
    KeepLocal,
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPolicy::OverwriteWithDevice => write!(f, "overwrite"),
            SyncPolicy::KeepLocal => write!(f, "keep-local"),
        }
    }
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" | "overwrite-with-device" => Ok(SyncPolicy::OverwriteWithDevice),
            "keep-local" | "keep_local" | "keep" => Ok(SyncPolicy::KeepLocal),
            other => Err(format!(
                "unknown sync policy '{}' (expected 'overwrite' or 'keep-local')",
                other
            )),
        }
    }
}

/// Counts describing what a sync changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Device entries returned by the source
    pub fetched: usize,
    /// New contacts added to the list
    pub added: usize,
    /// Local contacts whose fields were replaced
    pub updated: usize,
    /// Device entries dropped (no phone, duplicate, or kept local)
    pub skipped: usize,
    /// Contacts in the list after the merge
    pub total: usize,
}

/// How a sync attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(SyncReport),
    /// Address book access was refused; the user can grant it and retry
    PermissionDenied,
    /// The source failed; nothing was changed
    Failed(String),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("overwrite".parse::<SyncPolicy>(), Ok(SyncPolicy::OverwriteWithDevice));
        assert_eq!("Keep-Local".parse::<SyncPolicy>(), Ok(SyncPolicy::KeepLocal));
        assert!("merge".parse::<SyncPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_matches_serde() {
        for policy in [SyncPolicy::OverwriteWithDevice, SyncPolicy::KeepLocal] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{}\"", policy));
            assert_eq!(policy.to_string().parse::<SyncPolicy>(), Ok(policy));
        }
    }
}
