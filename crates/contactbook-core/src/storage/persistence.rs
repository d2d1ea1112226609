//! Contact list persistence
//!
//! Handles saving and loading the contact list to/from a key-value backend.
//! The whole list is stored as one JSON array under [`CONTACTS_KEY`]:
//!
//! ```text
//! [{"id": "...", "name": "...", "phone": "...", "email": "...", "photo": "..."}]
//! ```
//!
//! There is no schema version; optional fields are simply omitted.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;
use crate::models::Contact;

/// Key holding the contact list
pub const CONTACTS_KEY: &str = "contacts";

/// Key receiving an unparsable contact list before it is replaced
pub const CONTACTS_BACKUP_KEY: &str = "contacts.corrupt";

/// Result of reading the persisted list
///
/// Loading never fails: missing or unreadable data yields an empty list,
/// with the reason kept in `problem` for the caller to report.
#[derive(Debug, Default)]
pub struct LoadedContacts {
    pub contacts: Vec<Contact>,
    pub problem: Option<StorageError>,
}

impl LoadedContacts {
    /// Storage could not be read at all, as opposed to read but unparsable
    ///
    /// The stored list may still exist, so it must not be overwritten.
    pub fn is_unreadable(&self) -> bool {
        matches!(self.problem, Some(ref e) if !matches!(e, StorageError::CorruptValue { .. }))
    }
}

/// Persistence layer for the contact list
#[derive(Clone)]
pub struct ContactPersistence {
    backend: Arc<dyn KeyValueStore>,
}

impl ContactPersistence {
    /// Create a persistence handler on top of a backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Access the underlying backend
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Load the stored contact list
    ///
    /// An unparsable value is copied to [`CONTACTS_BACKUP_KEY`] so the next
    /// save does not destroy it.
    pub async fn load(&self) -> LoadedContacts {
        let raw = match self.backend.get(CONTACTS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored contacts, starting empty");
                return LoadedContacts::default();
            }
            Err(e) => {
                warn!("Failed to read stored contacts: {}", e);
                return LoadedContacts {
                    contacts: Vec::new(),
                    problem: Some(e),
                };
            }
        };

        match serde_json::from_str::<Option<Vec<Contact>>>(&raw) {
            Ok(contacts) => {
                let contacts = contacts.unwrap_or_default();
                debug!("Loaded {} stored contacts", contacts.len());
                LoadedContacts {
                    contacts,
                    problem: None,
                }
            }
            Err(e) => {
                warn!("Stored contacts are unreadable: {}", e);
                if let Err(backup_err) = self.backend.set(CONTACTS_BACKUP_KEY, &raw).await {
                    warn!("Failed to back up unreadable contacts: {}", backup_err);
                }
                LoadedContacts {
                    contacts: Vec::new(),
                    problem: Some(StorageError::CorruptValue {
                        key: CONTACTS_KEY.to_string(),
                        backup_key: CONTACTS_BACKUP_KEY.to_string(),
                        details: e.to_string(),
                    }),
                }
            }
        }
    }

    /// Overwrite the stored list
    pub async fn save(&self, contacts: &[Contact]) -> StorageResult<()> {
        let json = serde_json::to_string(contacts)?;
        self.backend.set(CONTACTS_KEY, &json).await?;
        debug!("Saved {} contacts", contacts.len());
        Ok(())
    }

    /// Remove the stored list entirely
    pub async fn clear(&self) -> StorageResult<()> {
        self.backend.remove(CONTACTS_KEY).await?;
        debug!("Removed stored contacts");
        Ok(())
    }
}
