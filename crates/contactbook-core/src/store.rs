//! Contact store
//!
//! `ContactStore` owns the authoritative contact list and the filtered view
//! shown to the user, and persists every mutation through
//! [`ContactPersistence`].
//!
//! ## Lifecycle
//!
//! A store starts in the loading state. [`ContactStore::load`] reads the
//! persisted list once and moves it to ready; that transition is never
//! reversed.
//!
//! ## Failure signalling
//!
//! Operations do not return errors. Invalid drafts and conflicts come back
//! as `None`, unknown IDs are silent no-ops, and storage or address book
//! failures are logged and reported as [`StoreEvent`]s. A failed write leaves
//! the in-memory list as mutated and marks the store dirty;
//! [`ContactStore::flush`] (or the next successful write) brings storage back
//! in line.
//!
//! When the stored list could not be read at all, nothing is written over it.
//! Each later write first re-reads storage and folds the stored contacts into
//! the in-memory list; until that succeeds, writes stay pending.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = ContactStore::open_with_config(&config).await;
//!
//! let index = store.add_contact(ContactDraft::new("Bob", "555")).await;
//! store.scroll_to_contact(index);
//!
//! store.filter_contacts("bo");
//! let visible = store.filtered_contacts();
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_HIGHLIGHT_MS};
use crate::device::{ContactField, DeviceContactsSource, DeviceError, PermissionStatus};
use crate::models::{new_contact_id, normalize_phone, sort_by_name, Contact, ContactDraft};
use crate::storage::{ContactPersistence, FileKeyValueStore, StorageError, StorageIssue};
use crate::sync::{merge_contacts, SyncOutcome, SyncPolicy, SyncReport};

/// Fields requested from the device on sync
const SYNC_FIELDS: &[ContactField] = &[ContactField::PhoneNumbers, ContactField::Emails];

/// Tunables for a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long `scroll_to_contact` keeps a contact highlighted
    pub highlight_duration: Duration,
    /// Conflict policy for address book sync
    pub sync_policy: SyncPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            highlight_duration: Duration::from_millis(DEFAULT_HIGHLIGHT_MS),
            sync_policy: SyncPolicy::default(),
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            highlight_duration: config.highlight_duration(),
            sync_policy: config.sync_policy,
        }
    }
}

/// Signals for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Scroll the visible list to this index
    ScrollTo(usize),
    /// Stored contacts could not be read; the store started empty
    LoadFailed(StorageIssue),
    /// A write did not reach storage
    PersistFailed(StorageIssue),
    /// Address book access was refused
    SyncPermissionDenied,
    /// Address book sync failed
    SyncFailed(String),
    /// Address book sync completed
    Synced(SyncReport),
}

/// Write that still has to reach storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingWrite {
    Save,
    Clear,
}

/// In-memory contact list backed by persistent storage
pub struct ContactStore {
    persistence: ContactPersistence,
    options: StoreOptions,
    /// Sorted by name
    contacts: Vec<Contact>,
    /// Subset of `contacts` matching `search_query`
    filtered: Vec<Contact>,
    search_query: String,
    loading: bool,
    pending: Option<PendingWrite>,
    /// Load hit a read error; stored data may exist that we have not seen
    read_failed: bool,
    highlight: Arc<watch::Sender<Option<String>>>,
    highlight_timer: Option<JoinHandle<()>>,
    event_tx: mpsc::UnboundedSender<StoreEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<StoreEvent>>,
}

impl ContactStore {
    /// Create a store in the loading state
    pub fn new(persistence: ContactPersistence, options: StoreOptions) -> Self {
        let (highlight, _) = watch::channel(None);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            persistence,
            options,
            contacts: Vec::new(),
            filtered: Vec::new(),
            search_query: String::new(),
            loading: true,
            pending: None,
            read_failed: false,
            highlight: Arc::new(highlight),
            highlight_timer: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Open the file-backed store described by `config` and load it
    pub async fn open_with_config(config: &Config) -> Self {
        let backend = Arc::new(FileKeyValueStore::new(config.storage_dir()));
        let mut store = Self::new(ContactPersistence::new(backend), StoreOptions::from(config));
        store.load().await;
        store
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<StoreEvent>> {
        self.event_rx.take()
    }

    // ==================== State ====================

    /// All contacts, sorted by name
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Contacts matching the current search query
    pub fn filtered_contacts(&self) -> &[Contact] {
        &self.filtered
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// True until the first `load` completes
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// ID of the currently highlighted contact
    pub fn highlighted_contact_id(&self) -> Option<String> {
        self.highlight.borrow().clone()
    }

    /// Observe highlight changes, including the timed clear
    pub fn watch_highlight(&self) -> watch::Receiver<Option<String>> {
        self.highlight.subscribe()
    }

    /// True when a write has not reached storage yet
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Change the conflict policy used by later syncs
    pub fn set_sync_policy(&mut self, policy: SyncPolicy) {
        self.options.sync_policy = policy;
    }

    /// Look up a contact by ID
    pub fn get_contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Position of a contact in the visible list
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.filtered.iter().position(|c| c.id == id)
    }

    // ==================== Operations ====================

    /// Read the persisted list and leave the loading state
    ///
    /// Missing or unreadable data starts an empty list. Calling this again
    /// after the store is ready does nothing.
    pub async fn load(&mut self) {
        if !self.loading {
            debug!("Contact store already loaded");
            return;
        }

        let loaded = self.persistence.load().await;
        self.read_failed = loaded.is_unreadable();
        if let Some(ref problem) = loaded.problem {
            self.emit(StoreEvent::LoadFailed(StorageIssue::from(problem)));
        }

        let mut contacts = loaded.contacts;
        sort_by_name(&mut contacts);
        self.filtered = contacts.clone();
        self.contacts = contacts;
        self.loading = false;

        info!("Loaded {} contacts", self.contacts.len());
    }

    /// Update the search query and the filtered view
    ///
    /// A contact matches when its name or email contains the query
    /// (case-insensitive), or its phone digits contain the query's digits.
    /// An empty query shows every contact.
    pub fn filter_contacts(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.filtered = if query.is_empty() {
            self.contacts.clone()
        } else {
            self.contacts
                .iter()
                .filter(|c| matches_query(c, query))
                .cloned()
                .collect()
        };
    }

    /// Add a contact
    ///
    /// Returns the new contact's index in the sorted list, or `None` when
    /// the draft is invalid or another contact already has the same phone
    /// number. The search query is cleared so the index is valid for the
    /// visible list.
    pub async fn add_contact(&mut self, draft: ContactDraft) -> Option<usize> {
        if let Err(e) = draft.validate() {
            debug!("Rejected contact: {}", e);
            return None;
        }
        let draft = draft.normalized();
        if self.phone_taken(&draft.phone, None) {
            debug!("Rejected contact with duplicate phone {}", draft.phone);
            return None;
        }

        let mut contact = draft.into_contact();
        contact.id = new_contact_id();
        let id = contact.id.clone();

        let mut updated = self.contacts.clone();
        updated.push(contact);
        self.replace_all(updated).await;

        debug!("Added contact {}", id);
        self.index_of(&id)
    }

    /// Replace the contact with the draft's ID
    ///
    /// Returns the contact's new index, or `None` when the ID is unknown, the
    /// draft is invalid, or the phone number belongs to a different contact.
    /// A phone left as stored is kept verbatim.
    pub async fn edit_contact(&mut self, draft: ContactDraft) -> Option<usize> {
        let id = draft.id.clone()?;

        let Some(pos) = self.contacts.iter().position(|c| c.id == id) else {
            debug!("Edit of unknown contact {}", id);
            return None;
        };
        let current = &self.contacts[pos];
        if let Err(e) = draft.validate_edit(current) {
            debug!("Rejected edit of {}: {}", id, e);
            return None;
        }

        let keeps_phone = draft.keeps_phone_of(current);
        let mut draft = draft.normalized();
        if keeps_phone {
            draft.phone = current.phone.clone();
        } else if self.phone_taken(&draft.phone, Some(&id)) {
            debug!("Rejected edit of {}: phone {} in use", id, draft.phone);
            return None;
        }

        let mut updated = self.contacts.clone();
        updated[pos] = draft.into_contact();
        self.replace_all(updated).await;

        debug!("Edited contact {}", id);
        self.index_of(&id)
    }

    /// Remove a contact by ID
    ///
    /// Returns whether a contact was removed; unknown IDs change nothing.
    pub async fn delete_contact(&mut self, id: &str) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.id != id);
        if self.contacts.len() == before {
            debug!("Delete of unknown contact {}", id);
            return false;
        }
        self.filtered.retain(|c| c.id != id);

        if self.highlighted_contact_id().as_deref() == Some(id) {
            self.clear_highlight();
        }

        self.write(PendingWrite::Save).await;
        debug!("Deleted contact {}", id);
        true
    }

    /// Remove every contact and the stored entry itself
    pub async fn delete_all_contacts(&mut self) {
        self.contacts.clear();
        self.filtered.clear();
        self.clear_highlight();
        self.write(PendingWrite::Clear).await;
        info!("Deleted all contacts");
    }

    /// Highlight the visible contact at `index` and ask the UI to scroll to it
    ///
    /// `None` or an out-of-range index does nothing. The highlight clears
    /// after the configured duration unless a newer highlight replaces it
    /// first.
    pub fn scroll_to_contact(&mut self, index: Option<usize>) {
        let Some(index) = index else {
            return;
        };
        let Some(contact) = self.filtered.get(index) else {
            debug!("Scroll index {} out of range", index);
            return;
        };

        let id = contact.id.clone();
        self.clear_highlight();
        self.highlight.send_replace(Some(id));
        self.emit(StoreEvent::ScrollTo(index));

        let highlight = Arc::clone(&self.highlight);
        let delay = self.options.highlight_duration;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.highlight_timer = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    highlight.send_replace(None);
                }));
            }
            Err(_) => warn!("No async runtime; highlight will not clear on its own"),
        }
    }

    /// Import contacts from the device address book
    ///
    /// Permission is requested when not already granted. On denial or
    /// source failure the list is left unchanged.
    pub async fn sync_contacts(&mut self, source: &dyn DeviceContactsSource) -> SyncOutcome {
        let status = match source.permission_status().await {
            Ok(PermissionStatus::Granted) => PermissionStatus::Granted,
            Ok(_) => match source.request_permission().await {
                Ok(status) => status,
                Err(e) => return self.sync_failed(e),
            },
            Err(e) => return self.sync_failed(e),
        };

        if !status.is_granted() {
            info!("Address book permission denied");
            self.emit(StoreEvent::SyncPermissionDenied);
            return SyncOutcome::PermissionDenied;
        }

        let device = match source.fetch_contacts(SYNC_FIELDS).await {
            Ok(device) => device,
            Err(e) => return self.sync_failed(e),
        };

        let result = merge_contacts(&self.contacts, &device, self.options.sync_policy);
        if !device.is_empty() {
            self.replace_all(result.contacts).await;
        }

        let report = result.report;
        info!(
            "Synced address book: {} fetched, {} added, {} updated, {} total",
            report.fetched, report.added, report.updated, report.total
        );
        self.emit(StoreEvent::Synced(report));
        SyncOutcome::Synced(report)
    }

    /// Retry a write that previously failed
    ///
    /// Returns true when storage matches the in-memory list.
    pub async fn flush(&mut self) -> bool {
        match self.pending {
            Some(pending) => self.write(pending).await,
            None => true,
        }
    }

    // ==================== Internals ====================

    /// Install a new full list: sort, reset the search, persist
    async fn replace_all(&mut self, mut contacts: Vec<Contact>) {
        sort_by_name(&mut contacts);
        self.search_query.clear();
        self.filtered = contacts.clone();
        self.contacts = contacts;
        self.write(PendingWrite::Save).await;
    }

    async fn write(&mut self, write: PendingWrite) -> bool {
        if self.read_failed && write == PendingWrite::Save {
            if let Err(e) = self.recover_stored().await {
                warn!("Stored contacts still unreadable, not overwriting: {}", e);
                self.pending = Some(write);
                self.emit(StoreEvent::PersistFailed(StorageIssue::from(&e)));
                return false;
            }
        }

        let result = match write {
            PendingWrite::Save => self.persistence.save(&self.contacts).await,
            PendingWrite::Clear => self.persistence.clear().await,
        };

        match result {
            Ok(()) => {
                self.pending = None;
                if write == PendingWrite::Clear {
                    self.read_failed = false;
                }
                true
            }
            Err(e) => {
                warn!("Failed to persist contacts: {}", e);
                self.pending = Some(write);
                self.emit(StoreEvent::PersistFailed(StorageIssue::from(&e)));
                false
            }
        }
    }

    /// Re-read storage after a failed load and fold it into memory
    ///
    /// Stored contacts come first; in-memory contacts replace them by ID and
    /// are dropped when their phone belongs to a different stored contact.
    async fn recover_stored(&mut self) -> Result<(), StorageError> {
        let loaded = self.persistence.load().await;
        if loaded.is_unreadable() {
            return Err(loaded
                .problem
                .unwrap_or_else(|| StorageError::Unavailable("unreadable".to_string())));
        }

        let mut merged = loaded.contacts;
        for contact in std::mem::take(&mut self.contacts) {
            let key = contact.phone_key();
            if merged.iter().any(|s| s.id != contact.id && s.phone_key() == key) {
                warn!(
                    "Dropping contact {}: phone {} already stored",
                    contact.id, contact.phone
                );
                continue;
            }
            match merged.iter().position(|s| s.id == contact.id) {
                Some(pos) => merged[pos] = contact,
                None => merged.push(contact),
            }
        }

        sort_by_name(&mut merged);
        self.contacts = merged;
        self.read_failed = false;
        let query = std::mem::take(&mut self.search_query);
        self.filter_contacts(&query);

        info!("Recovered stored contacts, now {}", self.contacts.len());
        Ok(())
    }

    fn phone_taken(&self, phone: &str, except_id: Option<&str>) -> bool {
        let key = normalize_phone(phone);
        self.contacts
            .iter()
            .any(|c| Some(c.id.as_str()) != except_id && c.phone_key() == key)
    }

    fn clear_highlight(&mut self) {
        if let Some(timer) = self.highlight_timer.take() {
            timer.abort();
        }
        self.highlight.send_replace(None);
    }

    fn sync_failed(&self, error: DeviceError) -> SyncOutcome {
        warn!("Failed to sync contacts: {}", error);
        let message = error.to_string();
        self.emit(StoreEvent::SyncFailed(message.clone()));
        SyncOutcome::Failed(message)
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }
}

impl Drop for ContactStore {
    fn drop(&mut self) {
        if let Some(timer) = self.highlight_timer.take() {
            timer.abort();
        }
    }
}

/// Search predicate used by `filter_contacts`
pub fn matches_query(contact: &Contact, query: &str) -> bool {
    let lowered = query.to_lowercase();
    if contact.name.to_lowercase().contains(&lowered) {
        return true;
    }

    let digits = normalize_phone(query);
    if !digits.is_empty() && contact.phone_key().contains(&digits) {
        return true;
    }

    contact
        .email
        .as_ref()
        .is_some_and(|email| email.to_lowercase().contains(&lowered))
}
