//! contactbook Core Library
//!
//! This crate provides the core functionality for contactbook, a local
//! contact manager: a sorted, searchable contact list persisted as one JSON
//! blob, with optional import from a device address book.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = ContactStore::open_with_config(&config).await;
//!
//! // Add a contact
//! match store.add_contact(ContactDraft::new("Bob", "555-0100")).await {
//!     Some(index) => store.scroll_to_contact(Some(index)),
//!     None => println!("phone number already in use"),
//! }
//!
//! // Search
//! store.filter_contacts("bo");
//! ```
//!
//! # Modules
//!
//! - `store`: the contact store (main entry point)
//! - `models`: `Contact`, `ContactDraft`, phone normalization, name ordering
//! - `storage`: key-value backends and contact list persistence
//! - `device`: device address book access
//! - `sync`: mapping and merging address book entries
//! - `config`: Application configuration

pub mod config;
pub mod device;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use device::{
    ContactField, DeviceContact, DeviceContactsSource, DeviceError, JsonFileDeviceSource,
    PermissionStatus,
};
pub use models::{normalize_phone, Contact, ContactDraft, ValidationError};
pub use storage::{
    ContactPersistence, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError,
    StorageIssue,
};
pub use store::{ContactStore, StoreEvent, StoreOptions};
pub use sync::{SyncOutcome, SyncPolicy, SyncReport};
