//! Storage layer
//!
//! Contacts are persisted as a single JSON array under the key `"contacts"`
//! of an async key-value store.
//!
//! ## Architecture
//!
//! - **KeyValueStore**: backend trait (`get` / `set` / `remove`)
//! - **FileKeyValueStore**: one file per key, atomic writes
//! - **MemoryKeyValueStore**: in-process map
//! - **ContactPersistence**: typed load/save of the contact list on top of a backend

pub mod error;
pub mod kv;
pub mod persistence;

pub use error::{StorageError, StorageIssue, StorageResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use persistence::{ContactPersistence, LoadedContacts, CONTACTS_BACKUP_KEY, CONTACTS_KEY};
