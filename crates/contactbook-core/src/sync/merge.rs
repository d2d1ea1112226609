//! Device-to-local mapping and phone-keyed merge

use std::collections::{HashMap, HashSet};

use super::{SyncPolicy, SyncReport};
use crate::device::DeviceContact;
use crate::models::{new_contact_id, normalize_phone, sort_by_name, Contact};

/// Name given to device entries without one
pub const NO_NAME: &str = "No Name";

/// Phone stored for device entries whose number has no digits
pub const NO_PHONE: &str = "No Phone";

/// Merged list plus what changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub contacts: Vec<Contact>,
    pub report: SyncReport,
}

/// Map a device entry to a contact
///
/// Returns `None` for entries without any phone number. The contact gets a
/// fresh local ID; device IDs are not reused.
pub fn contact_from_device(device: &DeviceContact) -> Option<Contact> {
    if !device.has_phone_number() {
        return None;
    }

    let name = device
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(NO_NAME);

    let phone = device
        .first_phone()
        .map(normalize_phone)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| NO_PHONE.to_string());

    let mut contact = Contact::with_id(new_contact_id(), name, phone);
    contact.set_email(
        device
            .first_email()
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string),
    );
    contact.set_photo(device.image_uri().map(str::to_string));
    Some(contact)
}

/// Merge device entries into the existing list
///
/// The result is deduplicated by normalized phone and sorted by name.
pub fn merge_contacts(
    existing: &[Contact],
    device: &[DeviceContact],
    policy: SyncPolicy,
) -> MergeResult {
    let mut merged: Vec<Contact> = Vec::with_capacity(existing.len() + device.len());
    let mut by_phone: HashMap<String, usize> = HashMap::new();

    for contact in existing {
        match by_phone.get(&contact.phone_key()) {
            Some(&i) => merged[i] = contact.clone(),
            None => {
                by_phone.insert(contact.phone_key(), merged.len());
                merged.push(contact.clone());
            }
        }
    }

    let local_count = merged.len();
    let mut report = SyncReport {
        fetched: device.len(),
        ..SyncReport::default()
    };
    let mut updated: HashSet<usize> = HashSet::new();

    for entry in device {
        let Some(incoming) = contact_from_device(entry) else {
            report.skipped += 1;
            continue;
        };

        let key = incoming.phone_key();
        match by_phone.get(&key).copied() {
            None => {
                by_phone.insert(key, merged.len());
                merged.push(incoming);
                report.added += 1;
            }
            Some(i) if i < local_count => match policy {
                SyncPolicy::OverwriteWithDevice => {
                    let replacement = Contact {
                        id: merged[i].id.clone(),
                        ..incoming
                    };
                    if merged[i] != replacement {
                        merged[i] = replacement;
                        updated.insert(i);
                    }
                }
                SyncPolicy::KeepLocal => report.skipped += 1,
            },
            Some(i) => {
                // Same number listed twice on the device: last entry wins
                let replacement = Contact {
                    id: merged[i].id.clone(),
                    ..incoming
                };
                merged[i] = replacement;
                report.skipped += 1;
            }
        }
    }

    report.updated = updated.len();
    report.total = merged.len();
    sort_by_name(&mut merged);

    MergeResult {
        contacts: merged,
        report,
    }
}
