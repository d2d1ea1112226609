//! Sync command handler

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use contactbook_core::{Config, ContactStore, JsonFileDeviceSource, SyncOutcome};

use crate::output::Output;

/// Import contacts from the device address book export
pub async fn sync(
    store: &mut ContactStore,
    config: &Config,
    source: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let Some(path) = source.or_else(|| config.device_contacts_path.clone()) else {
        bail!(
            "Address book source not configured. Set it with:\n  \
             contactbook config set device_contacts_path /path/to/contacts.json\n\
             or pass --source"
        );
    };

    output.message(&format!("Reading address book from {}...", path.display()));

    let device = JsonFileDeviceSource::new(path.clone());
    match store.sync_contacts(&device).await {
        SyncOutcome::Synced(report) => {
            output.print_sync_report(&report);
            if report.fetched == 0 {
                output.warn("Address book is empty; contacts left unchanged");
            }
            Ok(())
        }
        SyncOutcome::PermissionDenied => bail!("{}", permission_denied_hint(&path)),
        SyncOutcome::Failed(reason) => {
            bail!("Failed to sync contacts: {}", reason);
        }
    }
}

fn permission_denied_hint(path: &Path) -> String {
    format!(
        "Permission to read the address book was denied.\n\
         Check that {} exists and is readable, or point at another export with:\n  \
         contactbook config set device_contacts_path /path/to/contacts.json",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_hint_names_config_key() {
        let hint = permission_denied_hint(Path::new("/tmp/missing.json"));
        assert!(hint.contains("/tmp/missing.json"));
        assert!(hint.contains("contactbook config set device_contacts_path"));
    }
}
