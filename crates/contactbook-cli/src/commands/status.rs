//! Status command handler

use anyhow::Result;

use contactbook_core::{Config, ContactStore};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &ContactStore, config: &Config, output: &Output) -> Result<()> {
    let storage_dir = config.storage_dir();
    let policy = store.options().sync_policy;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage_dir": storage_dir,
                    "device_contacts_path": config.device_contacts_path,
                    "sync_policy": policy.to_string(),
                    "unsaved_changes": store.is_dirty(),
                    "counts": {
                        "contacts": store.contacts().len()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.contacts().len());
        }
        OutputFormat::Human => {
            println!("contactbook Status");
            println!("==================");
            println!();
            println!("Storage:");
            println!("  Location: {}", storage_dir.display());
            if store.is_dirty() {
                println!("  Unsaved changes pending");
            }
            println!();
            println!("Address book:");
            match config.device_contacts_path {
                Some(ref path) => println!("  Source: {}", path.display()),
                None => println!("  Source: (not set)"),
            }
            println!("  Policy: {}", policy);
            println!();
            println!("Contents:");
            println!("  Contacts: {}", store.contacts().len());
        }
    }

    Ok(())
}
