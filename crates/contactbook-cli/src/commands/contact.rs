//! Contact command handlers

use anyhow::{bail, Context, Result};

use contactbook_core::{normalize_phone, ContactDraft, ContactStore, ValidationError};

use crate::output::{short_id, Output};
use crate::prompt::{confirm, is_interactive, prompt_with_default};

/// Field values given on the command line
#[derive(Debug, Default)]
pub struct ContactFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

impl ContactFields {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.photo.is_none()
    }

    /// Overlay the given values on a draft; an empty string clears an optional field
    fn apply(self, draft: &mut ContactDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(phone) = self.phone {
            draft.phone = phone;
        }
        if let Some(email) = self.email {
            draft.email = Some(email);
        }
        if let Some(photo) = self.photo {
            draft.photo = Some(photo);
        }
    }
}

/// List all contacts
pub fn list(store: &ContactStore, output: &Output) -> Result<()> {
    output.print_contacts(store.contacts(), None);
    Ok(())
}

/// Show a single contact
pub fn show(store: &ContactStore, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let contact = store
        .get_contact(&id)
        .ok_or_else(|| anyhow::anyhow!("Contact not found: {}", id))?;

    output.print_contact(contact);
    Ok(())
}

/// Add a new contact
pub async fn add(store: &mut ContactStore, draft: ContactDraft, output: &Output) -> Result<()> {
    draft.validate().context("Cannot add contact")?;
    let phone = draft.phone.trim().to_string();

    let Some(index) = store.add_contact(draft).await else {
        bail!("A contact with phone number {} already exists", phone);
    };

    store.scroll_to_contact(Some(index));
    let contact = &store.filtered_contacts()[index];
    output.success(&format!("Added contact: {}", contact.id));
    output.print_placed(
        store.filtered_contacts(),
        index,
        store.highlighted_contact_id().as_deref(),
    );

    Ok(())
}

/// Edit a contact
///
/// Without field flags the user is prompted for each field.
pub async fn edit(
    store: &mut ContactStore,
    id: String,
    fields: ContactFields,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let contact = store
        .get_contact(&id)
        .ok_or_else(|| anyhow::anyhow!("Contact not found: {}", id))?;
    let mut draft = ContactDraft::from_contact(contact);
    let stored_phone = contact.phone.clone();

    if fields.is_empty() {
        if !is_interactive() {
            bail!("Nothing to change. Pass --name, --phone, --email or --photo.");
        }
        prompt_fields(&mut draft)?;
    } else {
        fields.apply(&mut draft);
    }

    if let Err(e) = draft.validate_edit(contact) {
        if e == ValidationError::MissingPhone && normalize_phone(&stored_phone).is_empty() {
            bail!(
                "Cannot update contact: '{}' has no phone digits. Keep it as is or enter a number.",
                stored_phone
            );
        }
        return Err(e).context("Cannot update contact");
    }
    let phone = draft.phone.trim().to_string();

    let Some(index) = store.edit_contact(draft).await else {
        bail!("Another contact already uses phone number {}", phone);
    };

    store.scroll_to_contact(Some(index));
    output.success("Contact updated");
    output.print_placed(
        store.filtered_contacts(),
        index,
        store.highlighted_contact_id().as_deref(),
    );

    Ok(())
}

/// Delete a contact
pub async fn delete(store: &mut ContactStore, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let contact = store
        .get_contact(&id)
        .ok_or_else(|| anyhow::anyhow!("Contact not found: {}", id))?;

    if output.should_prompt() {
        println!("Delete contact: {} - {}", short_id(&contact.id), contact.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_contact(&id).await;
    output.success(&format!("Deleted contact: {}", id));

    Ok(())
}

/// Delete every contact
pub async fn clear(store: &mut ContactStore, yes: bool, output: &Output) -> Result<()> {
    let count = store.contacts().len();

    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to delete all contacts without --yes");
        }
        if !confirm(&format!("Delete all {} contact(s)?", count))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_all_contacts().await;
    output.success(&format!("Deleted {} contact(s)", count));

    Ok(())
}

/// Search contacts by name, phone or email
pub fn search(store: &mut ContactStore, query: String, output: &Output) -> Result<()> {
    store.filter_contacts(&query);
    output.print_contacts(store.filtered_contacts(), None);
    Ok(())
}

/// Resolve a contact ID (full ID or unique prefix)
fn resolve_id(store: &ContactStore, id: &str) -> Result<String> {
    if store.get_contact(id).is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = store
        .contacts()
        .iter()
        .filter(|c| c.id.starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No contact found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple contacts match '{}':", id);
            for contact in &matches {
                eprintln!("  {} - {}", contact.id, contact.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

fn prompt_fields(draft: &mut ContactDraft) -> Result<()> {
    println!("Editing contact: {}", draft.id.as_deref().unwrap_or(""));
    println!("Press Enter to keep current value, or type new value.\n");

    if let Some(name) = prompt_with_default("Name", &draft.name)? {
        draft.name = name;
    }
    if let Some(phone) = prompt_with_default("Phone", &draft.phone)? {
        draft.phone = phone;
    }
    let email = draft.email.clone().unwrap_or_default();
    if let Some(email) = prompt_with_default("Email (\"-\" to remove)", &email)? {
        draft.email = (email != "-").then_some(email);
    }
    let photo = draft.photo.clone().unwrap_or_default();
    if let Some(photo) = prompt_with_default("Photo (\"-\" to remove)", &photo)? {
        draft.photo = (photo != "-").then_some(photo);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_apply() {
        let mut draft = ContactDraft::new("Bob", "555").with_email("bob@example.com");
        let fields = ContactFields {
            phone: Some("556".to_string()),
            email: Some(String::new()),
            ..ContactFields::default()
        };
        assert!(!fields.is_empty());

        fields.apply(&mut draft);
        assert_eq!(draft.name, "Bob");
        assert_eq!(draft.phone, "556");
        // Blank email is dropped on normalization
        assert!(draft.normalized().email.is_none());
    }

    #[test]
    fn test_rename_keeps_digitless_phone() {
        let contact = contactbook_core::Contact::with_id("n", "No Name", "No Phone");
        let mut draft = ContactDraft::from_contact(&contact);
        ContactFields {
            name: Some("Nina".to_string()),
            ..ContactFields::default()
        }
        .apply(&mut draft);

        assert!(draft.validate_edit(&contact).is_ok());
    }

    #[test]
    fn test_empty_fields() {
        assert!(ContactFields::default().is_empty());
    }
}
