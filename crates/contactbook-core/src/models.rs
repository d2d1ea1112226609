//! Data models for contactbook
//!
//! Defines the `Contact` record kept by the store and the `ContactDraft`
//! shape used by input forms before a contact has been accepted.

use std::cmp::Ordering;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// A stored contact
///
/// Serialized as `{id, name, phone, email?, photo?}`; absent optional
/// fields are omitted from the JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Unique identifier, stable for the contact's lifetime
    pub id: String,
    /// Display name (primary sort key)
    pub name: String,
    /// Phone number, unique within the store
    pub phone: String,
    /// Optional email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional image reference (local path/URI or remote URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Contact {
    /// Create a new contact with a freshly generated ID
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self::with_id(new_contact_id(), name, phone)
    }

    /// Create a contact with a specific ID (for loading from storage)
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            email: None,
            photo: None,
        }
    }

    /// Set the email address
    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    /// Set the photo reference
    pub fn set_photo(&mut self, photo: Option<String>) {
        self.photo = photo;
    }

    /// Phone number reduced to its digits, used as the uniqueness key
    pub fn phone_key(&self) -> String {
        normalize_phone(&self.phone)
    }

    /// Fallback avatar text used when no photo is set
    ///
    /// First letter of up to two words of the name, uppercased.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Contact fields as entered in a form, before the store accepts them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    /// Set when editing an existing contact
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub photo: Option<String>,
}

impl ContactDraft {
    /// Create a draft with the required fields
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }

    /// Start a draft from an existing contact (edit form)
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            id: Some(contact.id.clone()),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            photo: contact.photo.clone(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    /// Trim the name, reduce the phone to digits and drop blank optionals
    pub fn normalized(self) -> Self {
        Self {
            id: self.id,
            name: self.name.trim().to_string(),
            phone: normalize_phone(&self.phone),
            email: non_blank(self.email),
            photo: non_blank(self.photo),
        }
    }

    /// Check required fields and the email format
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check(false)
    }

    /// Validate the draft as an edit of `current`
    ///
    /// A phone left exactly as stored is accepted even without digits, so
    /// imported "No Phone" contacts can still be renamed.
    pub fn validate_edit(&self, current: &Contact) -> Result<(), ValidationError> {
        self.check(self.keeps_phone_of(current))
    }

    /// True when the draft leaves `current`'s phone untouched
    pub fn keeps_phone_of(&self, current: &Contact) -> bool {
        self.phone.trim() == current.phone
    }

    fn check(&self, phone_unchanged: bool) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if !phone_unchanged && normalize_phone(&self.phone).is_empty() {
            return Err(ValidationError::MissingPhone);
        }
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() && !is_valid_email(email) {
                return Err(ValidationError::InvalidEmail(email.to_string()));
            }
        }
        Ok(())
    }

    /// Turn the draft into a contact, keeping its ID or generating one
    pub fn into_contact(self) -> Contact {
        Contact {
            id: self.id.unwrap_or_else(new_contact_id),
            name: self.name,
            phone: self.phone,
            email: self.email,
            photo: self.photo,
        }
    }
}

/// Form validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name is required")]
    MissingName,

    #[error("Phone number is required")]
    MissingPhone,

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),
}

/// Generate a fresh contact ID
pub fn new_contact_id() -> String {
    Uuid::new_v4().to_string()
}

/// Keep only the ASCII digits of a phone number
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Basic `local@domain` check
pub fn is_valid_email(email: &str) -> bool {
    EmailAddress::is_valid(email)
}

/// Name ordering used for every sort of the contact list
///
/// Names compare on their folded form first (compatibility-decomposed,
/// accents dropped, lowercased) so "Émile" sorts among the E's and "alice"
/// next to "Alice". Ties fall back to case-insensitive, then exact
/// comparison to keep the order total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn collation_key(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Sort contacts in place by name
pub fn sort_by_name(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| compare_names(&a.name, &b.name));
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
