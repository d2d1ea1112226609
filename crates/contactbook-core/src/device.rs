//! Device address book access
//!
//! The store never talks to a platform address book directly; it goes
//! through [`DeviceContactsSource`]. `JsonFileDeviceSource` reads an address
//! book exported to JSON, either as a bare array of entries or wrapped as
//! `{"data": [...]}`:
//!
//! ```text
//! [{"id": "d1", "name": "Dee", "phoneNumbers": [{"number": "999"}],
//!   "emails": [{"email": "dee@example.com"}],
//!   "imageAvailable": true, "image": {"uri": "file:///photos/dee.jpg"}}]
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Permission to read the device address book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Optional fields a fetch can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    PhoneNumbers,
    Emails,
}

/// A phone number entry on a device contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An email entry on a device contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEmail {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Image reference on a device contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceImage {
    pub uri: String,
}

/// A contact as reported by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContact {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_numbers: Option<Vec<PhoneNumber>>,
    #[serde(default)]
    pub emails: Option<Vec<DeviceEmail>>,
    #[serde(default)]
    pub image_available: bool,
    #[serde(default)]
    pub image: Option<DeviceImage>,
}

impl DeviceContact {
    /// Create an entry with a name and a single phone number
    pub fn new(id: impl Into<String>, name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            phone_numbers: Some(vec![PhoneNumber {
                number: number.into(),
                label: None,
            }]),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails
            .get_or_insert_with(Vec::new)
            .push(DeviceEmail {
                email: email.into(),
                label: None,
            });
        self
    }

    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.image_available = true;
        self.image = Some(DeviceImage { uri: uri.into() });
        self
    }

    /// True when at least one phone number is listed
    pub fn has_phone_number(&self) -> bool {
        self.phone_numbers.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// First listed phone number
    pub fn first_phone(&self) -> Option<&str> {
        self.phone_numbers
            .as_ref()
            .and_then(|p| p.first())
            .map(|p| p.number.as_str())
    }

    /// First listed email
    pub fn first_email(&self) -> Option<&str> {
        self.emails
            .as_ref()
            .and_then(|e| e.first())
            .map(|e| e.email.as_str())
    }

    /// Image reference, only when the device reports one is available
    pub fn image_uri(&self) -> Option<&str> {
        if !self.image_available {
            return None;
        }
        self.image.as_ref().map(|i| i.uri.as_str())
    }
}

/// Errors raised by a device contacts source
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to read device contacts from '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Device contacts in '{path}' are not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Device contacts unavailable: {0}")]
    Unavailable(String),
}

/// Access to the device address book
#[async_trait]
pub trait DeviceContactsSource: Send + Sync {
    /// Current permission, without prompting
    async fn permission_status(&self) -> Result<PermissionStatus, DeviceError>;

    /// Ask for permission; never returns `Undetermined`
    async fn request_permission(&self) -> Result<PermissionStatus, DeviceError>;

    /// Read all contacts, including the requested optional fields
    async fn fetch_contacts(&self, fields: &[ContactField]) -> Result<Vec<DeviceContact>, DeviceError>;
}

/// Address book exported to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileDeviceSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExportFile {
    List(Vec<DeviceContact>),
    Wrapped { data: Vec<DeviceContact> },
}

impl JsonFileDeviceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn check_access(&self) -> Result<PermissionStatus, DeviceError> {
        match tokio::fs::File::open(&self.path).await {
            Ok(_) => Ok(PermissionStatus::Granted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PermissionStatus::Undetermined),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(PermissionStatus::Denied),
            Err(source) => Err(DeviceError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl DeviceContactsSource for JsonFileDeviceSource {
    async fn permission_status(&self) -> Result<PermissionStatus, DeviceError> {
        self.check_access().await
    }

    async fn request_permission(&self) -> Result<PermissionStatus, DeviceError> {
        // Nothing to prompt for: a missing export cannot be granted
        match self.check_access().await? {
            PermissionStatus::Granted => Ok(PermissionStatus::Granted),
            PermissionStatus::Denied | PermissionStatus::Undetermined => {
                Ok(PermissionStatus::Denied)
            }
        }
    }

    async fn fetch_contacts(&self, fields: &[ContactField]) -> Result<Vec<DeviceContact>, DeviceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| DeviceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let export: ExportFile =
            serde_json::from_str(&content).map_err(|source| DeviceError::Parse {
                path: self.path.clone(),
                source,
            })?;
        let mut contacts = match export {
            ExportFile::List(contacts) | ExportFile::Wrapped { data: contacts } => contacts,
        };

        if !fields.contains(&ContactField::PhoneNumbers) {
            contacts.iter_mut().for_each(|c| c.phone_numbers = None);
        }
        if !fields.contains(&ContactField::Emails) {
            contacts.iter_mut().for_each(|c| c.emails = None);
        }

        debug!("Read {} device contacts from {:?}", contacts.len(), self.path);
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXPORT: &str = r#"[
        {"id": "d1", "name": "Dee", "phoneNumbers": [{"number": "999", "label": "mobile"}],
         "emails": [{"email": "dee@example.com"}], "imageAvailable": true,
         "image": {"uri": "file:///photos/dee.jpg"}},
        {"id": "d2", "phoneNumbers": null},
        {"id": "d3", "name": "Eve", "phoneNumbers": [], "imageAvailable": false,
         "image": {"uri": "file:///photos/eve.jpg"}}
    ]"#;

    fn write_export(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("device.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_device_contact_accessors() {
        let contacts: Vec<DeviceContact> = serde_json::from_str(EXPORT).unwrap();

        assert!(contacts[0].has_phone_number());
        assert_eq!(contacts[0].first_phone(), Some("999"));
        assert_eq!(contacts[0].first_email(), Some("dee@example.com"));
        assert_eq!(contacts[0].image_uri(), Some("file:///photos/dee.jpg"));

        assert!(!contacts[1].has_phone_number());
        assert!(contacts[1].name.is_none());

        assert!(!contacts[2].has_phone_number());
        // Image reference ignored when not available
        assert_eq!(contacts[2].image_uri(), None);
    }

    #[tokio::test]
    async fn test_missing_export_is_undetermined_then_denied() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonFileDeviceSource::new(temp_dir.path().join("missing.json"));

        assert_eq!(
            source.permission_status().await.unwrap(),
            PermissionStatus::Undetermined
        );
        assert_eq!(
            source.request_permission().await.unwrap(),
            PermissionStatus::Denied
        );
    }

    #[tokio::test]
    async fn test_fetch_contacts() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonFileDeviceSource::new(write_export(&temp_dir, EXPORT));

        assert!(source.request_permission().await.unwrap().is_granted());

        let contacts = source
            .fetch_contacts(&[ContactField::PhoneNumbers, ContactField::Emails])
            .await
            .unwrap();
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name.as_deref(), Some("Dee"));
    }

    #[tokio::test]
    async fn test_fetch_drops_unrequested_fields() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonFileDeviceSource::new(write_export(&temp_dir, EXPORT));

        let contacts = source
            .fetch_contacts(&[ContactField::PhoneNumbers])
            .await
            .unwrap();
        assert!(contacts[0].has_phone_number());
        assert!(contacts[0].emails.is_none());
    }

    #[tokio::test]
    async fn test_fetch_wrapped_export() {
        let temp_dir = TempDir::new().unwrap();
        let wrapped = format!(r#"{{"data": {}}}"#, EXPORT);
        let source = JsonFileDeviceSource::new(write_export(&temp_dir, &wrapped));

        let contacts = source
            .fetch_contacts(&[ContactField::PhoneNumbers, ContactField::Emails])
            .await
            .unwrap();
        assert_eq!(contacts.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_invalid_export() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonFileDeviceSource::new(write_export(&temp_dir, "{\"contacts\": 3}"));

        let err = source
            .fetch_contacts(&[ContactField::PhoneNumbers])
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Parse { .. }));
    }
}
