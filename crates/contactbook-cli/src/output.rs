//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use contactbook_core::{Contact, SyncReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single contact
    pub fn print_contact(&self, contact: &Contact) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:     {}", contact.id);
                println!("Name:   {}", contact.name);
                println!("Phone:  {}", contact.phone);
                if let Some(ref email) = contact.email {
                    println!("Email:  {}", email);
                }
                match contact.photo {
                    Some(ref photo) => println!("Photo:  {}", photo),
                    None => println!("Avatar: {}", contact.initials()),
                }
            }
            OutputFormat::Json => {
                println!("{}", to_json(contact));
            }
            OutputFormat::Quiet => {
                println!("{}", contact.id);
            }
        }
    }

    /// Print a list of contacts, marking the highlighted one
    pub fn print_contacts(&self, contacts: &[Contact], highlighted: Option<&str>) {
        match self.format {
            OutputFormat::Human => {
                if contacts.is_empty() {
                    println!("No contacts found.");
                    return;
                }
                for contact in contacts {
                    let marker = if highlighted == Some(contact.id.as_str()) {
                        '>'
                    } else {
                        ' '
                    };
                    println!(
                        "{} {} | {:<3} | {:<30} | {:<16} | {}",
                        marker,
                        short_id(&contact.id),
                        contact.initials(),
                        truncate(&contact.name, 30),
                        truncate(&contact.phone, 16),
                        contact.email.as_deref().unwrap_or("")
                    );
                }
                println!("\n{} contact(s)", contacts.len());
            }
            OutputFormat::Json => {
                println!("{}", to_json(&contacts));
            }
            OutputFormat::Quiet => {
                for contact in contacts {
                    println!("{}", contact.id);
                }
            }
        }
    }

    /// Print the list after an add/edit, positioned on the changed contact
    pub fn print_placed(&self, contacts: &[Contact], index: usize, highlighted: Option<&str>) {
        let Some(contact) = contacts.get(index) else {
            return;
        };
        match self.format {
            OutputFormat::Human => {
                self.print_contacts(contacts, highlighted);
                println!("Position: {} of {}", index + 1, contacts.len());
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"index": index, "contact": contact})
                );
            }
            OutputFormat::Quiet => {
                println!("{}", contact.id);
            }
        }
    }

    /// Print a sync summary
    pub fn print_sync_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Sync complete");
                println!("  Fetched: {}", report.fetched);
                println!("  Added:   {}", report.added);
                println!("  Updated: {}", report.updated);
                println!("  Skipped: {}", report.skipped);
                println!("  Total:   {}", report.total);
            }
            OutputFormat::Json => {
                println!("{}", to_json(report));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (shown in every mode except quiet)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        serde_json::json!({"status": "error", "message": e.to_string()}).to_string()
    })
}

/// First 8 characters of an ID
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("Zoë Ångström-Øster", 8), "Zoë Å...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
