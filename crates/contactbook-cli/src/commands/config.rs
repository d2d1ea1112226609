//! Config command handlers

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use contactbook_core::{Config, SyncPolicy};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "device_contacts_path": config.device_contacts_path,
                    "sync_policy": config.sync_policy.to_string(),
                    "highlight_ms": config.highlight_ms,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!(
                "  device_contacts_path: {}",
                display_or_unset(config.device_contacts_path.as_ref())
            );
            println!("  sync_policy:          {}", config.sync_policy);
            println!("  highlight_ms:         {}", config.highlight_ms);
            println!(
                "  log_file:             {}",
                display_or_unset(config.log_file.as_ref())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "device_contacts_path" => {
            config.device_contacts_path = optional_path(value);
        }
        "sync_policy" => {
            config.sync_policy = value.parse::<SyncPolicy>().map_err(|e| anyhow!(e))?;
        }
        "highlight_ms" => {
            config.highlight_ms = value
                .parse()
                .context("Invalid value for highlight_ms. Use a number of milliseconds.")?;
        }
        "log_file" => {
            config.log_file = optional_path(value);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, device_contacts_path, sync_policy, highlight_ms, log_file",
                key
            );
        }
    }

    Ok(())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.into())
    }
}

fn display_or_unset(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "sync_policy", "keep-local").unwrap();
        assert_eq!(config.sync_policy, SyncPolicy::KeepLocal);

        apply(&mut config, "highlight_ms", "500").unwrap();
        assert_eq!(config.highlight_ms, 500);

        apply(&mut config, "device_contacts_path", "/tmp/contacts.json").unwrap();
        assert_eq!(
            config.device_contacts_path,
            Some(PathBuf::from("/tmp/contacts.json"))
        );

        apply(&mut config, "device_contacts_path", "none").unwrap();
        assert!(config.device_contacts_path.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "highlight_ms", "soon").is_err());
        assert!(apply(&mut config, "sync_policy", "merge").is_err());
        assert!(apply(&mut config, "data_dir", "").is_err());
        assert!(apply(&mut config, "favorite_tag", "x").is_err());
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        std::fs::write(
            &config_path,
            format!("data_dir = {:?}\n", data_dir.display().to_string()),
        )
        .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set(
            "highlight_ms".to_string(),
            "750".to_string(),
            Some(&config_path),
            &output,
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.highlight_ms, 750);
    }
}
