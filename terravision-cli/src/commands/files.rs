//! Configuration upload
//!
//! Collects the known configuration files from a local directory and posts
//! them to the API.

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::Path;
use terravision_client::TerravisionClient;
use terravision_core::domain::config_file::ConfigFileName;
use terravision_core::dto::write::WriteFiles;

use crate::config::Config;

/// Handle `write <dir>`
pub async fn handle_write(dir: &Path, config: &Config) -> Result<()> {
    let client = TerravisionClient::new(&config.api_url);
    upload_dir(&client, dir).await
}

/// Reads `dir` and uploads whatever known files it contains
pub async fn upload_dir(client: &TerravisionClient, dir: &Path) -> Result<()> {
    let files = read_config_dir(dir)?;

    client
        .write_files(&files)
        .await
        .context("Failed to upload configuration files")?;

    println!(
        "{} Uploaded {} file(s) from {}",
        "✓".green(),
        files.len(),
        dir.display().to_string().cyan()
    );
    for name in files.files.keys() {
        println!("    {}", name.as_str().dimmed());
    }

    Ok(())
}

/// Loads the known configuration files present in `dir`
///
/// Missing files are skipped so the server keeps its copy; a directory with
/// none of them is an error.
pub fn read_config_dir(dir: &Path) -> Result<WriteFiles> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut files = WriteFiles::new();
    for name in ConfigFileName::ALL {
        let path = dir.join(name.as_str());
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.insert(name, content);
    }

    if files.is_empty() {
        bail!(
            "No configuration files found in {} (expected one of: {})",
            dir.display(),
            ConfigFileName::ALL
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_only_known_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "resource \"null_resource\" \"a\" {}\n").unwrap();
        std::fs::write(dir.path().join("terraform.tfvars"), "region = \"eu-west-1\"\n").unwrap();
        std::fs::write(dir.path().join("outputs.tf"), "output \"x\" {}\n").unwrap();

        let files = read_config_dir(dir.path()).unwrap();

        assert_eq!(
            files.files.keys().copied().collect::<Vec<_>>(),
            vec![ConfigFileName::Main, ConfigFileName::VariableValues]
        );
        assert_eq!(
            files.files[&ConfigFileName::Main].value,
            "resource \"null_resource\" \"a\" {}\n"
        );
    }

    #[test]
    fn test_empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# infra\n").unwrap();

        let err = read_config_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No configuration files"));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config_dir(&dir.path().join("nope")).is_err());
    }
}
