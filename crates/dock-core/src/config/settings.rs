use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub access: AccessConfig,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// How launched applications are started
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Bring the launched application to the foreground
    #[serde(default = "default_activate")]
    pub activate: bool,

    /// Let a launch start while another one is still in flight.
    /// When false, the second request fails with `LaunchError::InFlight`.
    #[serde(default)]
    pub allow_overlapping: bool,
}

fn default_activate() -> bool {
    true
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            activate: default_activate(),
            allow_overlapping: false,
        }
    }
}

/// Directory access policy for the filesystem broker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    /// Directories (and their descendants) readable without asking
    #[serde(default = "default_trusted_roots")]
    pub trusted_roots: Vec<PathBuf>,

    /// Answer given when consent is needed and nobody can be asked
    #[serde(default)]
    pub prompt: PromptPolicy,
}

#[cfg(target_os = "macos")]
fn default_trusted_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/Applications"), PathBuf::from("/System/Applications")]
}

#[cfg(not(target_os = "macos"))]
fn default_trusted_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/bin"), PathBuf::from("/usr/local/bin")]
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            trusted_roots: default_trusted_roots(),
            prompt: PromptPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPolicy {
    Allow,
    #[default]
    Deny,
}
