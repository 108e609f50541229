//! Directory access negotiation.
//!
//! Before an application can be started, the directory that contains it has
//! to be readable. The [`AccessBroker`] decides that and hands back a
//! [`ScopedAccessGrant`] whose location is what the launcher should use.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dock_types::WindowId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AccessConfig, PromptPolicy};
use crate::error::AccessError;

/// Options for a single access request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    /// Ask for consent when there is no standing grant
    pub ask_if_needed: bool,
    /// Window the consent prompt should attach to
    pub anchor: Option<WindowId>,
    /// Keep the consent for future requests
    pub persist: bool,
}

/// Authorization to read one directory, valid for one launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedAccessGrant {
    /// Directory as requested
    pub directory: PathBuf,
    /// Location through which the directory may be read
    pub scoped_location: PathBuf,
    /// Whether the grant outlives this request
    pub persisted: bool,
}

impl ScopedAccessGrant {
    /// Location of `file_name` inside the granted directory.
    #[must_use]
    pub fn resolve(&self, file_name: &std::ffi::OsStr) -> PathBuf {
        self.scoped_location.join(file_name)
    }
}

#[async_trait]
pub trait AccessBroker: Send + Sync {
    /// # Errors
    ///
    /// `AccessError::Denied` when consent is refused or cannot be asked for,
    /// `AccessError::Broker` when the broker itself fails.
    async fn request_access(
        &self,
        directory: &Path,
        request: AccessRequest,
    ) -> Result<ScopedAccessGrant, AccessError>;
}

/// Asks the user whether a directory may be read.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn request_consent(&self, directory: &Path, anchor: Option<WindowId>) -> bool;
}

/// Fixed answer, for headless runs where nobody can be asked.
#[derive(Debug, Clone, Copy)]
pub struct PolicyPrompt(pub PromptPolicy);

#[async_trait]
impl ConsentPrompt for PolicyPrompt {
    async fn request_consent(&self, directory: &Path, anchor: Option<WindowId>) -> bool {
        debug!(
            "Consent for {} (anchor: {:?}) answered by policy {:?}",
            directory.display(),
            anchor,
            self.0
        );
        self.0 == PromptPolicy::Allow
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantFile {
    #[serde(default)]
    grants: BTreeSet<PathBuf>,
}

/// Directories the user has consented to, persisted as JSON.
#[derive(Debug)]
pub struct GrantStore {
    path: PathBuf,
    grants: BTreeSet<PathBuf>,
}

impl GrantStore {
    /// Load grants from `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let grants = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<GrantFile>(&content)?.grants
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            grants,
        })
    }

    #[must_use]
    pub fn contains(&self, directory: &Path) -> bool {
        self.grants.contains(directory)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Record a grant and write the store back to disk.
    ///
    /// The grant only becomes standing once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn insert(&mut self, directory: PathBuf) -> crate::Result<()> {
        if self.grants.contains(&directory) {
            return Ok(());
        }

        let mut file = GrantFile {
            grants: self.grants.clone(),
        };
        file.grants.insert(directory);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&file)?).await?;

        self.grants = file.grants;
        Ok(())
    }
}

/// Broker backed by the local filesystem.
///
/// Directories under a trusted root are always readable. Anything else needs
/// a persisted grant or fresh consent from the [`ConsentPrompt`].
pub struct FsAccessBroker {
    trusted_roots: Vec<PathBuf>,
    prompt: Arc<dyn ConsentPrompt>,
    store: Mutex<GrantStore>,
}

impl FsAccessBroker {
    pub fn new(
        trusted_roots: Vec<PathBuf>,
        prompt: Arc<dyn ConsentPrompt>,
        store: GrantStore,
    ) -> Self {
        // Roots that do not exist can never match a canonical directory
        let trusted_roots = trusted_roots
            .into_iter()
            .filter_map(|root| std::fs::canonicalize(root).ok())
            .collect();

        Self {
            trusted_roots,
            prompt,
            store: Mutex::new(store),
        }
    }

    /// Build a broker from the `access` config section.
    pub fn from_config(config: &AccessConfig, store: GrantStore) -> Self {
        Self::new(
            config.trusted_roots.clone(),
            Arc::new(PolicyPrompt(config.prompt)),
            store,
        )
    }

    fn is_trusted(&self, directory: &Path) -> bool {
        self.trusted_roots
            .iter()
            .any(|root| directory.starts_with(root))
    }
}

#[async_trait]
impl AccessBroker for FsAccessBroker {
    async fn request_access(
        &self,
        directory: &Path,
        request: AccessRequest,
    ) -> Result<ScopedAccessGrant, AccessError> {
        let canonical = tokio::fs::canonicalize(directory)
            .await
            .map_err(|e| AccessError::Broker(format!("{}: {e}", directory.display())))?;

        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|e| AccessError::Broker(format!("{}: {e}", canonical.display())))?;
        if !metadata.is_dir() {
            return Err(AccessError::Broker(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }

        let grant = |persisted| ScopedAccessGrant {
            directory: directory.to_path_buf(),
            scoped_location: canonical.clone(),
            persisted,
        };

        if self.is_trusted(&canonical) {
            debug!("{} is under a trusted root", canonical.display());
            return Ok(grant(false));
        }

        let mut store = self.store.lock().await;
        if store.contains(&canonical) {
            debug!("Using standing grant for {}", canonical.display());
            return Ok(grant(true));
        }

        if !request.ask_if_needed {
            return Err(AccessError::Denied(directory.to_path_buf()));
        }

        if !self
            .prompt
            .request_consent(&canonical, request.anchor)
            .await
        {
            info!("Access to {} denied", canonical.display());
            return Err(AccessError::Denied(directory.to_path_buf()));
        }

        let mut persisted = false;
        if request.persist {
            match store.insert(canonical.clone()).await {
                Ok(()) => persisted = true,
                Err(e) => warn!("Failed to persist grant for {}: {e}", canonical.display()),
            }
        }

        info!(
            "Access to {} granted (persisted: {persisted})",
            canonical.display()
        );
        Ok(grant(persisted))
    }
}
