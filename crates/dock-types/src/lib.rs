//! Shared types for Floating Dock components.
//!
//! This crate provides the types used across dock-core, dock-rpc,
//! dock-daemon, and dock-cli. All types are serializable for RPC transport.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the bus event that asks the controller to launch a dock entry.
pub const OPEN_APP_EVENT: &str = "open_app";

/// An application pinned to the dock.
///
/// Only `url` matters for launching; the rest is display data owned by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockEntry {
    pub name: String,

    /// Resolved location of the application bundle or executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl DockEntry {
    pub fn new(name: impl Into<String>, url: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            icon: None,
        }
    }

    /// Entry that has not been resolved to a location yet.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            icon: None,
        }
    }
}

/// What the launch pipeline needs to know about an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

impl LaunchTarget {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(location.into()),
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

impl From<&DockEntry> for LaunchTarget {
    fn from(entry: &DockEntry) -> Self {
        Self {
            location: entry.url.clone(),
        }
    }
}

impl From<DockEntry> for LaunchTarget {
    fn from(entry: DockEntry) -> Self {
        Self {
            location: entry.url,
        }
    }
}

/// Events published on the dock event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DockEvent {
    /// A dock entry was activated and its application should be started
    OpenApp { entry: DockEntry },
}

impl DockEvent {
    /// Wire name of the event
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DockEvent::OpenApp { .. } => OPEN_APP_EVENT,
        }
    }
}

/// Identifier of a dock window, used to anchor permission prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Snapshot of the controller, reported by the daemon's `status` method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockStatus {
    pub window_open: bool,
    pub launch_in_flight: bool,
}
