//! Core of the Floating Dock: the dock window state machine and the
//! access → launch pipeline behind it.
//!
//! [`ToggleController`] is the entry point. It is wired from four
//! collaborators: a [`WindowFactory`] for the dock window, an [`EventBus`]
//! delivering launch requests, an [`AccessBroker`] that negotiates directory
//! access and an [`AppLauncher`] that starts processes.

pub mod broker;
pub mod bus;
pub mod config;
pub mod controller;
pub mod home;
pub mod launcher;
pub mod pipeline;
pub mod window;

pub(crate) mod platform;

mod error;

#[cfg(test)]
mod tests;

pub use broker::{
    AccessBroker, AccessRequest, ConsentPrompt, FsAccessBroker, GrantStore, PolicyPrompt,
    ScopedAccessGrant,
};
pub use bus::{EventBus, EventHandler, LocalBus, SubscriptionId};
pub use controller::{
    ControllerHandle, ControllerOptions, FailureReporter, LogReporter, ToggleController,
};
pub use error::{AccessError, Error, LaunchError, Result};
pub use home::{HomeContext, HomeJob, HomeQueue};
pub use launcher::{AppLauncher, LaunchConfiguration, ProcessLauncher, RunningApp};
pub use pipeline::{Continuations, LaunchPipeline, PipelineOptions};
pub use window::{Dock, DockAction, DockState, DockWindow, WindowFactory};

pub use dock_types::*;
