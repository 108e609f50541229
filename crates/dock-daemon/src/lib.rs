//! Floating Dock daemon.
//!
//! Owns the dock controller on its home task and exposes it over a Unix
//! socket speaking the `dock-rpc` protocol.

pub mod error;
pub mod server;
pub mod window;

pub use error::{DaemonError, Result};
pub use server::{Daemon, run};
pub use window::{HeadlessFactory, HeadlessWindow};
