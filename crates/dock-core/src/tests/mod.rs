//! Test module for dock-core
//!
//! This module contains tests for:
//! - The toggle controller (window transitions, launch outcomes, bus wiring)
//! - The launch pipeline stages against fake collaborators
//! - Configuration loading and defaults

mod controller_tests;
