//! Platform detection for the process launcher
//!
//! Picks how applications get started on the current OS.

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS, applications are bundles opened through `open`
    MacOS,
    /// Linux and other Unix systems, applications are executables
    Linux,
    /// Windows
    Windows,
    /// Unknown/unsupported platform
    Unknown,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::MacOS => "macos",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        }
    }

    /// Whether applications are started through the system `open` facility
    pub fn uses_open_command(self) -> bool {
        matches!(self, Platform::MacOS)
    }
}

/// Detect the current platform
pub fn detect() -> Platform {
    #[cfg(target_os = "macos")]
    return Platform::MacOS;

    #[cfg(target_os = "windows")]
    return Platform::Windows;

    #[cfg(all(unix, not(target_os = "macos")))]
    return Platform::Linux;

    #[cfg(not(any(unix, target_os = "windows")))]
    Platform::Unknown
}
