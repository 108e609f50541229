mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{AccessConfig, Config, LaunchConfig, PromptPolicy};
pub use validation::warn_unknown_fields;
