//! Command implementations for the matopt CLI.

mod analyze;
mod calibrate;
mod collect;
mod scan;

// Re-export all command functions
pub use analyze::cmd_analyze;
pub use calibrate::cmd_calibrate;
pub use collect::cmd_collect;
pub use scan::cmd_scan;

use std::path::Path;

use matopt_core::config::{load_settings, SettingsHandle};
use matopt_core::verbose_println;

/// Load settings for a command, surfacing loader warnings in verbose mode.
fn settings_for(config: Option<&Path>) -> SettingsHandle {
    let handle = load_settings(config);
    for warning in &handle.warnings {
        verbose_println!("{}", warning);
    }
    if let Some(source) = &handle.source {
        verbose_println!("Using settings from {}", source.display());
    }
    handle
}
