//! Tool configuration management.
//!
//! Loads the optional `matopt.yml` settings file (base paths for material
//! scripts and textures, database locations) and owns the global verbose
//! flag used by the CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use serde::Deserialize;

// Global verbose flag for controlling debug output
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set the global verbose flag. When true, debug messages will be printed.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::SeqCst);
}

/// Check if verbose mode is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Print a message to stderr only if verbose mode is enabled.
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if $crate::config::is_verbose() {
            eprintln!($($arg)*);
        }
    };
}

/// Canonical list of candidate config file names we search for on disk.
const CONFIG_FILENAMES: &[&str] = &["matopt.yml", "matopt.yaml"];

/// Settings file structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory scanned for material scripts.
    pub materials_base: PathBuf,

    /// Root directory scanned for texture files. Relative texture paths
    /// in material scripts resolve against this.
    pub textures_base: PathBuf,

    /// Directory holding the materials/textures database files.
    pub database_dir: PathBuf,

    /// Extension of material script files (without the dot).
    pub material_extension: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            materials_base: PathBuf::from("."),
            textures_base: PathBuf::from("."),
            database_dir: PathBuf::from("."),
            material_extension: "m2".to_string(),
        }
    }
}

impl Settings {
    /// Path of the materials database file.
    pub fn materials_database_path(&self) -> PathBuf {
        self.database_dir.join("materials.database")
    }

    /// Path of the textures database file.
    pub fn textures_database_path(&self) -> PathBuf {
        self.database_dir.join("textures.database")
    }
}

/// Public handle that stores the loaded settings, their source path, and warnings.
pub struct SettingsHandle {
    pub settings: Settings,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Load settings from disk, optionally forcing a specific path.
pub fn load_settings(custom_path: Option<&Path>) -> SettingsHandle {
    let mut warnings = Vec::new();

    for candidate in settings_candidates(custom_path) {
        if !candidate.exists() || !candidate.is_file() {
            continue;
        }

        match fs::read_to_string(&candidate) {
            Ok(contents) => match serde_yaml::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    let source = fs::canonicalize(&candidate).unwrap_or(candidate);
                    return SettingsHandle {
                        settings,
                        source: Some(source),
                        warnings,
                    };
                }
                Err(err) => warnings.push(format!(
                    "Failed to parse settings file {}: {}",
                    candidate.display(),
                    err
                )),
            },
            Err(err) => warnings.push(format!(
                "Failed to read settings file {}: {}",
                candidate.display(),
                err
            )),
        }
    }

    warnings.push("No settings file found; using built-in defaults.".to_string());
    SettingsHandle {
        settings: Settings::default(),
        source: None,
        warnings,
    }
}

/// Get list of settings file candidates to try
fn settings_candidates(custom_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = custom_path {
        candidates.push(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("MATOPT_CONFIG") {
        candidates.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(cwd.join(name));
        }
    }

    if let Some(home_dir) = dirs::home_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(home_dir.join("matopt").join(name));
        }
    }

    candidates
}

static SETTINGS_HANDLE: OnceLock<SettingsHandle> = OnceLock::new();

/// Access the global settings (loaded once per process).
pub fn settings_handle() -> &'static SettingsHandle {
    SETTINGS_HANDLE.get_or_init(|| load_settings(None))
}
