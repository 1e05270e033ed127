//! Error taxonomy for the matopt engines.
//!
//! Parse-time failures for a single file are recorded per-file and the
//! batch continues; database load failures reset state to empty. Missing
//! textures on disk are analyzer diagnostics, never error values.

use std::path::PathBuf;

use thiserror::Error;

/// Low-level script syntax errors from the tokenizer/block parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("block comment opened at offset {0} has no matching */")]
    UnterminatedComment(usize),

    #[error("brace block opened at offset {0} has no matching closing brace")]
    UnterminatedBlock(usize),

    #[error("expected an opening brace at offset {0}")]
    MissingBlock(usize),

    #[error("'material' keyword is not followed by a material name")]
    MissingMaterialName,
}

/// A material that failed to parse, with the material name attached.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("failed parsing content block for material \"{name}\": check comment markers and matching closing braces")]
    BadBlock {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error("failed parsing material \"{name}\": invalid value \"{value}\" for {key}")]
    BadValue {
        name: String,
        key: String,
        value: String,
    },

    #[error("failed parsing material \"{name}\": {key} expects {expected} more token(s)")]
    MissingValue {
        name: String,
        key: String,
        expected: usize,
    },
}

/// Corrupt or incompatible database file. The loader clears in-memory
/// state before surfacing this, so callers never observe a partial fill.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a matopt database (bad magic)", path.display())]
    BadMagic { path: PathBuf },

    #[error("{} uses unsupported format version {found} (expected {expected})", path.display())]
    BadVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{} is truncated or corrupt: {detail}", path.display())]
    Corrupt { path: PathBuf, detail: String },
}

/// Failures from the calibrated-texture build and pack writer.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("source cropping was requested but is not supported")]
    CropUnsupported,

    #[error("{count} custom swatches requested but only {provided} sampling locations provided")]
    NotEnoughSampleLocations { count: usize, provided: usize },

    #[error("failed to load image {}: {detail}", path.display())]
    ImageLoad { path: PathBuf, detail: String },

    #[error("failed to save image {}: {detail}", path.display())]
    ImageSave { path: PathBuf, detail: String },

    #[error("failed to write manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render an error and its source chain, one message per line. This is
/// the string persisted into the database error records.
pub fn full_message(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        out.push('\n');
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
}
