//! Matopt Core Library
//!
//! Core functionality for the materials-optimization toolchain: a parser
//! and cross-layer analyzer for layered shader material scripts, plus a
//! calibrated-texture pipeline that rewrites per-pixel luminance through
//! a camera calibration curve and emits swatch packs.

pub mod analyzer;
pub mod bitmap;
pub mod calibration;
pub mod color;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod parser;

// Re-export commonly used types
pub use analyzer::{AnalyzeError, Diagnostic, ResolveContext, Severity};
pub use calibration::{
    CalibratedTexture, CalibrationParams, CameraCalibration, CurveCalibration, TargetFormat,
};
pub use database::{Database, FileError};
pub use error::{CalibrationError, DatabaseError, MaterialError, ParseError};
pub use models::{
    Layer, MaskingMode, Material, Options, ProgramType, ReuseMode, TextureFileInfo, TextureRef,
};
pub use parser::Parser;
