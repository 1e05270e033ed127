//! Material and texture data model.
//!
//! A `Material` is parsed once from its script block and is structurally
//! immutable afterwards; its diagnostics are derived state recomputed on
//! every analyzer pass. `TextureFileInfo` records are collected from disk
//! and cross-referenced by normalized path.

mod material;
mod texture;

#[cfg(test)]
mod tests;

pub use material::{
    Channel, Layer, MaskingMode, Material, Options, Programs, ProgramType, ReuseMode, Slot,
    TextureRef, DEFAULT_MIN_MAX, MAX_LAYERS, REUSABLE_CHANNELS,
};
pub use texture::{normalize_path, TextureFileInfo, TextureFileType, TextureUsage};
