//! Texture file records.
//!
//! A `TextureFileInfo` is one image file discovered on disk: its
//! normalized path, header-probed dimensions, format, a usage class
//! guessed from naming conventions, and a ref-count derived by the
//! analyzer (never authoritative, always recomputed).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Image container formats the collector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFileType {
    Png,
    Tga,
    Jpg,
    Tiff,
    Other,
}

impl TextureFileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "png" => Self::Png,
            "tga" => Self::Tga,
            "jpg" | "jpeg" => Self::Jpg,
            "tif" | "tiff" => Self::Tiff,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Tga => "TGA",
            Self::Jpg => "JPG",
            Self::Tiff => "TIFF",
            Self::Other => "Other",
        }
    }
}

/// Usage classification from file-name suffix conventions
/// (`albedo_rock_d.tga`, `albedo_rock_n.tga`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    Diffuse,
    Normal,
    Gloss,
    Metal,
    Emissive,
    Other,
}

impl TextureUsage {
    pub(crate) fn from_stem(stem: &str) -> Self {
        const SUFFIXES: &[(&str, TextureUsage)] = &[
            ("_d", TextureUsage::Diffuse),
            ("_dif", TextureUsage::Diffuse),
            ("_diffuse", TextureUsage::Diffuse),
            ("_n", TextureUsage::Normal),
            ("_nm", TextureUsage::Normal),
            ("_normal", TextureUsage::Normal),
            ("_g", TextureUsage::Gloss),
            ("_gloss", TextureUsage::Gloss),
            ("_m", TextureUsage::Metal),
            ("_metal", TextureUsage::Metal),
            ("_e", TextureUsage::Emissive),
            ("_em", TextureUsage::Emissive),
            ("_emissive", TextureUsage::Emissive),
        ];
        for (suffix, usage) in SUFFIXES {
            if stem.ends_with(suffix) {
                return *usage;
            }
        }
        Self::Other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diffuse => "Diffuse",
            Self::Normal => "Normal",
            Self::Gloss => "Gloss",
            Self::Metal => "Metal",
            Self::Emissive => "Emissive",
            Self::Other => "Other",
        }
    }
}

/// Normalize a texture path for cross-referencing: lower-case with
/// forward slashes.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().to_lowercase().replace('\\', "/")
}

/// One texture file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureFileInfo {
    /// Normalized absolute path (lower-case, forward-slash).
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub file_type: TextureFileType,
    pub usage: TextureUsage,
    /// Number of material slots resolving to this file. Derived state,
    /// zeroed and recounted by every analysis pass.
    pub ref_count: u32,
}

impl TextureFileInfo {
    /// Probe a texture file's header for its dimensions and classify it.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let file_type = TextureFileType::from_extension(&ext);
        let (width, height) = probe_dimensions(path, file_type)?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        Ok(Self {
            path: normalize_path(path),
            width,
            height,
            file_type,
            usage: TextureUsage::from_stem(&stem),
            ref_count: 0,
        })
    }
}

/// Read just enough of the header to know the image size. JPEG and
/// unrecognized formats report 0x0; the analyzer never needs their size,
/// only their identity.
fn probe_dimensions(path: &Path, file_type: TextureFileType) -> std::io::Result<(u32, u32)> {
    match file_type {
        TextureFileType::Png => probe_png(path),
        TextureFileType::Tga => probe_tga(path),
        TextureFileType::Tiff => probe_tiff(path),
        TextureFileType::Jpg | TextureFileType::Other => Ok((0, 0)),
    }
}

fn probe_png(path: &Path) -> std::io::Result<(u32, u32)> {
    let file = File::open(path)?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let reader = decoder
        .read_info()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let info = reader.info();
    Ok((info.width, info.height))
}

/// TGA has no magic; the 18-byte header carries width/height at offsets
/// 12 and 14, little-endian.
fn probe_tga(path: &Path) -> std::io::Result<(u32, u32)> {
    let mut header = [0u8; 18];
    File::open(path)?.read_exact(&mut header)?;
    let width = u16::from_le_bytes([header[12], header[13]]) as u32;
    let height = u16::from_le_bytes([header[14], header[15]]) as u32;
    Ok((width, height))
}

fn probe_tiff(path: &Path) -> std::io::Result<(u32, u32)> {
    let file = File::open(path)?;
    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    Ok((width, height))
}
