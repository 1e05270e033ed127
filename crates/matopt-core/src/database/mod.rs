//! In-memory material/texture store and batch collection.
//!
//! Directory scans are partial-failure tolerant: a script or image that
//! fails to parse is recorded as a per-file error and the scan continues.
//! Persistence lives in `io` (versioned binary layout).

mod io;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{full_message, DatabaseError, MaterialError, ParseError};
use crate::models::{Material, TextureFileInfo};
use crate::parser::Parser;

/// Image extensions picked up by the texture collector.
pub const TEXTURE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tga", "tif", "tiff"];

/// A file that failed during a batch scan, with the rendered error chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub file: PathBuf,
    pub message: String,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ERROR! {} > {}", self.file.display(), self.message)
    }
}

/// The materials and textures databases plus the normalized-path index
/// used for cross-referencing.
#[derive(Debug, Default)]
pub struct Database {
    pub materials: Vec<Material>,
    pub material_errors: Vec<FileError>,
    pub textures: Vec<TextureFileInfo>,
    pub texture_errors: Vec<FileError>,
    /// Normalized absolute path -> index into `textures`.
    pub texture_index: HashMap<String, usize>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recursively parse every material script under `dir`. Previous
    /// materials are dropped first; per-file failures are recorded and the
    /// scan continues.
    pub fn scan_materials(&mut self, dir: &Path, extension: &str) -> std::io::Result<()> {
        self.materials.clear();
        self.material_errors.clear();

        let mut files = Vec::new();
        collect_files(dir, &[extension], &mut files)?;
        files.sort();

        for file in files {
            match std::fs::read_to_string(&file) {
                Ok(text) => match parse_material_source(&file, &text) {
                    Ok(mut materials) => self.materials.append(&mut materials),
                    Err(err) => self.record_material_error(&file, &err),
                },
                Err(err) => self.record_material_error(&file, &err),
            }
        }
        Ok(())
    }

    fn record_material_error(&mut self, file: &Path, err: &dyn std::error::Error) {
        let error = FileError {
            file: file.to_path_buf(),
            message: full_message(err),
        };
        log::warn!("{}", error);
        self.material_errors.push(error);
    }

    /// Recursively collect texture records under `dir`. Previous records
    /// and the path index are dropped first.
    pub fn collect_textures(&mut self, dir: &Path) -> std::io::Result<()> {
        self.textures.clear();
        self.texture_errors.clear();
        self.texture_index.clear();

        let mut files = Vec::new();
        collect_files(dir, TEXTURE_EXTENSIONS, &mut files)?;
        files.sort();

        for file in files {
            match TextureFileInfo::from_file(&file) {
                Ok(info) => self.insert_texture(info),
                Err(err) => {
                    let error = FileError {
                        file: file.clone(),
                        message: full_message(&err),
                    };
                    log::warn!("{}", error);
                    self.texture_errors.push(error);
                }
            }
        }
        Ok(())
    }

    /// Add a texture record and index it by normalized path.
    pub fn insert_texture(&mut self, info: TextureFileInfo) {
        let key = info.path.clone();
        let index = self.textures.len();
        self.textures.push(info);
        self.texture_index.insert(key, index);
    }

    fn rebuild_texture_index(&mut self) {
        self.texture_index = self
            .textures
            .iter()
            .enumerate()
            .map(|(i, t)| (t.path.clone(), i))
            .collect();
    }

    /// Save the materials half to its database file.
    pub fn save_materials(&self, path: &Path) -> Result<(), DatabaseError> {
        io::save_materials(path, &self.materials, &self.material_errors)
    }

    /// Load the materials half. Clears in-memory state first; on failure
    /// the state stays empty (never partially filled).
    pub fn load_materials(&mut self, path: &Path) -> Result<(), DatabaseError> {
        self.materials.clear();
        self.material_errors.clear();
        let (materials, errors) = io::load_materials(path)?;
        self.materials = materials;
        self.material_errors = errors;
        Ok(())
    }

    /// Save the textures half to its database file.
    pub fn save_textures(&self, path: &Path) -> Result<(), DatabaseError> {
        io::save_textures(path, &self.textures, &self.texture_errors)
    }

    /// Load the textures half and rebuild the path index. Clears first,
    /// like `load_materials`.
    pub fn load_textures(&mut self, path: &Path) -> Result<(), DatabaseError> {
        self.textures.clear();
        self.texture_errors.clear();
        self.texture_index.clear();
        let (textures, errors) = io::load_textures(path)?;
        self.textures = textures;
        self.texture_errors = errors;
        self.rebuild_texture_index();
        Ok(())
    }
}

/// Parse every `material <name> { ... }` statement in one script file.
/// Stops at the first malformed material; the caller records the failure
/// for the whole file.
pub fn parse_material_source(path: &Path, text: &str) -> Result<Vec<Material>, MaterialError> {
    let mut materials = Vec::new();
    let mut parser = Parser::new(text);

    while let Some(token) = parser.read_token() {
        if token.starts_with("//") {
            parser.read_to_eol();
            continue;
        }
        if let Some(rest) = token.strip_prefix("/*") {
            parser.unread(rest.len());
            parser.skip_comment()?;
            continue;
        }
        if !token.eq_ignore_ascii_case("material") {
            continue;
        }

        let mut name = parser
            .read_token()
            .ok_or(ParseError::MissingMaterialName)?;
        // Script writers glue the brace onto the name; rewind so the block
        // extraction still sees it.
        if let Some(stripped) = name.strip_suffix('{') {
            name = stripped;
            parser.unread(1);
        }
        if name.is_empty() {
            return Err(ParseError::MissingMaterialName.into());
        }

        let block = parser
            .read_block()
            .map_err(|source| MaterialError::BadBlock {
                name: name.to_string(),
                source,
            })?;
        materials.push(Material::from_block(path, name, block)?);
    }
    Ok(materials)
}

/// Recursively gather files matching one of `extensions` (lower-cased,
/// without dots).
fn collect_files(
    dir: &Path,
    extensions: &[&str],
    files: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extensions, files)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.contains(&ext.to_lowercase().as_str()) {
                files.push(path);
            }
        }
    }
    Ok(())
}

pub use io::FORMAT_VERSION;
