//! Versioned binary persistence for the materials/textures databases.
//!
//! Layout (little-endian):
//! ```text
//! magic    [u8; 4]   "MTDB"
//! version  u32
//! count    u32
//! count x record
//! error_count u32
//! error_count x { file: str, message_chain: str }
//! ```
//! Strings are u32 length-prefixed UTF-8. Derived state (ref-counts,
//! resolution caches, diagnostics) is never written.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::database::FileError;
use crate::error::DatabaseError;
use crate::models::{
    Layer, MaskingMode, Material, Options, Programs, ProgramType, ReuseMode, Slot,
    TextureFileInfo, TextureFileType, TextureRef, TextureUsage,
};

const MAGIC: [u8; 4] = *b"MTDB";
pub const FORMAT_VERSION: u32 = 1;

// Upper bound on any single preallocation. A corrupt count still fails,
// but as a Corrupt error from read_exact instead of an aborting alloc.
const PREALLOC_CAP: usize = 1 << 16;

fn prealloc(count: u32) -> usize {
    (count as usize).min(PREALLOC_CAP)
}

pub(super) fn save_materials(
    path: &Path,
    materials: &[Material],
    errors: &[FileError],
) -> Result<(), DatabaseError> {
    let mut w = Writer::create(path)?;
    w.header()?;
    w.u32(materials.len() as u32)?;
    for material in materials {
        write_material(&mut w, material)?;
    }
    write_errors(&mut w, errors)?;
    w.finish()
}

pub(super) fn load_materials(path: &Path) -> Result<(Vec<Material>, Vec<FileError>), DatabaseError> {
    let mut r = Reader::open(path)?;
    r.header()?;
    let count = r.u32()?;
    let mut materials = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        materials.push(read_material(&mut r)?);
    }
    let errors = read_errors(&mut r)?;
    Ok((materials, errors))
}

pub(super) fn save_textures(
    path: &Path,
    textures: &[TextureFileInfo],
    errors: &[FileError],
) -> Result<(), DatabaseError> {
    let mut w = Writer::create(path)?;
    w.header()?;
    w.u32(textures.len() as u32)?;
    for texture in textures {
        w.str(&texture.path)?;
        w.u32(texture.width)?;
        w.u32(texture.height)?;
        w.u8(texture.file_type as u8)?;
        w.u8(texture.usage as u8)?;
    }
    write_errors(&mut w, errors)?;
    w.finish()
}

pub(super) fn load_textures(
    path: &Path,
) -> Result<(Vec<TextureFileInfo>, Vec<FileError>), DatabaseError> {
    let mut r = Reader::open(path)?;
    r.header()?;
    let count = r.u32()?;
    let mut textures = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        textures.push(TextureFileInfo {
            path: r.str()?,
            width: r.u32()?,
            height: r.u32()?,
            file_type: read_file_type(&mut r)?,
            usage: read_usage(&mut r)?,
            ref_count: 0,
        });
    }
    let errors = read_errors(&mut r)?;
    Ok((textures, errors))
}

fn write_material(w: &mut Writer, m: &Material) -> Result<(), DatabaseError> {
    w.str(&m.name)?;
    w.str(&m.source_file.to_string_lossy())?;

    w.u8(m.programs.kind as u8)?;
    w.u32(m.programs.entries.len() as u32)?;
    for entry in &m.programs.entries {
        w.str(entry)?;
    }

    w.bool(m.options.alpha_test)?;
    w.bool(m.options.is_masking)?;
    w.u8(m.options.extra_layers)?;
    w.bool(m.options.has_normal)?;
    w.bool(m.options.has_gloss)?;
    w.bool(m.options.has_metal)?;
    w.bool(m.options.has_specular)?;
    w.bool(m.options.has_occlusion)?;
    w.bool(m.options.has_emissive)?;
    w.bool(m.options.translucency_enabled)?;

    w.opt_str(m.physics_material.as_deref())?;
    w.opt_str(m.height_map.as_ref().map(|t| t.raw_path.as_str()))?;

    w.f32(m.gloss_min_max[0])?;
    w.f32(m.gloss_min_max[1])?;
    w.f32(m.metal_min_max[0])?;
    w.f32(m.metal_min_max[1])?;

    w.u32(m.layers.len() as u32)?;
    for layer in &m.layers {
        write_layer(w, layer)?;
    }
    Ok(())
}

fn read_material(r: &mut Reader) -> Result<Material, DatabaseError> {
    let name = r.str()?;
    let source_file = PathBuf::from(r.str()?);

    let kind = read_program_type(r)?;
    let entry_count = r.u32()?;
    let mut entries = Vec::with_capacity(prealloc(entry_count));
    for _ in 0..entry_count {
        entries.push(r.str()?);
    }

    let options = Options {
        alpha_test: r.bool()?,
        is_masking: r.bool()?,
        extra_layers: r.u8()?,
        has_normal: r.bool()?,
        has_gloss: r.bool()?,
        has_metal: r.bool()?,
        has_specular: r.bool()?,
        has_occlusion: r.bool()?,
        has_emissive: r.bool()?,
        translucency_enabled: r.bool()?,
    };

    let physics_material = r.opt_str()?;
    let height_map = r.opt_str()?.map(TextureRef::new);

    let gloss_min_max = [r.f32()?, r.f32()?];
    let metal_min_max = [r.f32()?, r.f32()?];

    let layer_count = r.u32()?;
    let mut layers = Vec::with_capacity(prealloc(layer_count));
    for index in 0..layer_count as usize {
        layers.push(read_layer(r, index)?);
    }

    Ok(Material {
        name,
        source_file,
        programs: Programs { kind, entries },
        options,
        layers,
        physics_material,
        height_map,
        gloss_min_max,
        metal_min_max,
        diagnostics: Vec::new(),
    })
}

fn write_layer(w: &mut Writer, layer: &Layer) -> Result<(), DatabaseError> {
    for slot in [
        &layer.diffuse,
        &layer.normal,
        &layer.gloss,
        &layer.metal,
        &layer.specular,
        &layer.mask,
        &layer.occlusion,
        &layer.translucency,
        &layer.emissive,
    ] {
        w.opt_str(slot.texture.as_ref().map(|t| t.raw_path.as_str()))?;
        w.u8(slot.reuse as u8)?;
    }
    w.u8(layer.masking_mode as u8)?;
    w.u8(layer.uv_set)?;
    w.u8(layer.mask_uv_set)?;
    for v in layer.scale_bias {
        w.f32(v)?;
    }
    for v in layer.mask_scale_bias {
        w.f32(v)?;
    }
    match layer.rescale_values {
        Some([a, b]) => {
            w.bool(true)?;
            w.f32(a)?;
            w.f32(b)?;
        }
        None => w.bool(false)?,
    }
    Ok(())
}

fn read_layer(r: &mut Reader, index: usize) -> Result<Layer, DatabaseError> {
    let mut layer = Layer::new(index);
    {
        let slots: [&mut Slot; 9] = [
            &mut layer.diffuse,
            &mut layer.normal,
            &mut layer.gloss,
            &mut layer.metal,
            &mut layer.specular,
            &mut layer.mask,
            &mut layer.occlusion,
            &mut layer.translucency,
            &mut layer.emissive,
        ];
        for slot in slots {
            slot.texture = r.opt_str()?.map(TextureRef::new);
            slot.reuse = read_reuse(r)?;
        }
    }
    layer.masking_mode = read_masking(r)?;
    layer.uv_set = r.u8()?;
    layer.mask_uv_set = r.u8()?;
    for v in &mut layer.scale_bias {
        *v = r.f32()?;
    }
    for v in &mut layer.mask_scale_bias {
        *v = r.f32()?;
    }
    layer.rescale_values = if r.bool()? {
        Some([r.f32()?, r.f32()?])
    } else {
        None
    };
    Ok(layer)
}

fn write_errors(w: &mut Writer, errors: &[FileError]) -> Result<(), DatabaseError> {
    w.u32(errors.len() as u32)?;
    for error in errors {
        w.str(&error.file.to_string_lossy())?;
        w.str(&error.message)?;
    }
    Ok(())
}

fn read_errors(r: &mut Reader) -> Result<Vec<FileError>, DatabaseError> {
    let count = r.u32()?;
    let mut errors = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        errors.push(FileError {
            file: PathBuf::from(r.str()?),
            message: r.str()?,
        });
    }
    Ok(errors)
}

fn read_reuse(r: &mut Reader) -> Result<ReuseMode, DatabaseError> {
    match r.u8()? {
        0 => Ok(ReuseMode::None),
        1 => Ok(ReuseMode::ReuseLayer0),
        2 => Ok(ReuseMode::ReuseLayer1),
        v => Err(r.corrupt(format!("invalid reuse mode {}", v))),
    }
}

fn read_masking(r: &mut Reader) -> Result<MaskingMode, DatabaseError> {
    match r.u8()? {
        0 => Ok(MaskingMode::None),
        1 => Ok(MaskingMode::VertexColor),
        2 => Ok(MaskingMode::Map),
        3 => Ok(MaskingMode::MapTimesVertexColor),
        v => Err(r.corrupt(format!("invalid masking mode {}", v))),
    }
}

fn read_program_type(r: &mut Reader) -> Result<ProgramType, DatabaseError> {
    match r.u8()? {
        0 => Ok(ProgramType::Default),
        1 => Ok(ProgramType::Skin),
        2 => Ok(ProgramType::Eye),
        3 => Ok(ProgramType::Hair),
        4 => Ok(ProgramType::Vegetation),
        5 => Ok(ProgramType::Vista),
        6 => Ok(ProgramType::Other),
        v => Err(r.corrupt(format!("invalid program type {}", v))),
    }
}

fn read_file_type(r: &mut Reader) -> Result<TextureFileType, DatabaseError> {
    match r.u8()? {
        0 => Ok(TextureFileType::Png),
        1 => Ok(TextureFileType::Tga),
        2 => Ok(TextureFileType::Jpg),
        3 => Ok(TextureFileType::Tiff),
        4 => Ok(TextureFileType::Other),
        v => Err(r.corrupt(format!("invalid texture file type {}", v))),
    }
}

fn read_usage(r: &mut Reader) -> Result<TextureUsage, DatabaseError> {
    match r.u8()? {
        0 => Ok(TextureUsage::Diffuse),
        1 => Ok(TextureUsage::Normal),
        2 => Ok(TextureUsage::Gloss),
        3 => Ok(TextureUsage::Metal),
        4 => Ok(TextureUsage::Emissive),
        5 => Ok(TextureUsage::Other),
        v => Err(r.corrupt(format!("invalid texture usage {}", v))),
    }
}

struct Writer {
    inner: BufWriter<File>,
    path: PathBuf,
}

impl Writer {
    fn create(path: &Path) -> Result<Self, DatabaseError> {
        let file = File::create(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            inner: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    fn header(&mut self) -> Result<(), DatabaseError> {
        self.bytes(&MAGIC)?;
        self.u32(FORMAT_VERSION)
    }

    fn bytes(&mut self, bytes: &[u8]) -> Result<(), DatabaseError> {
        self.inner.write_all(bytes).map_err(|source| DatabaseError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn u8(&mut self, v: u8) -> Result<(), DatabaseError> {
        self.bytes(&[v])
    }

    fn bool(&mut self, v: bool) -> Result<(), DatabaseError> {
        self.u8(v as u8)
    }

    fn u32(&mut self, v: u32) -> Result<(), DatabaseError> {
        self.bytes(&v.to_le_bytes())
    }

    fn f32(&mut self, v: f32) -> Result<(), DatabaseError> {
        self.bytes(&v.to_le_bytes())
    }

    fn str(&mut self, s: &str) -> Result<(), DatabaseError> {
        self.u32(s.len() as u32)?;
        self.bytes(s.as_bytes())
    }

    fn opt_str(&mut self, s: Option<&str>) -> Result<(), DatabaseError> {
        match s {
            Some(s) => {
                self.bool(true)?;
                self.str(s)
            }
            None => self.bool(false),
        }
    }

    fn finish(mut self) -> Result<(), DatabaseError> {
        self.inner.flush().map_err(|source| DatabaseError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

struct Reader {
    inner: BufReader<File>,
    path: PathBuf,
}

impl Reader {
    fn open(path: &Path) -> Result<Self, DatabaseError> {
        let file = File::open(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            inner: BufReader::new(file),
            path: path.to_path_buf(),
        })
    }

    fn corrupt(&self, detail: String) -> DatabaseError {
        DatabaseError::Corrupt {
            path: self.path.clone(),
            detail,
        }
    }

    fn header(&mut self) -> Result<(), DatabaseError> {
        let mut magic = [0u8; 4];
        self.exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DatabaseError::BadMagic {
                path: self.path.clone(),
            });
        }
        let version = self.u32()?;
        if version != FORMAT_VERSION {
            return Err(DatabaseError::BadVersion {
                path: self.path.clone(),
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }

    fn exact(&mut self, buf: &mut [u8]) -> Result<(), DatabaseError> {
        self.inner
            .read_exact(buf)
            .map_err(|e| self.corrupt(e.to_string()))
    }

    fn u8(&mut self) -> Result<u8, DatabaseError> {
        let mut b = [0u8; 1];
        self.exact(&mut b)?;
        Ok(b[0])
    }

    fn bool(&mut self) -> Result<bool, DatabaseError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(self.corrupt(format!("invalid bool byte {}", v))),
        }
    }

    fn u32(&mut self) -> Result<u32, DatabaseError> {
        let mut b = [0u8; 4];
        self.exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn f32(&mut self) -> Result<f32, DatabaseError> {
        let mut b = [0u8; 4];
        self.exact(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    fn str(&mut self) -> Result<String, DatabaseError> {
        let len = self.u32()? as usize;
        // Arbitrary cap so a corrupt length can't trigger a huge allocation
        if len > 1 << 24 {
            return Err(self.corrupt(format!("implausible string length {}", len)));
        }
        let mut bytes = vec![0u8; len];
        self.exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| self.corrupt(e.to_string()))
    }

    fn opt_str(&mut self) -> Result<Option<String>, DatabaseError> {
        if self.bool()? {
            Ok(Some(self.str()?))
        } else {
            Ok(None)
        }
    }
}
