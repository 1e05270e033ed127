//! Material aggregate and the script block builder.

use std::path::{Path, PathBuf};

use crate::analyzer::{Diagnostic, Severity};
use crate::error::MaterialError;
use crate::parser::Parser;

/// Hard cap on composited layers (base layer + up to 2 extra layers).
pub const MAX_LAYERS: usize = 3;

/// Texture channels a layer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Diffuse,
    Normal,
    Gloss,
    Metal,
    Specular,
    Mask,
    Occlusion,
    Translucency,
    Emissive,
}

impl Channel {
    /// Display name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diffuse => "diffuse",
            Self::Normal => "normal",
            Self::Gloss => "gloss",
            Self::Metal => "metal",
            Self::Specular => "specular",
            Self::Mask => "mask",
            Self::Occlusion => "AO",
            Self::Translucency => "translucency",
            Self::Emissive => "emissive",
        }
    }
}

/// Channels that higher layers may borrow from lower layers, and that the
/// inter-layer redundancy check compares.
pub const REUSABLE_CHANNELS: &[Channel] = &[
    Channel::Diffuse,
    Channel::Normal,
    Channel::Gloss,
    Channel::Metal,
    Channel::Specular,
];

/// Reuse flag attached to a texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReuseMode {
    /// The layer samples its own texture.
    #[default]
    None,
    /// Borrow the already-resolved texture from layer 0.
    ReuseLayer0,
    /// Borrow from layer 1 (only meaningful on layer 2).
    ReuseLayer1,
}

impl ReuseMode {
    /// Index of the borrowed layer, if any.
    pub fn reused_layer(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::ReuseLayer0 => Some(0),
            Self::ReuseLayer1 => Some(1),
        }
    }
}

/// How a layer is masked over the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskingMode {
    #[default]
    None,
    VertexColor,
    Map,
    MapTimesVertexColor,
}

impl MaskingMode {
    /// True when the mode samples a mask texture.
    pub fn uses_map(&self) -> bool {
        matches!(self, Self::Map | Self::MapTimesVertexColor)
    }
}

/// Weak reference to a texture file by path. `resolved` is a cache into
/// the texture database, cleared and rebuilt on every analysis pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub raw_path: String,
    pub resolved: Option<usize>,
}

impl TextureRef {
    pub fn new(raw_path: impl Into<String>) -> Self {
        Self {
            raw_path: raw_path.into(),
            resolved: None,
        }
    }
}

/// One texture slot: an optional texture reference plus its reuse flag.
/// A slot with a reuse flag never carries its own path; the builder drops
/// the path so reused slots stay value-less placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub texture: Option<TextureRef>,
    pub reuse: ReuseMode,
}

/// One of up to three stacked surface descriptions.
#[derive(Debug, Clone)]
pub struct Layer {
    pub index: usize,
    pub diffuse: Slot,
    pub normal: Slot,
    pub gloss: Slot,
    pub metal: Slot,
    pub specular: Slot,
    pub mask: Slot,
    pub occlusion: Slot,
    pub translucency: Slot,
    pub emissive: Slot,
    pub masking_mode: MaskingMode,
    pub uv_set: u8,
    pub mask_uv_set: u8,
    pub scale_bias: [f32; 4],
    pub mask_scale_bias: [f32; 4],
    /// Mask rescale range (layers >= 1 only in practice).
    pub rescale_values: Option<[f32; 2]>,
}

impl Layer {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            diffuse: Slot::default(),
            normal: Slot::default(),
            gloss: Slot::default(),
            metal: Slot::default(),
            specular: Slot::default(),
            mask: Slot::default(),
            occlusion: Slot::default(),
            translucency: Slot::default(),
            emissive: Slot::default(),
            masking_mode: MaskingMode::None,
            uv_set: 0,
            mask_uv_set: 0,
            scale_bias: [1.0, 1.0, 0.0, 0.0],
            mask_scale_bias: [1.0, 1.0, 0.0, 0.0],
            rescale_values: None,
        }
    }

    pub fn slot(&self, channel: Channel) -> &Slot {
        match channel {
            Channel::Diffuse => &self.diffuse,
            Channel::Normal => &self.normal,
            Channel::Gloss => &self.gloss,
            Channel::Metal => &self.metal,
            Channel::Specular => &self.specular,
            Channel::Mask => &self.mask,
            Channel::Occlusion => &self.occlusion,
            Channel::Translucency => &self.translucency,
            Channel::Emissive => &self.emissive,
        }
    }

    pub fn slot_mut(&mut self, channel: Channel) -> &mut Slot {
        match channel {
            Channel::Diffuse => &mut self.diffuse,
            Channel::Normal => &mut self.normal,
            Channel::Gloss => &mut self.gloss,
            Channel::Metal => &mut self.metal,
            Channel::Specular => &mut self.specular,
            Channel::Mask => &mut self.mask,
            Channel::Occlusion => &mut self.occlusion,
            Channel::Translucency => &mut self.translucency,
            Channel::Emissive => &mut self.emissive,
        }
    }
}

/// Option flags controlling which channels exist for a material.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub alpha_test: bool,
    pub is_masking: bool,
    /// 0, 1 or 2 extra layers on top of the base layer.
    pub extra_layers: u8,
    pub has_normal: bool,
    pub has_gloss: bool,
    pub has_metal: bool,
    pub has_specular: bool,
    pub has_occlusion: bool,
    pub has_emissive: bool,
    pub translucency_enabled: bool,
}

impl Options {
    pub fn is_alpha(&self) -> bool {
        self.alpha_test || self.is_masking
    }
}

/// Shader program classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramType {
    #[default]
    Default,
    Skin,
    Eye,
    Hair,
    Vegetation,
    Vista,
    Other,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Skin => "Skin",
            Self::Eye => "Eye",
            Self::Hair => "Hair",
            Self::Vegetation => "Vegetation",
            Self::Vista => "Vista",
            Self::Other => "Other",
        }
    }
}

/// Shader program list plus the derived classification.
#[derive(Debug, Clone, Default)]
pub struct Programs {
    pub kind: ProgramType,
    pub entries: Vec<String>,
}

impl Programs {
    fn classify(entries: Vec<String>) -> Self {
        let mut kind = ProgramType::Default;
        for entry in &entries {
            let lower = entry.to_lowercase();
            let matched = if lower.contains("skin") {
                ProgramType::Skin
            } else if lower.contains("eye") {
                ProgramType::Eye
            } else if lower.contains("hair") {
                ProgramType::Hair
            } else if lower.contains("vegetation") || lower.contains("foliage") {
                ProgramType::Vegetation
            } else if lower.contains("vista") {
                ProgramType::Vista
            } else if lower.contains("default") {
                ProgramType::Default
            } else {
                ProgramType::Other
            };
            if matched != ProgramType::Default {
                kind = matched;
                break;
            }
        }
        if kind == ProgramType::Default && !entries.is_empty() {
            let any_default = entries
                .iter()
                .any(|e| e.to_lowercase().contains("default"));
            if !any_default {
                kind = ProgramType::Other;
            }
        }
        Self { kind, entries }
    }
}

/// Untouched gloss/metal range as written by the material template. The
/// analyzer flags materials still carrying it.
pub const DEFAULT_MIN_MAX: [f32; 2] = [0.0, 0.5];

/// A parsed material. Structurally immutable after construction; only
/// `diagnostics` and the slot resolution caches mutate, and those are
/// rebuilt from scratch by every analyzer pass.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub source_file: PathBuf,
    pub programs: Programs,
    pub options: Options,
    pub layers: Vec<Layer>,
    pub physics_material: Option<String>,
    pub height_map: Option<TextureRef>,
    pub gloss_min_max: [f32; 2],
    pub metal_min_max: [f32; 2],
    /// Derived analysis state, recomputed (never appended to) per pass.
    pub diagnostics: Vec<Diagnostic>,
}

impl Material {
    /// Build a material from its name and raw block text (outer braces
    /// included). Unknown declarations are skipped for forward
    /// compatibility; malformed values fail with the material name attached.
    pub fn from_block(
        source_file: &Path,
        name: &str,
        block: &str,
    ) -> Result<Material, MaterialError> {
        let mut builder = Builder {
            name,
            material: Material {
                name: name.to_string(),
                source_file: source_file.to_path_buf(),
                programs: Programs::default(),
                options: Options::default(),
                layers: vec![Layer::new(0)],
                physics_material: None,
                height_map: None,
                gloss_min_max: DEFAULT_MIN_MAX,
                metal_min_max: DEFAULT_MIN_MAX,
                diagnostics: Vec::new(),
            },
        };
        builder.parse(block)?;

        let mut material = builder.material;

        // Reused slots are placeholders; a stray path on one is dropped.
        for layer in &mut material.layers {
            for &channel in REUSABLE_CHANNELS {
                let slot = layer.slot_mut(channel);
                if slot.reuse != ReuseMode::None {
                    slot.texture = None;
                }
            }
            if layer.mask.reuse != ReuseMode::None {
                layer.mask.texture = None;
            }
        }

        Ok(material)
    }

    /// Number of layers the shader will actually composite.
    pub fn used_layer_count(&self) -> usize {
        (1 + self.options.extra_layers as usize).min(self.layers.len())
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity != Severity::Error)
    }

    /// Errors rendered in the bullet-and-tab report format.
    pub fn error_string(&self) -> String {
        Diagnostic::render(&self.diagnostics, |d| d.severity == Severity::Error)
    }

    /// Warnings (including redundancy findings) in report format.
    pub fn warning_string(&self) -> String {
        Diagnostic::render(&self.diagnostics, |d| d.severity != Severity::Error)
    }

    /// Redundancy findings, offered only for materials without hard errors.
    pub fn optimization_hint(&self) -> Option<String> {
        if self.has_errors() {
            return None;
        }
        let hint = Diagnostic::render(&self.diagnostics, |d| {
            d.severity == Severity::Optimization
        });
        if hint.is_empty() {
            None
        } else {
            Some(hint)
        }
    }

    /// Get the layer at `index`, growing the stack if needed (layer
    /// declarations can appear before the extraLayer option).
    fn layer_mut(&mut self, index: usize) -> &mut Layer {
        while self.layers.len() <= index {
            let next = self.layers.len();
            self.layers.push(Layer::new(next));
        }
        &mut self.layers[index]
    }
}

struct Builder<'a> {
    name: &'a str,
    material: Material,
}

impl Builder<'_> {
    fn parse(&mut self, block: &str) -> Result<(), MaterialError> {
        // Outer braces stripped; everything inside is key/value statements.
        let inner = block
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(block);
        let mut parser = Parser::new(inner);

        while let Some(token) = parser.read_token() {
            if token.starts_with("//") {
                parser.read_to_eol();
                continue;
            }
            if let Some(rest) = token.strip_prefix("/*") {
                parser.unread(rest.len());
                parser
                    .skip_comment()
                    .map_err(|source| self.wrap_syntax(source))?;
                continue;
            }

            let key = token.trim_start_matches('$').to_lowercase();
            self.statement(&key, &mut parser)?;
        }
        Ok(())
    }

    fn statement(&mut self, key: &str, parser: &mut Parser) -> Result<(), MaterialError> {
        // Layer-prefixed keys route to their layer; bare map keys are layer 0.
        if let Some((layer_index, rest)) = split_layer_prefix(key) {
            if self.layer_statement(layer_index, rest, parser)? {
                return Ok(());
            }
            // Unrecognized Layer<i>_ parameter (color constants, invert
            // flags, ...) falls through to the unknown-key skip.
            return self.skip_unknown(parser);
        }

        match key {
            "programs" => {
                let block = parser
                    .read_block()
                    .map_err(|source| self.wrap_syntax(source))?;
                let inner = &block[1..block.len() - 1];
                let mut names = Vec::new();
                let mut p = Parser::new(inner);
                while let Some(t) = p.read_token() {
                    names.push(t.to_string());
                }
                self.material.programs = Programs::classify(names);
            }
            "physicsmaterial" => {
                let value = self.value(parser, key)?;
                self.material.physics_material = Some(value.to_string());
            }
            "heightmap" => {
                let value = self.value(parser, key)?;
                self.material.height_map = Some(TextureRef::new(value));
            }
            "glossminmax" => self.material.gloss_min_max = self.floats2(parser, key)?,
            "metallicminmax" => self.material.metal_min_max = self.floats2(parser, key)?,
            "alphatest" => self.material.options.alpha_test = self.flag(parser, key)?,
            "ismasking" => self.material.options.is_masking = self.flag(parser, key)?,
            "extralayer" => {
                let count: u8 = self.number(parser, key)?;
                if count as usize >= MAX_LAYERS {
                    return Err(MaterialError::BadValue {
                        name: self.name.to_string(),
                        key: key.to_string(),
                        value: count.to_string(),
                    });
                }
                self.material.options.extra_layers = count;
            }
            "hasbumpmap" => self.material.options.has_normal = self.flag(parser, key)?,
            "hasglossmap" => self.material.options.has_gloss = self.flag(parser, key)?,
            "hasmetallicmap" => self.material.options.has_metal = self.flag(parser, key)?,
            "hasspecularmap" => self.material.options.has_specular = self.flag(parser, key)?,
            "hasocclusionmap" => self.material.options.has_occlusion = self.flag(parser, key)?,
            "hasemissivemap" => self.material.options.has_emissive = self.flag(parser, key)?,
            "translucencyenabled" => {
                self.material.options.translucency_enabled = self.flag(parser, key)?
            }
            // Bare layer-0 map names carry no Layer0_ prefix in most scripts.
            _ => {
                if self.layer_statement(0, key, parser)? {
                    return Ok(());
                }
                return self.skip_unknown(parser);
            }
        }
        Ok(())
    }

    /// Try to interpret `rest` as a per-layer declaration. Returns false
    /// when the key is not a known layer parameter.
    fn layer_statement(
        &mut self,
        layer_index: usize,
        rest: &str,
        parser: &mut Parser,
    ) -> Result<bool, MaterialError> {
        let channel = match rest {
            "diffusemap" => Some(Channel::Diffuse),
            "bumpmap" => Some(Channel::Normal),
            "glossmap" => Some(Channel::Gloss),
            "metallicmap" => Some(Channel::Metal),
            "specularmap" => Some(Channel::Specular),
            "maskmap" => Some(Channel::Mask),
            "occlusionmap" => Some(Channel::Occlusion),
            "translucencymap" => Some(Channel::Translucency),
            "emissivemap" => Some(Channel::Emissive),
            _ => None,
        };
        if let Some(channel) = channel {
            let path = self.value(parser, rest)?.to_string();
            self.material.layer_mut(layer_index).slot_mut(channel).texture =
                Some(TextureRef::new(path));
            return Ok(true);
        }

        let reuse_channel = match rest {
            "diffusereuselayer" => Some(Channel::Diffuse),
            "bumpreuselayer" => Some(Channel::Normal),
            "glossreuselayer" => Some(Channel::Gloss),
            "metallicreuselayer" => Some(Channel::Metal),
            "specularreuselayer" => Some(Channel::Specular),
            "maskreuselayer" => Some(Channel::Mask),
            _ => None,
        };
        if let Some(channel) = reuse_channel {
            let value: u8 = self.number(parser, rest)?;
            let reuse = self.reuse_mode(layer_index, rest, value)?;
            if layer_index > 0 {
                self.material.layer_mut(layer_index).slot_mut(channel).reuse = reuse;
            }
            return Ok(true);
        }

        match rest {
            "maskmode" => {
                let value: u8 = self.number(parser, rest)?;
                let mode = match value {
                    0 => MaskingMode::VertexColor,
                    1 => MaskingMode::Map,
                    2 => MaskingMode::MapTimesVertexColor,
                    _ => {
                        return Err(MaterialError::BadValue {
                            name: self.name.to_string(),
                            key: rest.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
                self.material.layer_mut(layer_index).masking_mode = mode;
            }
            "uvset" => {
                let value = self.number(parser, rest)?;
                self.material.layer_mut(layer_index).uv_set = value;
            }
            "mask_uvset" => {
                let value = self.number(parser, rest)?;
                self.material.layer_mut(layer_index).mask_uv_set = value;
            }
            "scalebias" => {
                let value = self.floats4(parser, rest)?;
                self.material.layer_mut(layer_index).scale_bias = value;
            }
            "maskscalebias" => {
                let value = self.floats4(parser, rest)?;
                self.material.layer_mut(layer_index).mask_scale_bias = value;
            }
            "rescalevalues" => {
                let value = self.floats2(parser, rest)?;
                self.material.layer_mut(layer_index).rescale_values = Some(value);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Unknown declaration: skip its brace block if one follows, otherwise
    /// drop the rest of the line. Keeps the parser in sync while the
    /// language grows new keys.
    fn skip_unknown(&mut self, parser: &mut Parser) -> Result<(), MaterialError> {
        parser.skip_spaces();
        if parser.peek(0) == Some(b'{') {
            parser
                .skip_block()
                .map_err(|source| self.wrap_syntax(source))?;
        } else {
            parser.read_to_eol();
        }
        Ok(())
    }

    fn reuse_mode(
        &self,
        layer_index: usize,
        key: &str,
        value: u8,
    ) -> Result<ReuseMode, MaterialError> {
        let reuse = match value {
            0 => ReuseMode::None,
            1 => ReuseMode::ReuseLayer0,
            2 if layer_index == 2 => ReuseMode::ReuseLayer1,
            _ => {
                return Err(MaterialError::BadValue {
                    name: self.name.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
        };
        Ok(reuse)
    }

    fn wrap_syntax(&self, source: crate::error::ParseError) -> MaterialError {
        MaterialError::BadBlock {
            name: self.name.to_string(),
            source,
        }
    }

    fn value<'p>(&self, parser: &mut Parser<'p>, key: &str) -> Result<&'p str, MaterialError> {
        parser.read_token().ok_or_else(|| MaterialError::MissingValue {
            name: self.name.to_string(),
            key: key.to_string(),
            expected: 1,
        })
    }

    /// Boolean option value: `0`/`1` or `false`/`true`.
    fn flag(&self, parser: &mut Parser, key: &str) -> Result<bool, MaterialError> {
        let token = self.value(parser, key)?;
        match token {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => Err(MaterialError::BadValue {
                name: self.name.to_string(),
                key: key.to_string(),
                value: token.to_string(),
            }),
        }
    }

    fn number<T: std::str::FromStr>(
        &self,
        parser: &mut Parser,
        key: &str,
    ) -> Result<T, MaterialError> {
        let token = self.value(parser, key)?;
        token.parse().map_err(|_| MaterialError::BadValue {
            name: self.name.to_string(),
            key: key.to_string(),
            value: token.to_string(),
        })
    }

    fn floats2(&self, parser: &mut Parser, key: &str) -> Result<[f32; 2], MaterialError> {
        Ok([self.number(parser, key)?, self.number(parser, key)?])
    }

    fn floats4(&self, parser: &mut Parser, key: &str) -> Result<[f32; 4], MaterialError> {
        Ok([
            self.number(parser, key)?,
            self.number(parser, key)?,
            self.number(parser, key)?,
            self.number(parser, key)?,
        ])
    }
}

/// Split a `layer<i>_` prefix off a normalized key.
fn split_layer_prefix(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("layer")?;
    let digit = rest.chars().next()?;
    let index = digit.to_digit(10)? as usize;
    if index >= MAX_LAYERS {
        return None;
    }
    let rest = &rest[1..];
    let rest = rest.strip_prefix('_')?;
    Some((index, rest))
}
