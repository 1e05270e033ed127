//! Cross-reference resolver and material analyzer.
//!
//! `resolve` links every texture slot to its database record and derives
//! ref-counts; `analyze` runs the per-material, per-layer and inter-layer
//! rules and rebuilds each material's diagnostics. Both passes recompute
//! all derived state from scratch, so re-running them is idempotent.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::database::Database;
use crate::models::{
    normalize_path, Channel, Material, ReuseMode, Slot, REUSABLE_CHANNELS,
};

/// Tolerance for the gloss/metal range checks.
const RANGE_EPSILON: f32 = 1e-3;

/// Diagnostic severity. Optimization findings are warnings that also make
/// the material a merge/reuse candidate when it has no hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Optimization,
}

/// One structured analyzer finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Layer the finding concerns, if any.
    pub layer: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(layer: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            layer,
            message: message.into(),
        }
    }

    pub fn warning(layer: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            layer,
            message: message.into(),
        }
    }

    pub fn optimization(layer: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Optimization,
            layer,
            message: message.into(),
        }
    }

    /// Render matching diagnostics in the bullet-and-tab report format.
    pub fn render(diagnostics: &[Diagnostic], filter: impl Fn(&Diagnostic) -> bool) -> String {
        let mut out = String::new();
        for d in diagnostics.iter().filter(|d| filter(d)) {
            out.push_str("\t\u{2022} ");
            out.push_str(&d.message);
            out.push('\n');
        }
        out
    }
}

/// Analysis cannot run on an empty database half.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("no materials available; parse material scripts first")]
    NoMaterials,

    #[error("no textures available; collect textures first")]
    NoTextures,
}

/// Resolution context: everything path lookup needs, passed explicitly
/// instead of living in process-wide state.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Base directory relative texture paths resolve against.
    pub textures_base: PathBuf,
}

impl ResolveContext {
    pub fn new(textures_base: impl Into<PathBuf>) -> Self {
        Self {
            textures_base: textures_base.into(),
        }
    }

    /// Normalized absolute key for a raw script path.
    pub fn texture_key(&self, raw_path: &str) -> String {
        let path = Path::new(raw_path);
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.textures_base.join(path))
        }
    }
}

/// Link every texture slot (height map included) to its database record.
/// Ref-counts are fully reset first so repeated runs never accumulate.
pub fn resolve(db: &mut Database, ctx: &ResolveContext) {
    for texture in &mut db.textures {
        texture.ref_count = 0;
    }

    let Database {
        materials,
        textures,
        texture_index,
        ..
    } = db;

    let mut link = |texture_ref: &mut crate::models::TextureRef| {
        texture_ref.resolved = None;
        let key = ctx.texture_key(&texture_ref.raw_path);
        if let Some(&index) = texture_index.get(&key) {
            textures[index].ref_count += 1;
            texture_ref.resolved = Some(index);
        }
    };

    for material in materials {
        if let Some(height) = &mut material.height_map {
            link(height);
        }
        for layer in &mut material.layers {
            for channel in [
                Channel::Diffuse,
                Channel::Normal,
                Channel::Gloss,
                Channel::Metal,
                Channel::Specular,
                Channel::Mask,
                Channel::Occlusion,
                Channel::Translucency,
                Channel::Emissive,
            ] {
                if let Some(texture_ref) = &mut layer.slot_mut(channel).texture {
                    link(texture_ref);
                }
            }
        }
    }
}

/// Run the full analysis pass: resolve, then per-material rules. Each
/// material's diagnostics are rebuilt from scratch.
pub fn analyze(db: &mut Database, ctx: &ResolveContext) -> Result<(), AnalyzeError> {
    if db.materials.is_empty() {
        return Err(AnalyzeError::NoMaterials);
    }
    if db.textures.is_empty() {
        return Err(AnalyzeError::NoTextures);
    }

    resolve(db, ctx);

    for material in &mut db.materials {
        material.diagnostics = check_material(material);
    }
    Ok(())
}

fn check_material(material: &Material) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let layers_count = material.used_layer_count();

    // General checks
    if material.physics_material.is_none() {
        diagnostics.push(Diagnostic::error(None, "Physics material is not setup!"));
    }

    let declared = 1 + material.options.extra_layers as usize;
    if material.layers.len() != declared {
        diagnostics.push(Diagnostic::warning(
            None,
            format!(
                "Options specify extraLayer={} but found parameters involving {} layers! \
                 Either adjust the extra layers count or remove the surnumerary layer parameters...",
                material.options.extra_layers,
                material.layers.len()
            ),
        ));
    }

    check_range(
        &mut diagnostics,
        material.options.has_gloss,
        material.gloss_min_max,
        "Gloss",
    );
    check_range(
        &mut diagnostics,
        material.options.has_metal,
        material.metal_min_max,
        "Metal",
    );

    // Per-layer checks
    for layer in &material.layers[..layers_count] {
        check_slot(&mut diagnostics, layer.index, Channel::Diffuse, &layer.diffuse);
        if material.options.has_normal {
            check_slot(&mut diagnostics, layer.index, Channel::Normal, &layer.normal);
        }
        if material.options.has_gloss {
            check_slot(&mut diagnostics, layer.index, Channel::Gloss, &layer.gloss);
        }
        if material.options.has_metal {
            check_slot(&mut diagnostics, layer.index, Channel::Metal, &layer.metal);
        }
        if material.options.has_specular {
            check_slot(
                &mut diagnostics,
                layer.index,
                Channel::Specular,
                &layer.specular,
            );
        }
        if layer.masking_mode.uses_map() {
            check_slot(&mut diagnostics, layer.index, Channel::Mask, &layer.mask);
        }
        if material.options.has_occlusion {
            check_slot(
                &mut diagnostics,
                layer.index,
                Channel::Occlusion,
                &layer.occlusion,
            );
        }
        if material.options.translucency_enabled {
            check_slot(
                &mut diagnostics,
                layer.index,
                Channel::Translucency,
                &layer.translucency,
            );
        }
        if material.options.has_emissive {
            check_slot(
                &mut diagnostics,
                layer.index,
                Channel::Emissive,
                &layer.emissive,
            );
        }
    }

    // Inter-layer redundancy checks
    for top_index in 1..layers_count {
        for bottom_index in 0..top_index {
            for &channel in REUSABLE_CHANNELS {
                let enabled = match channel {
                    Channel::Diffuse => true,
                    Channel::Normal => material.options.has_normal,
                    Channel::Gloss => material.options.has_gloss,
                    Channel::Metal => material.options.has_metal,
                    Channel::Specular => material.options.has_specular,
                    _ => false,
                };
                if enabled {
                    compare_layers(&mut diagnostics, material, top_index, bottom_index, channel);
                }
            }
        }
    }

    diagnostics
}

fn check_range(diagnostics: &mut Vec<Diagnostic>, enabled: bool, min_max: [f32; 2], name: &str) {
    if !enabled {
        return;
    }
    if (min_max[0] - 0.0).abs() < RANGE_EPSILON && (min_max[1] - 0.5).abs() < RANGE_EPSILON {
        diagnostics.push(Diagnostic::error(
            None,
            format!(
                "{} min/max are the default values! Material is not initialized!",
                name
            ),
        ));
    } else if (min_max[0] - min_max[1]).abs() < RANGE_EPSILON {
        diagnostics.push(Diagnostic::error(
            None,
            format!(
                "{} min/max are set to an empty range whereas the \"use {} map\" option is set! \
                 This will have no effect! Options and textures should be removed...",
                name,
                name.to_lowercase()
            ),
        ));
    }
}

/// An enabled channel must either borrow another layer's texture or have a
/// resolved file of its own.
fn check_slot(
    diagnostics: &mut Vec<Diagnostic>,
    layer_index: usize,
    channel: Channel,
    slot: &Slot,
) {
    if slot.reuse != ReuseMode::None {
        return;
    }
    match &slot.texture {
        None => diagnostics.push(Diagnostic::error(
            Some(layer_index),
            format!(
                "Missing {} texture for layer {}!",
                channel.as_str(),
                layer_index
            ),
        )),
        Some(texture_ref) if texture_ref.resolved.is_none() => {
            diagnostics.push(Diagnostic::error(
                Some(layer_index),
                format!(
                    "{} texture for layer {} not found on disk: {}",
                    channel.as_str(),
                    layer_index,
                    texture_ref.raw_path
                ),
            ))
        }
        Some(_) => {}
    }
}

/// Layer a slot physically samples from: the borrowed layer when a reuse
/// flag is set, its own layer otherwise.
fn effective_source_layer(layer_index: usize, slot: &Slot) -> usize {
    slot.reuse.reused_layer().unwrap_or(layer_index)
}

fn compare_layers(
    diagnostics: &mut Vec<Diagnostic>,
    material: &Material,
    top_index: usize,
    bottom_index: usize,
    channel: Channel,
) {
    let top = material.layers[top_index].slot(channel);
    let bottom = material.layers[bottom_index].slot(channel);

    // Already sharing through reuse flags: nothing to gain.
    if effective_source_layer(top_index, top) == effective_source_layer(bottom_index, bottom) {
        return;
    }

    let (Some(top_ref), Some(bottom_ref)) = (&top.texture, &bottom.texture) else {
        return;
    };
    let (Some(top_file), Some(bottom_file)) = (top_ref.resolved, bottom_ref.resolved) else {
        return;
    };

    if top_file == bottom_file {
        diagnostics.push(Diagnostic::optimization(
            Some(top_index),
            format!(
                "Same file used by {} texture (layer {}) and {} texture (layer {})! \
                 The top layer should re-use the bottom layer's texture instead of sampling it twice...",
                channel.as_str(),
                top_index,
                channel.as_str(),
                bottom_index
            ),
        ));
    }
}
