//! XML manifest writer for calibrated texture packs.
//!
//! The manifest mirrors the pack on disk: one `SourceInfos` element
//! echoing the build parameters, and one `CalibratedTexture` element
//! naming the image and every swatch file with its calibrated color.

use std::path::Path;

use crate::calibration::{CalibratedTexture, CustomSwatch, Swatch, TargetFormat};
use crate::color::{xyy_to_xyz, xyz_to_srgb};
use crate::error::CalibrationError;

pub(super) fn write(
    path: &Path,
    texture: &CalibratedTexture,
    texture_path: &Path,
    min_path: &Path,
    max_path: &Path,
    avg_path: &Path,
    custom_paths: &[std::path::PathBuf],
) -> Result<(), CalibrationError> {
    let params = &texture.params;

    let mut source_infos = Element::new("SourceInfos");
    source_infos.child(Element::new("SourceImageName").attr("Value", &params.source_image_name));
    source_infos.child(Element::new("ISOSpeed").attr("Value", params.shot.iso.to_string()));
    source_infos
        .child(Element::new("ShutterSpeed").attr("Value", params.shot.shutter_speed.to_string()));
    source_infos.child(Element::new("Aperture").attr("Value", params.shot.aperture.to_string()));
    source_infos.child(Element::new("CropSource").attr("Value", params.crop_source.to_string()));
    source_infos.child(
        Element::new("CropRectangleCenter")
            .attr("X", params.crop_rectangle_center[0].to_string())
            .attr("Y", params.crop_rectangle_center[1].to_string()),
    );
    source_infos.child(
        Element::new("CropRectangleHalfSize")
            .attr("X", params.crop_rectangle_half_size[0].to_string())
            .attr("Y", params.crop_rectangle_half_size[1].to_string()),
    );
    source_infos.child(
        Element::new("CropRectangleRotation")
            .attr("Value", params.crop_rectangle_rotation.to_string()),
    );
    source_infos.child(
        Element::new("SwatchesSize")
            .attr("Width", params.swatch_width.to_string())
            .attr("Height", params.swatch_height.to_string()),
    );
    source_infos
        .child(Element::new("TargetFormat").attr("Value", format_name(params.target_format)));

    let mut default_swatches = Element::new("DefaultSwatches");
    default_swatches.child(swatch_element("Min", min_path, texture.swatch_min()));
    default_swatches.child(swatch_element("Max", max_path, texture.swatch_max()));
    default_swatches.child(swatch_element("Avg", avg_path, texture.swatch_avg()));

    let mut calibrated = Element::new("CalibratedTexture")
        .attr("Name", file_name(texture_path))
        .attr("Width", texture.texture().width.to_string())
        .attr("Height", texture.texture().height.to_string());
    calibrated.child(default_swatches);

    if !texture.custom_swatches().is_empty() {
        let mut custom_swatches =
            Element::new("CustomSwatches").attr("Count", texture.custom_swatches().len().to_string());
        for (index, (custom, custom_path)) in texture
            .custom_swatches()
            .iter()
            .zip(custom_paths)
            .enumerate()
        {
            custom_swatches.child(custom_swatch_element(index, custom_path, custom));
        }
        calibrated.child(custom_swatches);
    }

    let mut root = Element::new("Manifest");
    root.child(source_infos);
    root.child(calibrated);

    let mut document = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    root.render(0, &mut document);

    std::fs::write(path, document).map_err(|source| CalibrationError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

fn swatch_element(name: &str, file: &Path, swatch: &Swatch) -> Element {
    let rgb = xyz_to_srgb(xyy_to_xyz(swatch.xyy));
    Element::new(name)
        .attr("Name", file_name(file))
        .attr("xyY", triplet(swatch.xyy))
        .attr("RGB", triplet(rgb))
}

fn custom_swatch_element(index: usize, file: &Path, custom: &CustomSwatch) -> Element {
    let location = custom.location;
    swatch_element(&format!("Custom{}", index), file, &custom.swatch)
        .attr("SamplingLocation", format!("{},{}", location[0], location[1]))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn triplet(v: [f32; 3]) -> String {
    format!("{},{},{}", v[0], v[1], v[2])
}

fn format_name(format: TargetFormat) -> &'static str {
    match format {
        TargetFormat::Png8 => "Png8",
        TargetFormat::Png16 => "Png16",
        TargetFormat::Tiff16 => "Tiff16",
    }
}

/// Minimal XML element tree, just enough for the manifest's
/// element/attribute shape.
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    fn child(&mut self, child: Element) {
        self.children.push(child);
    }

    fn render(&self, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />\n");
            return;
        }
        out.push_str(">\n");
        for child in &self.children {
            child.render(depth + 1, out);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
