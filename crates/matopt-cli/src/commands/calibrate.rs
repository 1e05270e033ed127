use std::path::PathBuf;

use matopt_core::bitmap::{ShotInfo, XyzBitmap};
use matopt_core::calibration::{CalibratedTexture, CalibrationParams, CurveCalibration};
use matopt_core::verbose_println;

use crate::{parse_swatch_size, parse_target_format, parse_uv};

/// Execute the calibrate command: load an image, run its luminance
/// through a calibration curve and save the calibrated pack (image,
/// swatches, manifest).
#[allow(clippy::too_many_arguments)]
pub fn cmd_calibrate(
    image: PathBuf,
    curve: PathBuf,
    iso: f32,
    shutter: f32,
    aperture: f32,
    swatch_size: String,
    samples: Vec<String>,
    format: String,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let source = XyzBitmap::load(&image).map_err(|e| e.to_string())?;
    verbose_println!(
        "Loaded {} ({}x{})",
        image.display(),
        source.width,
        source.height
    );

    let mut calibration = CurveCalibration::from_yaml_file(&curve).map_err(|e| e.to_string())?;

    let (swatch_width, swatch_height) = parse_swatch_size(&swatch_size)?;
    let target_format = parse_target_format(&format)?;
    let locations = samples
        .iter()
        .map(|s| parse_uv(s))
        .collect::<Result<Vec<_>, _>>()?;

    let params = CalibrationParams {
        source_image_name: image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        shot: ShotInfo {
            iso,
            shutter_speed: shutter,
            aperture,
        },
        swatch_width,
        swatch_height,
        custom_swatches_count: locations.len(),
        custom_sampling_locations: locations,
        target_format,
        ..CalibrationParams::default()
    };

    let built =
        CalibratedTexture::build(&source, &mut calibration, params).map_err(|e| e.to_string())?;

    let target = out.unwrap_or_else(|| {
        let stem = image
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "calibrated".to_string());
        image.with_file_name(format!("{}_calibrated", stem))
    });
    built.save_pack(&target).map_err(|e| e.to_string())?;

    println!(
        "Calibrated {} -> {} pack ({} custom swatches)",
        image.display(),
        target.with_extension("xml").display(),
        built.custom_swatches().len()
    );
    Ok(())
}
