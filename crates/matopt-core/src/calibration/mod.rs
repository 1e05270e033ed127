//! Calibrated-texture builder.
//!
//! Rewrites every pixel's luminance through a camera calibration curve
//! (XYZ -> xyY, calibrate Y, back to XYZ, alpha untouched), tracks the
//! min/max/average colors seen, and emits the calibrated image plus
//! solid-color swatches and an XML manifest describing the pack.

mod curve;
mod manifest;


pub use curve::CurveCalibration;

use std::path::Path;

use rayon::prelude::*;

use crate::bitmap::{ShotInfo, XyzBitmap};
pub use crate::bitmap::TargetFormat;
use crate::color::{xyy_to_xyz, xyz_to_xyy};
use crate::error::CalibrationError;
use crate::verbose_println;

/// Below this pixel count the per-pixel pass runs sequentially; the
/// rayon overhead only pays off on real textures.
pub(crate) const PARALLEL_THRESHOLD: usize = 30_000;

/// A camera calibration source: prepared once for a shot's exposure
/// triple, then applied per luminance value. `Sync` so the per-pixel
/// pass can share it across rayon workers.
pub trait CameraCalibration: Send + Sync {
    /// Select the calibration data appropriate for the given shot.
    fn prepare(&mut self, shot: ShotInfo) -> Result<(), CalibrationError>;

    /// Map a raw luminance to its calibrated value.
    fn calibrate(&self, luminance: f32) -> f32;
}

/// Everything the build needs besides the source image and the
/// calibration data.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParams {
    /// Name of the source image, recorded in the manifest.
    pub source_image_name: String,
    pub shot: ShotInfo,

    /// Crop the source before calibrating. Not implemented; requesting
    /// it is a hard error rather than a silent full-image pass.
    pub crop_source: bool,
    pub crop_rectangle_center: [f32; 2],
    pub crop_rectangle_half_size: [f32; 2],
    pub crop_rectangle_rotation: f32,

    pub swatch_width: u32,
    pub swatch_height: u32,
    pub custom_swatches_count: usize,
    /// UV sampling locations for the custom swatches; must cover
    /// `custom_swatches_count`.
    pub custom_sampling_locations: Vec<[f32; 2]>,

    pub target_format: TargetFormat,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            source_image_name: String::new(),
            shot: ShotInfo {
                iso: 100.0,
                shutter_speed: 1.0 / 100.0,
                aperture: 8.0,
            },
            crop_source: false,
            crop_rectangle_center: [0.5, 0.5],
            crop_rectangle_half_size: [0.5, 0.5],
            crop_rectangle_rotation: 0.0,
            swatch_width: 48,
            swatch_height: 32,
            custom_swatches_count: 0,
            custom_sampling_locations: Vec::new(),
            target_format: TargetFormat::Png8,
        }
    }
}

/// A solid-color swatch derived from the calibrated image.
#[derive(Debug, Clone, PartialEq)]
pub struct Swatch {
    /// Calibrated color in xyY.
    pub xyy: [f32; 3],
    pub texture: XyzBitmap,
}

/// A swatch sampled at an explicit UV location instead of derived from
/// the image statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSwatch {
    pub swatch: Swatch,
    /// UV sampling location in the source image.
    pub location: [f32; 2],
}

/// The finished calibrated texture with its swatches, ready to save.
#[derive(Debug, Clone)]
pub struct CalibratedTexture {
    params: CalibrationParams,
    texture: XyzBitmap,
    swatch_min: Swatch,
    swatch_max: Swatch,
    swatch_avg: Swatch,
    custom_swatches: Vec<CustomSwatch>,
}

/// Running min/max/sum accumulator for the pixel pass. Min and max are
/// compared strictly on the Y component.
#[derive(Debug, Clone, Copy)]
struct Stats {
    min: [f32; 3],
    max: [f32; 3],
    sum: [f32; 3],
}

impl Stats {
    fn new() -> Self {
        Self {
            min: [0.0, 0.0, f32::MAX],
            max: [0.0, 0.0, -f32::MAX],
            sum: [0.0, 0.0, 0.0],
        }
    }

    fn accumulate(&mut self, xyy: [f32; 3]) {
        if xyy[2] < self.min[2] {
            self.min = xyy;
        }
        if xyy[2] > self.max[2] {
            self.max = xyy;
        }
        self.sum[0] += xyy[0];
        self.sum[1] += xyy[1];
        self.sum[2] += xyy[2];
    }

    fn merge(a: Self, b: Self) -> Self {
        Self {
            min: if b.min[2] < a.min[2] { b.min } else { a.min },
            max: if b.max[2] > a.max[2] { b.max } else { a.max },
            sum: [
                a.sum[0] + b.sum[0],
                a.sum[1] + b.sum[1],
                a.sum[2] + b.sum[2],
            ],
        }
    }
}

/// Calibrate one XYZ+alpha pixel, returning the written pixel and the
/// calibrated xyY fed into the statistics.
#[inline]
fn calibrate_pixel(
    database: &dyn CameraCalibration,
    pixel: [f32; 4],
) -> ([f32; 4], [f32; 3]) {
    let mut xyy = xyz_to_xyy([pixel[0], pixel[1], pixel[2]]);
    xyy[2] = database.calibrate(xyy[2]);
    let xyz = xyy_to_xyz(xyy);
    ([xyz[0], xyz[1], xyz[2], pixel[3]], xyy)
}

impl CalibratedTexture {
    /// Build the calibrated texture and its swatches. Any failure aborts
    /// the whole build; no partial result is observable.
    pub fn build(
        source: &XyzBitmap,
        database: &mut dyn CameraCalibration,
        params: CalibrationParams,
    ) -> Result<Self, CalibrationError> {
        if source.width == 0 || source.height == 0 || source.data.is_empty() {
            return Err(CalibrationError::InvalidArgument(
                "source bitmap is empty".into(),
            ));
        }
        if params.crop_source {
            return Err(CalibrationError::CropUnsupported);
        }

        database.prepare(params.shot)?;

        verbose_println!(
            "Calibrating {}x{} image (ISO {}, shutter {}s, aperture f/{})",
            source.width,
            source.height,
            params.shot.iso,
            params.shot.shutter_speed,
            params.shot.aperture
        );

        let mut texture = XyzBitmap::new(source.width, source.height);
        texture.shot = Some(params.shot);
        let pixel_count = source.data.len();
        let db: &dyn CameraCalibration = database;

        let stats = if pixel_count >= PARALLEL_THRESHOLD {
            source
                .data
                .par_iter()
                .zip(texture.data.par_iter_mut())
                .fold(Stats::new, |mut stats, (src, dst)| {
                    let (out, xyy) = calibrate_pixel(db, *src);
                    *dst = out;
                    stats.accumulate(xyy);
                    stats
                })
                .reduce(Stats::new, Stats::merge)
        } else {
            let mut stats = Stats::new();
            for (src, dst) in source.data.iter().zip(texture.data.iter_mut()) {
                let (out, xyy) = calibrate_pixel(db, *src);
                *dst = out;
                stats.accumulate(xyy);
            }
            stats
        };

        // Single divide after all contributions are in.
        let normalizer = 1.0 / pixel_count as f32;
        let avg = [
            stats.sum[0] * normalizer,
            stats.sum[1] * normalizer,
            stats.sum[2] * normalizer,
        ];

        if params.swatch_width == 0 || params.swatch_height == 0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "invalid swatch size {}x{}",
                params.swatch_width, params.swatch_height
            )));
        }

        let swatch = |xyy: [f32; 3]| Swatch {
            xyy,
            texture: build_swatch(params.swatch_width, params.swatch_height, xyy),
        };
        let swatch_min = swatch(stats.min);
        let swatch_max = swatch(stats.max);
        let swatch_avg = swatch(avg);

        if params.custom_sampling_locations.len() < params.custom_swatches_count {
            return Err(CalibrationError::NotEnoughSampleLocations {
                count: params.custom_swatches_count,
                provided: params.custom_sampling_locations.len(),
            });
        }
        let mut custom_swatches = Vec::with_capacity(params.custom_swatches_count);
        for &location in &params.custom_sampling_locations[..params.custom_swatches_count] {
            // Sample the source, then calibrate the sample independently.
            let sample = source.bilinear_sample(location[0], location[1]);
            let mut xyy = xyz_to_xyy([sample[0], sample[1], sample[2]]);
            xyy[2] = db.calibrate(xyy[2]);
            custom_swatches.push(CustomSwatch {
                swatch: swatch(xyy),
                location,
            });
        }

        Ok(Self {
            params,
            texture,
            swatch_min,
            swatch_max,
            swatch_avg,
            custom_swatches,
        })
    }

    pub fn texture(&self) -> &XyzBitmap {
        &self.texture
    }

    pub fn shot_info(&self) -> ShotInfo {
        self.params.shot
    }

    pub fn swatch_min(&self) -> &Swatch {
        &self.swatch_min
    }

    pub fn swatch_max(&self) -> &Swatch {
        &self.swatch_max
    }

    pub fn swatch_avg(&self) -> &Swatch {
        &self.swatch_avg
    }

    pub fn custom_swatches(&self) -> &[CustomSwatch] {
        &self.custom_swatches
    }

    /// Save the whole pack next to `path`: the calibrated image, one file
    /// per swatch (`_Min`/`_Max`/`_Avg`/`_Custom<i>` suffixes) and the
    /// `.xml` manifest.
    pub fn save_pack(&self, path: &Path) -> Result<(), CalibrationError> {
        let format = self.params.target_format;
        let ext = format.extension();
        let base = path.with_extension("");

        let named = |suffix: &str| {
            let mut name = base
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            name.push_str(suffix);
            base.with_file_name(name).with_extension(ext)
        };

        let texture_path = named("");
        self.texture.save(&texture_path, format)?;

        let min_path = named("_Min");
        let max_path = named("_Max");
        let avg_path = named("_Avg");
        self.swatch_min.texture.save(&min_path, format)?;
        self.swatch_max.texture.save(&max_path, format)?;
        self.swatch_avg.texture.save(&avg_path, format)?;

        let mut custom_paths = Vec::with_capacity(self.custom_swatches.len());
        for (index, custom) in self.custom_swatches.iter().enumerate() {
            let custom_path = named(&format!("_Custom{}", index));
            custom.swatch.texture.save(&custom_path, format)?;
            custom_paths.push(custom_path);
        }

        let manifest_path = base.with_extension("xml");
        manifest::write(
            &manifest_path,
            self,
            &texture_path,
            &min_path,
            &max_path,
            &avg_path,
            &custom_paths,
        )?;

        verbose_println!("Saved calibrated pack to {}", manifest_path.display());
        Ok(())
    }
}

fn build_swatch(width: u32, height: u32, xyy: [f32; 3]) -> XyzBitmap {
    let xyz = xyy_to_xyz(xyy);
    let mut swatch = XyzBitmap::new(width, height);
    swatch.data.fill([xyz[0], xyz[1], xyz[2], 1.0]);
    swatch
}
