//! Piecewise-linear luminance calibration curves.

use std::path::Path;

use serde::Deserialize;

use crate::bitmap::ShotInfo;
use crate::calibration::CameraCalibration;
use crate::error::CalibrationError;

/// On-disk curve file:
///
/// ```yaml
/// points:
///   - [0.0, 0.0]
///   - [1.0, 0.5]
/// ```
#[derive(Debug, Deserialize)]
struct CurveFile {
    points: Vec<[f32; 2]>,
}

/// A luminance calibration backed by a piecewise-linear `[input, output]`
/// point list. Inputs outside the covered range extrapolate along the
/// nearest segment, so a proportional curve stays proportional for any Y.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveCalibration {
    points: Vec<[f32; 2]>,
}

impl CurveCalibration {
    /// Build from explicit points. At least two points, strictly
    /// increasing on the input axis.
    pub fn from_points(points: Vec<[f32; 2]>) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::InvalidArgument(format!(
                "calibration curve needs at least 2 points, got {}",
                points.len()
            )));
        }
        for pair in points.windows(2) {
            if pair[1][0] <= pair[0][0] {
                return Err(CalibrationError::InvalidArgument(format!(
                    "calibration curve inputs must be strictly increasing ({} then {})",
                    pair[0][0], pair[1][0]
                )));
            }
        }
        Ok(Self { points })
    }

    /// Load a curve from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, CalibrationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CalibrationError::InvalidArgument(format!(
                "cannot read calibration curve {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: CurveFile = serde_yaml::from_str(&text).map_err(|e| {
            CalibrationError::InvalidArgument(format!(
                "malformed calibration curve {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_points(file.points)
    }
}

impl CameraCalibration for CurveCalibration {
    fn prepare(&mut self, shot: ShotInfo) -> Result<(), CalibrationError> {
        if shot.iso <= 0.0 || shot.shutter_speed <= 0.0 || shot.aperture <= 0.0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "invalid shot parameters: ISO {}, shutter {}, aperture {}",
                shot.iso, shot.shutter_speed, shot.aperture
            )));
        }
        log::debug!(
            "prepared calibration curve ({} points) for ISO {}, shutter {}s, f/{}",
            self.points.len(),
            shot.iso,
            shot.shutter_speed,
            shot.aperture
        );
        Ok(())
    }

    fn calibrate(&self, luminance: f32) -> f32 {
        // Segment whose input range covers the luminance; first or last
        // segment when it falls outside the curve.
        let segment = self
            .points
            .windows(2)
            .find(|pair| luminance <= pair[1][0])
            .unwrap_or_else(|| &self.points[self.points.len() - 2..]);

        let [x0, y0] = segment[0];
        let [x1, y1] = segment[1];
        let t = (luminance - x0) / (x1 - x0);
        y0 + (y1 - y0) * t
    }
}
