//! Float XYZ bitmaps plus the PNG/TIFF load and save paths.
//!
//! Images enter the calibration pipeline as device-independent CIE XYZ
//! with a straight-through alpha channel, and leave it re-encoded as
//! gamma sRGB in the requested container.

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::color::{srgb_to_xyz, xyz_to_srgb};
use crate::error::CalibrationError;

/// Camera exposure parameters the shot was taken with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotInfo {
    pub iso: f32,
    /// Exposure time in seconds.
    pub shutter_speed: f32,
    /// Aperture as an f-number.
    pub aperture: f32,
}

/// Output container for calibrated images and swatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFormat {
    /// 8-bit RGBA PNG.
    #[default]
    Png8,
    /// 16-bit RGBA PNG.
    Png16,
    /// 16-bit RGB TIFF (alpha dropped, most TIFF viewers choke on it).
    Tiff16,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png8 | Self::Png16 => "png",
            Self::Tiff16 => "tif",
        }
    }
}

/// An image in CIE XYZ (D65) with alpha, one `[X, Y, Z, A]` per pixel,
/// row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct XyzBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<[f32; 4]>,
    /// Exposure metadata, when known (calibration attaches it to its output).
    pub shot: Option<ShotInfo>,
}

impl XyzBitmap {
    /// All-black, fully opaque bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize],
            shot: None,
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [f32; 4]) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Bilinearly sample at normalized coordinates (0..1 maps to the
    /// full image). Coordinates are clamped to the edges.
    pub fn bilinear_sample(&self, u: f32, v: f32) -> [f32; 4] {
        let fx = (u.clamp(0.0, 1.0) * (self.width - 1) as f32).max(0.0);
        let fy = (v.clamp(0.0, 1.0) * (self.height - 1) as f32).max(0.0);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let mut out = [0.0f32; 4];
        for i in 0..4 {
            let top = p00[i] + (p10[i] - p00[i]) * tx;
            let bottom = p01[i] + (p11[i] - p01[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }

    /// Load a PNG or TIFF file, decoding gamma sRGB into XYZ. Missing
    /// alpha comes in as fully opaque.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => load_png(path),
            "tif" | "tiff" => load_tiff(path),
            _ => Err(load_error(
                path,
                format!("unsupported image extension \"{}\"", ext),
            )),
        }
    }

    /// Save in the requested container, encoding XYZ back to gamma sRGB.
    pub fn save(&self, path: &Path, format: TargetFormat) -> Result<(), CalibrationError> {
        match format {
            TargetFormat::Png8 => save_png(self, path, png::BitDepth::Eight),
            TargetFormat::Png16 => save_png(self, path, png::BitDepth::Sixteen),
            TargetFormat::Tiff16 => save_tiff16(self, path),
        }
    }
}

fn load_error(path: &Path, detail: impl Into<String>) -> CalibrationError {
    CalibrationError::ImageLoad {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

fn save_error(path: &Path, detail: impl Into<String>) -> CalibrationError {
    CalibrationError::ImageSave {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

fn load_png(path: &Path) -> Result<XyzBitmap, CalibrationError> {
    let file = File::open(path).map_err(|e| load_error(path, e.to_string()))?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .map_err(|e| load_error(path, e.to_string()))?;

    let info = reader.info();
    let width = info.width;
    let height = info.height;
    let color_type = info.color_type;
    let bit_depth = info.bit_depth;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|e| load_error(path, e.to_string()))?;
    let bytes = &buf[..frame_info.buffer_size()];

    let mut bitmap = XyzBitmap::new(width, height);
    match (color_type, bit_depth) {
        (png::ColorType::Rgb, png::BitDepth::Eight) => {
            fill_rgb8(&mut bitmap, bytes, 3);
        }
        (png::ColorType::Rgba, png::BitDepth::Eight) => {
            fill_rgb8(&mut bitmap, bytes, 4);
        }
        (png::ColorType::Rgb, png::BitDepth::Sixteen) => {
            fill_rgb16(&mut bitmap, bytes, 3);
        }
        (png::ColorType::Rgba, png::BitDepth::Sixteen) => {
            fill_rgb16(&mut bitmap, bytes, 4);
        }
        (png::ColorType::Grayscale, png::BitDepth::Eight) => {
            fill_gray8(&mut bitmap, bytes);
        }
        _ => {
            return Err(load_error(
                path,
                format!(
                    "unsupported PNG format: {:?} at bit depth {:?}",
                    color_type, bit_depth
                ),
            ))
        }
    }
    Ok(bitmap)
}

fn fill_rgb8(bitmap: &mut XyzBitmap, bytes: &[u8], channels: usize) {
    for (pixel, chunk) in bitmap.data.iter_mut().zip(bytes.chunks_exact(channels)) {
        let rgb = [
            chunk[0] as f32 / 255.0,
            chunk[1] as f32 / 255.0,
            chunk[2] as f32 / 255.0,
        ];
        let xyz = srgb_to_xyz(rgb);
        let alpha = if channels == 4 {
            chunk[3] as f32 / 255.0
        } else {
            1.0
        };
        *pixel = [xyz[0], xyz[1], xyz[2], alpha];
    }
}

fn fill_rgb16(bitmap: &mut XyzBitmap, bytes: &[u8], channels: usize) {
    // PNG 16-bit samples are big-endian.
    for (pixel, chunk) in bitmap
        .data
        .iter_mut()
        .zip(bytes.chunks_exact(channels * 2))
    {
        let sample =
            |i: usize| u16::from_be_bytes([chunk[i * 2], chunk[i * 2 + 1]]) as f32 / 65535.0;
        let xyz = srgb_to_xyz([sample(0), sample(1), sample(2)]);
        let alpha = if channels == 4 { sample(3) } else { 1.0 };
        *pixel = [xyz[0], xyz[1], xyz[2], alpha];
    }
}

fn fill_gray8(bitmap: &mut XyzBitmap, bytes: &[u8]) {
    for (pixel, &gray) in bitmap.data.iter_mut().zip(bytes.iter()) {
        let v = gray as f32 / 255.0;
        let xyz = srgb_to_xyz([v, v, v]);
        *pixel = [xyz[0], xyz[1], xyz[2], 1.0];
    }
}

fn load_tiff(path: &Path) -> Result<XyzBitmap, CalibrationError> {
    let file = File::open(path).map_err(|e| load_error(path, e.to_string()))?;
    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file))
        .map_err(|e| load_error(path, e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| load_error(path, e.to_string()))?;
    let color_type = decoder
        .colortype()
        .map_err(|e| load_error(path, e.to_string()))?;
    let channels = match color_type {
        tiff::ColorType::Gray(_) => 1,
        tiff::ColorType::RGB(_) => 3,
        tiff::ColorType::RGBA(_) => 4,
        other => {
            return Err(load_error(
                path,
                format!("unsupported TIFF color type: {:?}", other),
            ))
        }
    };

    let image = decoder
        .read_image()
        .map_err(|e| load_error(path, e.to_string()))?;

    let mut bitmap = XyzBitmap::new(width, height);
    match image {
        tiff::decoder::DecodingResult::U8(buf) => {
            fill_samples(&mut bitmap, &buf, channels, |v| v as f32 / 255.0);
        }
        tiff::decoder::DecodingResult::U16(buf) => {
            fill_samples(&mut bitmap, &buf, channels, |v| v as f32 / 65535.0);
        }
        other => {
            return Err(load_error(
                path,
                format!("unsupported TIFF sample format: {:?}", sample_name(&other)),
            ))
        }
    }
    Ok(bitmap)
}

fn sample_name(result: &tiff::decoder::DecodingResult) -> &'static str {
    match result {
        tiff::decoder::DecodingResult::U8(_) => "u8",
        tiff::decoder::DecodingResult::U16(_) => "u16",
        tiff::decoder::DecodingResult::U32(_) => "u32",
        tiff::decoder::DecodingResult::U64(_) => "u64",
        tiff::decoder::DecodingResult::F32(_) => "f32",
        tiff::decoder::DecodingResult::F64(_) => "f64",
        _ => "signed integer",
    }
}

fn fill_samples<T: Copy>(
    bitmap: &mut XyzBitmap,
    samples: &[T],
    channels: usize,
    to_f32: impl Fn(T) -> f32,
) {
    for (pixel, chunk) in bitmap.data.iter_mut().zip(samples.chunks_exact(channels)) {
        let (rgb, alpha) = match channels {
            1 => {
                let v = to_f32(chunk[0]);
                ([v, v, v], 1.0)
            }
            3 => ([to_f32(chunk[0]), to_f32(chunk[1]), to_f32(chunk[2])], 1.0),
            _ => (
                [to_f32(chunk[0]), to_f32(chunk[1]), to_f32(chunk[2])],
                to_f32(chunk[3]),
            ),
        };
        let xyz = srgb_to_xyz(rgb);
        *pixel = [xyz[0], xyz[1], xyz[2], alpha];
    }
}

fn save_png(
    bitmap: &XyzBitmap,
    path: &Path,
    depth: png::BitDepth,
) -> Result<(), CalibrationError> {
    let file = File::create(path).map_err(|e| save_error(path, e.to_string()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), bitmap.width, bitmap.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(depth);
    let mut writer = encoder
        .write_header()
        .map_err(|e| save_error(path, e.to_string()))?;

    let mut bytes = Vec::with_capacity(
        bitmap.data.len() * 4 * if depth == png::BitDepth::Sixteen { 2 } else { 1 },
    );
    for pixel in &bitmap.data {
        let rgb = xyz_to_srgb([pixel[0], pixel[1], pixel[2]]);
        let rgba = [rgb[0], rgb[1], rgb[2], pixel[3].clamp(0.0, 1.0)];
        match depth {
            png::BitDepth::Sixteen => {
                for v in rgba {
                    let q = (v * 65535.0).round() as u16;
                    bytes.extend_from_slice(&q.to_be_bytes());
                }
            }
            _ => {
                for v in rgba {
                    bytes.push((v * 255.0).round() as u8);
                }
            }
        }
    }

    writer
        .write_image_data(&bytes)
        .map_err(|e| save_error(path, e.to_string()))
}

fn save_tiff16(bitmap: &XyzBitmap, path: &Path) -> Result<(), CalibrationError> {
    let file = File::create(path).map_err(|e| save_error(path, e.to_string()))?;
    let writer = BufWriter::new(file);
    let mut encoder = tiff::encoder::TiffEncoder::new(writer)
        .map_err(|e| save_error(path, e.to_string()))?;

    let mut u16_data = Vec::with_capacity(bitmap.data.len() * 3);
    for pixel in &bitmap.data {
        let rgb = xyz_to_srgb([pixel[0], pixel[1], pixel[2]]);
        for v in rgb {
            u16_data.push((v * 65535.0).round() as u16);
        }
    }

    encoder
        .write_image::<tiff::encoder::colortype::RGB16>(bitmap.width, bitmap.height, &u16_data)
        .map_err(|e| save_error(path, e.to_string()))
}
