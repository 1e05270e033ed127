use tempfile::tempdir;

use super::{TargetFormat, XyzBitmap};
use crate::color::srgb_to_xyz;
use crate::error::CalibrationError;

fn checker(width: u32, height: u32) -> XyzBitmap {
    let mut bitmap = XyzBitmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let rgb = if (x + y) % 2 == 0 {
                [0.8, 0.4, 0.2]
            } else {
                [0.1, 0.5, 0.9]
            };
            let xyz = srgb_to_xyz(rgb);
            bitmap.set_pixel(x, y, [xyz[0], xyz[1], xyz[2], 1.0]);
        }
    }
    bitmap
}

fn assert_pixels_close(a: &XyzBitmap, b: &XyzBitmap, tolerance: f32) {
    assert_eq!((a.width, a.height), (b.width, b.height));
    for (pa, pb) in a.data.iter().zip(&b.data) {
        for i in 0..4 {
            assert!(
                (pa[i] - pb[i]).abs() < tolerance,
                "pixel mismatch: {:?} vs {:?}",
                pa,
                pb
            );
        }
    }
}

#[test]
fn bilinear_sample_hits_corners_exactly() {
    let mut bitmap = XyzBitmap::new(2, 2);
    bitmap.set_pixel(0, 0, [1.0, 0.0, 0.0, 1.0]);
    bitmap.set_pixel(1, 0, [0.0, 1.0, 0.0, 1.0]);
    bitmap.set_pixel(0, 1, [0.0, 0.0, 1.0, 1.0]);
    bitmap.set_pixel(1, 1, [1.0, 1.0, 1.0, 0.5]);

    assert_eq!(bitmap.bilinear_sample(0.0, 0.0), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(bitmap.bilinear_sample(1.0, 1.0), [1.0, 1.0, 1.0, 0.5]);

    // Center blends all four corners equally.
    let center = bitmap.bilinear_sample(0.5, 0.5);
    assert!((center[0] - 0.5).abs() < 1e-6);
    assert!((center[1] - 0.5).abs() < 1e-6);
    assert!((center[2] - 0.5).abs() < 1e-6);
    assert!((center[3] - 0.875).abs() < 1e-6);
}

#[test]
fn bilinear_sample_clamps_out_of_range_coordinates() {
    let mut bitmap = XyzBitmap::new(2, 1);
    bitmap.set_pixel(1, 0, [0.3, 0.3, 0.3, 1.0]);
    assert_eq!(bitmap.bilinear_sample(5.0, -1.0), [0.3, 0.3, 0.3, 1.0]);
}

#[test]
fn png8_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("img.png");
    let bitmap = checker(4, 3);

    bitmap.save(&path, TargetFormat::Png8).unwrap();
    let loaded = XyzBitmap::load(&path).unwrap();

    // 8-bit quantization in gamma space; stay loose.
    assert_pixels_close(&bitmap, &loaded, 1e-2);
}

#[test]
fn png16_round_trip_preserves_alpha() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("img.png");
    let mut bitmap = checker(3, 3);
    bitmap.set_pixel(1, 1, [0.2, 0.25, 0.2, 0.375]);

    bitmap.save(&path, TargetFormat::Png16).unwrap();
    let loaded = XyzBitmap::load(&path).unwrap();

    assert_pixels_close(&bitmap, &loaded, 1e-4);
    assert!((loaded.pixel(1, 1)[3] - 0.375).abs() < 1e-4);
}

#[test]
fn tiff16_round_trip_drops_alpha() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("img.tif");
    let mut bitmap = checker(4, 2);
    bitmap.set_pixel(0, 0, [0.1, 0.12, 0.1, 0.25]);

    bitmap.save(&path, TargetFormat::Tiff16).unwrap();
    let loaded = XyzBitmap::load(&path).unwrap();

    assert_eq!((loaded.width, loaded.height), (4, 2));
    // Alpha is not part of the container; it reloads opaque.
    assert!((loaded.pixel(0, 0)[3] - 1.0).abs() < 1e-6);
    for i in 0..3 {
        assert!((loaded.pixel(0, 0)[i] - bitmap.pixel(0, 0)[i]).abs() < 1e-4);
    }
}

#[test]
fn unknown_extension_is_rejected() {
    let err = XyzBitmap::load("swatch.bmp".as_ref()).unwrap_err();
    assert!(matches!(err, CalibrationError::ImageLoad { .. }));
}

#[test]
fn target_format_extensions() {
    assert_eq!(TargetFormat::Png8.extension(), "png");
    assert_eq!(TargetFormat::Png16.extension(), "png");
    assert_eq!(TargetFormat::Tiff16.extension(), "tif");
}
