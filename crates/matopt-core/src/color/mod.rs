//! Color space conversions for the calibration pipeline.
//!
//! Textures are decoded from gamma-encoded sRGB into linear CIE XYZ (D65),
//! calibrated on the luminance axis in xyY, then converted back for export.


/// D65 standard illuminant white point, used as the chromaticity fallback
/// for black pixels.
pub const D65_WHITE: [f32; 3] = [0.95047, 1.00000, 1.08883];

/// sRGB to XYZ matrix (D65)
pub(crate) const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.119_192, 0.9503041],
];

/// XYZ to sRGB matrix (D65)
pub(crate) const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.969_266, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// Decode one gamma-encoded sRGB component to linear.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear component back to gamma-encoded sRGB.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert a gamma-encoded sRGB triplet to XYZ (D65).
#[inline]
pub fn srgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);
    let m = &SRGB_TO_XYZ;
    [
        m[0][0] * r + m[0][1] * g + m[0][2] * b,
        m[1][0] * r + m[1][1] * g + m[1][2] * b,
        m[2][0] * r + m[2][1] * g + m[2][2] * b,
    ]
}

/// Convert XYZ (D65) back to a gamma-encoded sRGB triplet. Out-of-gamut
/// values are clamped to [0, 1].
#[inline]
pub fn xyz_to_srgb(xyz: [f32; 3]) -> [f32; 3] {
    let m = &XYZ_TO_SRGB;
    let r = m[0][0] * xyz[0] + m[0][1] * xyz[1] + m[0][2] * xyz[2];
    let g = m[1][0] * xyz[0] + m[1][1] * xyz[1] + m[1][2] * xyz[2];
    let b = m[2][0] * xyz[0] + m[2][1] * xyz[1] + m[2][2] * xyz[2];
    [
        linear_to_srgb(r.clamp(0.0, 1.0)),
        linear_to_srgb(g.clamp(0.0, 1.0)),
        linear_to_srgb(b.clamp(0.0, 1.0)),
    ]
}

/// Convert XYZ to the xyY chromaticity/luminance representation.
///
/// A pixel with zero (or negative) total stimulus has no defined
/// chromaticity; it maps to D65 white at zero luminance so the inverse
/// still lands on black.
#[inline]
pub fn xyz_to_xyy(xyz: [f32; 3]) -> [f32; 3] {
    let sum = xyz[0] + xyz[1] + xyz[2];
    if sum <= 0.0 {
        let white_sum = D65_WHITE[0] + D65_WHITE[1] + D65_WHITE[2];
        return [D65_WHITE[0] / white_sum, D65_WHITE[1] / white_sum, 0.0];
    }
    [xyz[0] / sum, xyz[1] / sum, xyz[1]]
}

/// Convert xyY back to XYZ. Exact inverse of [`xyz_to_xyy`] for Y > 0.
#[inline]
pub fn xyy_to_xyz(xyy: [f32; 3]) -> [f32; 3] {
    let [x, y, big_y] = xyy;
    if y <= 0.0 || big_y <= 0.0 {
        return [0.0, 0.0, 0.0];
    }
    let scale = big_y / y;
    [x * scale, big_y, (1.0 - x - y) * scale]
}
