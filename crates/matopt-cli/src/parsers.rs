//! Parsers for command-line argument strings.

use matopt_core::calibration::TargetFormat;

/// Parse a "u,v" sampling location with both components in [0, 1].
pub fn parse_uv(input: &str) -> Result<[f32; 2], String> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid sampling location '{}': expected U,V",
            input
        ));
    }
    let u: f32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid U coordinate '{}'", parts[0]))?;
    let v: f32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid V coordinate '{}'", parts[1]))?;
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return Err(format!(
            "Sampling location '{}' out of range: coordinates must be within [0, 1]",
            input
        ));
    }
    Ok([u, v])
}

/// Parse a "WxH" swatch size with both dimensions positive.
pub fn parse_swatch_size(input: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = input.split(['x', 'X']).map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("Invalid swatch size '{}': expected WxH", input));
    }
    let width: u32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid swatch width '{}'", parts[0]))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid swatch height '{}'", parts[1]))?;
    if width == 0 || height == 0 {
        return Err(format!("Swatch size '{}' must be positive", input));
    }
    Ok((width, height))
}

/// Parse an output format name.
pub fn parse_target_format(input: &str) -> Result<TargetFormat, String> {
    match input.to_lowercase().as_str() {
        "png8" | "png" => Ok(TargetFormat::Png8),
        "png16" => Ok(TargetFormat::Png16),
        "tiff" | "tiff16" | "tif" => Ok(TargetFormat::Tiff16),
        other => Err(format!(
            "Unknown format '{}': expected png8, png16 or tiff",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uv_pairs() {
        assert_eq!(parse_uv("0.25, 0.75").unwrap(), [0.25, 0.75]);
        assert!(parse_uv("0.25").is_err());
        assert!(parse_uv("1.5,0.0").is_err());
        assert!(parse_uv("a,b").is_err());
    }

    #[test]
    fn parses_swatch_sizes() {
        assert_eq!(parse_swatch_size("48x32").unwrap(), (48, 32));
        assert_eq!(parse_swatch_size("16X16").unwrap(), (16, 16));
        assert!(parse_swatch_size("48").is_err());
        assert!(parse_swatch_size("0x32").is_err());
    }

    #[test]
    fn parses_formats() {
        assert_eq!(parse_target_format("png8").unwrap(), TargetFormat::Png8);
        assert_eq!(parse_target_format("PNG16").unwrap(), TargetFormat::Png16);
        assert_eq!(parse_target_format("tiff").unwrap(), TargetFormat::Tiff16);
        assert!(parse_target_format("bmp").is_err());
    }
}
