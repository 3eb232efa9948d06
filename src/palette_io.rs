//! Palette and image interchange
//!
//! Two external palette formats are supported: the GIMP flat color list
//! (`.gpl`, text) and the Adobe swatch exchange (`.aco` version 1, binary,
//! big-endian). Bitmap import decodes any format the `image` crate handles
//! into a [`PixelBuffer`] at the image's native dimensions.

use crate::buffer::PixelBuffer;
use thiserror::Error;

/// Error importing a palette or bitmap.
#[derive(Debug, Error)]
pub enum PaletteIoError {
    /// GPL file doesn't start with the `GIMP Palette` magic line
    #[error("missing 'GIMP Palette' header")]
    MissingGplHeader,
    /// GPL color row couldn't be parsed
    #[error("invalid color row: '{0}'")]
    InvalidColorRow(String),
    /// ACO payload ended early
    #[error("truncated ACO data at byte {0}")]
    TruncatedAco(usize),
    /// ACO version other than 1
    #[error("unsupported ACO version {0}")]
    UnsupportedAcoVersion(u16),
    /// Bitmap decode failure
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
}

/// A palette parsed from an external file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPalette {
    pub name: String,
    pub colors: Vec<[u8; 3]>,
}

/// Parse a GIMP `.gpl` palette.
///
/// Expected shape: a `GIMP Palette` magic line, optional `Name:`/`Columns:`
/// headers, `#` comment lines, then `R G B [name]` rows. Row names are
/// ignored; malformed rows are an error.
pub fn parse_gpl(text: &str) -> Result<ImportedPalette, PaletteIoError> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim() == "GIMP Palette" => {}
        _ => return Err(PaletteIoError::MissingGplHeader),
    }

    let mut name = String::from("Imported");
    let mut colors = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(palette_name) = line.strip_prefix("Name:") {
            name = palette_name.trim().to_string();
            continue;
        }
        if line.starts_with("Columns:") {
            continue;
        }

        let mut parts = line.split_whitespace();
        let rgb: Option<[u8; 3]> = (|| {
            let r = parts.next()?.parse().ok()?;
            let g = parts.next()?.parse().ok()?;
            let b = parts.next()?.parse().ok()?;
            Some([r, g, b])
        })();
        match rgb {
            Some(rgb) => colors.push(rgb),
            None => return Err(PaletteIoError::InvalidColorRow(line.to_string())),
        }
    }

    Ok(ImportedPalette { name, colors })
}

/// Serialize a palette as a GIMP `.gpl` file.
pub fn write_gpl(name: &str, colors: &[[u8; 3]]) -> String {
    let mut out = String::new();
    out.push_str("GIMP Palette\n");
    out.push_str(&format!("Name: {}\n", name));
    out.push_str("#\n");
    for rgb in colors {
        out.push_str(&format!("{:3} {:3} {:3}\tUntitled\n", rgb[0], rgb[1], rgb[2]));
    }
    out
}

fn read_u16_be(bytes: &[u8], offset: usize) -> Result<u16, PaletteIoError> {
    let slice = bytes.get(offset..offset + 2).ok_or(PaletteIoError::TruncatedAco(offset))?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

/// Parse an Adobe `.aco` swatch file (version 1 block).
///
/// Each entry is a big-endian colorspace id plus four 16-bit components;
/// RGB components are the 8-bit value scaled by 257. Non-RGB entries are
/// skipped.
pub fn parse_aco(bytes: &[u8]) -> Result<Vec<[u8; 3]>, PaletteIoError> {
    let version = read_u16_be(bytes, 0)?;
    if version != 1 {
        return Err(PaletteIoError::UnsupportedAcoVersion(version));
    }
    let count = read_u16_be(bytes, 2)? as usize;

    let mut colors = Vec::with_capacity(count);
    let mut offset = 4;
    for _ in 0..count {
        let colorspace = read_u16_be(bytes, offset)?;
        let c0 = read_u16_be(bytes, offset + 2)?;
        let c1 = read_u16_be(bytes, offset + 4)?;
        let c2 = read_u16_be(bytes, offset + 6)?;
        let _c3 = read_u16_be(bytes, offset + 8)?;
        offset += 10;

        // 0 = RGB; other colorspaces (HSB, CMYK, Lab, grayscale) skipped
        if colorspace == 0 {
            colors.push([(c0 / 257) as u8, (c1 / 257) as u8, (c2 / 257) as u8]);
        }
    }
    Ok(colors)
}

/// Serialize a palette as an Adobe `.aco` version 1 block.
pub fn write_aco(colors: &[[u8; 3]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + colors.len() * 10);
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(colors.len() as u16).to_be_bytes());
    for rgb in colors {
        out.extend_from_slice(&0u16.to_be_bytes()); // RGB colorspace
        for &channel in rgb {
            out.extend_from_slice(&(channel as u16 * 257).to_be_bytes());
        }
        out.extend_from_slice(&0u16.to_be_bytes());
    }
    out
}

/// Decode a bitmap (PNG, GIF, BMP, ...) into a pixel buffer at its native
/// dimensions.
pub fn import_image(bytes: &[u8]) -> Result<PixelBuffer, PaletteIoError> {
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = decoded.dimensions();
    // Length is width*height*4 by construction
    Ok(PixelBuffer::from_raw(width, height, decoded.into_raw())
        .expect("decoded image has consistent dimensions"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpl_basic() {
        let text = "GIMP Palette\nName: Test Colors\nColumns: 4\n# a comment\n255   0   0\tred\n  0 255   0\tgreen\n";
        let palette = parse_gpl(text).unwrap();
        assert_eq!(palette.name, "Test Colors");
        assert_eq!(palette.colors, vec![[255, 0, 0], [0, 255, 0]]);
    }

    #[test]
    fn test_parse_gpl_missing_header() {
        assert!(matches!(parse_gpl("Name: nope\n255 0 0\n"), Err(PaletteIoError::MissingGplHeader)));
    }

    #[test]
    fn test_parse_gpl_bad_row() {
        let text = "GIMP Palette\n255 0\n";
        assert!(matches!(parse_gpl(text), Err(PaletteIoError::InvalidColorRow(_))));
    }

    #[test]
    fn test_gpl_round_trip() {
        let colors = vec![[255, 0, 0], [0, 128, 64], [12, 34, 56]];
        let text = write_gpl("Round Trip", &colors);
        let parsed = parse_gpl(&text).unwrap();
        assert_eq!(parsed.name, "Round Trip");
        assert_eq!(parsed.colors, colors);
    }

    #[test]
    fn test_aco_round_trip() {
        let colors = vec![[255, 0, 0], [0, 255, 128], [1, 2, 3]];
        let bytes = write_aco(&colors);
        assert_eq!(parse_aco(&bytes).unwrap(), colors);
    }

    #[test]
    fn test_aco_truncated() {
        let mut bytes = write_aco(&[[255, 0, 0]]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(parse_aco(&bytes), Err(PaletteIoError::TruncatedAco(_))));
    }

    #[test]
    fn test_aco_unsupported_version() {
        let bytes = [0u8, 2, 0, 0];
        assert!(matches!(parse_aco(&bytes), Err(PaletteIoError::UnsupportedAcoVersion(2))));
    }

    #[test]
    fn test_aco_skips_non_rgb_entries() {
        // One HSB entry (colorspace 1) followed by one RGB entry
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        for channel in [10u16 * 257, 20 * 257, 30 * 257, 0] {
            bytes.extend_from_slice(&channel.to_be_bytes());
        }

        assert_eq!(parse_aco(&bytes).unwrap(), vec![[10, 20, 30]]);
    }

    #[test]
    fn test_import_image_native_dimensions() {
        // Encode a small PNG in memory, then import it
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let buffer = import_image(png.get_ref()).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (3, 2));
        assert_eq!(buffer.get_pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(buffer.get_pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
