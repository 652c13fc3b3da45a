use image::ColorType;
use serde::{Serialize, Serializer};
use std::fmt;

/// Pixel layout of an image as stored in the file, before any decoder
/// expands palettes or converts colour spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    Bilevel,
    L,
    Palette,
    Rgb,
    Rgba,
    Cmyk,
    YCbCr,
    Lab,
    Hsv,
    I,
    F,
    La,
    Pa,
    I16,
    Rgbx,
}

impl PixelMode {
    pub fn name(self) -> &'static str {
        match self {
            PixelMode::Bilevel => "1",
            PixelMode::L => "L",
            PixelMode::Palette => "P",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
            PixelMode::Cmyk => "CMYK",
            PixelMode::YCbCr => "YCbCr",
            PixelMode::Lab => "LAB",
            PixelMode::Hsv => "HSV",
            PixelMode::I => "I",
            PixelMode::F => "F",
            PixelMode::La => "LA",
            PixelMode::Pa => "PA",
            PixelMode::I16 => "I;16",
            PixelMode::Rgbx => "RGBX",
        }
    }

    /// Bits per pixel, only for the modes of the classic lookup table.
    /// Any other mode has no defined depth.
    pub fn bits_per_pixel(self) -> Option<u16> {
        match self {
            PixelMode::Bilevel => Some(1),
            PixelMode::L | PixelMode::Palette => Some(8),
            PixelMode::Rgb | PixelMode::YCbCr | PixelMode::Lab | PixelMode::Hsv => Some(24),
            PixelMode::Rgba | PixelMode::Cmyk | PixelMode::I | PixelMode::F => Some(32),
            PixelMode::La | PixelMode::Pa | PixelMode::I16 | PixelMode::Rgbx => None,
        }
    }

    /// Best guess from a decoder's colour type. Decoders expand palettes and
    /// drop CMYK, so format readers should be preferred when they know better.
    pub fn from_color_type(color_type: ColorType) -> Option<PixelMode> {
        match color_type {
            ColorType::L8 => Some(PixelMode::L),
            ColorType::La8 | ColorType::La16 => Some(PixelMode::La),
            ColorType::Rgb8 | ColorType::Rgb16 => Some(PixelMode::Rgb),
            ColorType::Rgba8 | ColorType::Rgba16 => Some(PixelMode::Rgba),
            ColorType::L16 => Some(PixelMode::I16),
            ColorType::Rgb32F | ColorType::Rgba32F => Some(PixelMode::F),
            _ => None,
        }
    }
}

impl fmt::Display for PixelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//JSON output uses the same mode names as the tree
impl Serialize for PixelMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_matches_classic_modes() {
        let table = [
            ("1", 1),
            ("L", 8),
            ("P", 8),
            ("RGB", 24),
            ("RGBA", 32),
            ("CMYK", 32),
            ("YCbCr", 24),
            ("LAB", 24),
            ("HSV", 24),
            ("I", 32),
            ("F", 32),
        ];

        let modes = [
            PixelMode::Bilevel,
            PixelMode::L,
            PixelMode::Palette,
            PixelMode::Rgb,
            PixelMode::Rgba,
            PixelMode::Cmyk,
            PixelMode::YCbCr,
            PixelMode::Lab,
            PixelMode::Hsv,
            PixelMode::I,
            PixelMode::F,
        ];

        for (mode, (name, bits)) in modes.iter().zip(table) {
            assert_eq!(mode.name(), name);
            assert_eq!(mode.bits_per_pixel(), Some(bits));
        }
    }

    #[test]
    fn modes_outside_table_have_no_depth() {
        assert_eq!(PixelMode::La.bits_per_pixel(), None);
        assert_eq!(PixelMode::I16.bits_per_pixel(), None);
        assert_eq!(PixelMode::Pa.bits_per_pixel(), None);
    }

    #[test]
    fn serializes_as_mode_name() {
        assert_eq!(serde_json::to_string(&PixelMode::Palette).unwrap(), "\"P\"");
        assert_eq!(serde_json::to_string(&Some(PixelMode::Bilevel)).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&PixelMode::I16).unwrap(), "\"I;16\"");
        assert_eq!(serde_json::to_string(&None::<PixelMode>).unwrap(), "null");
    }

    #[test]
    fn color_type_fallback() {
        assert_eq!(PixelMode::from_color_type(ColorType::Rgb8), Some(PixelMode::Rgb));
        assert_eq!(PixelMode::from_color_type(ColorType::L16), Some(PixelMode::I16));
        assert_eq!(PixelMode::from_color_type(ColorType::Rgba16), Some(PixelMode::Rgba));
    }
}
