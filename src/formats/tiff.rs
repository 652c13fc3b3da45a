use exif::{Context, Exif, In, Tag};

use super::{Dpi, FormatDetails};
use crate::{exif_tags, pixel_mode::PixelMode};

const EXTRA_SAMPLES: Tag = Tag(Context::Tiff, 0x0152);

/// A TIFF's first directory doubles as its EXIF directory, so everything is
/// read from the parsed fields.
pub fn read(exif: &Exif) -> FormatDetails {
    FormatDetails {
        mode: mode(exif),
        dimensions: uint(exif, Tag::ImageWidth).zip(uint(exif, Tag::ImageLength)),
        dpi: dpi(exif),
        entries: vec![],
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn mode(exif: &Exif) -> Option<PixelMode> {
    let photometric = uint(exif, Tag::PhotometricInterpretation)?;
    let bits = uint(exif, Tag::BitsPerSample).unwrap_or(1);
    let samples = uint(exif, Tag::SamplesPerPixel).unwrap_or(1);

    match (photometric, bits, samples) {
        (0 | 1, 1, _) => Some(PixelMode::Bilevel),
        (0 | 1, 16, _) => Some(PixelMode::I16),
        (0 | 1, 32, _) => Some(PixelMode::I),
        (0 | 1, _, 1) => Some(PixelMode::L),
        (0 | 1, _, _) => Some(PixelMode::La),
        (2, _, 3) => Some(PixelMode::Rgb),
        (2, _, 4) => Some(rgb_with_extra_sample(exif)),
        (3, _, _) => Some(PixelMode::Palette),
        (5, _, _) => Some(PixelMode::Cmyk),
        (6, _, _) => Some(PixelMode::YCbCr),
        (8, _, _) => Some(PixelMode::Lab),
        _ => None,
    }
}

/// The fourth sample is alpha when marked associated (1) or unassociated (2),
/// and also when unmarked. Unspecified data (0) is padding.
fn rgb_with_extra_sample(exif: &Exif) -> PixelMode {
    match uint(exif, EXTRA_SAMPLES) {
        Some(0) => PixelMode::Rgbx,
        _ => PixelMode::Rgba,
    }
}

/// Unit 2 (inch) or no unit at all is taken as dpi, unit 3 is per
/// centimetre, unit 1 carries no absolute measurement.
fn dpi(exif: &Exif) -> Option<Dpi> {
    let x = exif_tags::rational(exif, Tag::XResolution)?;
    let y = exif_tags::rational(exif, Tag::YResolution).unwrap_or(x);

    match uint(exif, Tag::ResolutionUnit) {
        None | Some(2) => Some(Dpi::new(x, y)),
        Some(3) => Some(Dpi::from_per_cm(x, y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif_tags::read_exif;
    use crate::exif_tags::tests::{tiff_with, tiff_with_shorts};

    #[test]
    fn rgb_tiff_in_inches() {
        let data = tiff_with(2, 3, Some(2), (300, 1));
        let exif = read_exif(&data).unwrap();
        let details = read(&exif);

        assert_eq!(details.mode, Some(PixelMode::Rgb));
        assert_eq!(details.dimensions, Some((4, 2)));
        assert_eq!(details.dpi.map(|d| d.rounded()), Some((300, 300)));
    }

    #[test]
    fn centimetre_resolution() {
        let data = tiff_with(1, 1, Some(3), (1181, 10));
        let exif = read_exif(&data).unwrap();
        let details = read(&exif);

        assert_eq!(details.mode, Some(PixelMode::L));
        assert_eq!(details.dpi.map(|d| d.rounded()), Some((300, 300)));
    }

    #[test]
    fn fourth_sample_meaning() {
        let mode_with = |extra: &[(u16, u16)]| {
            let data = tiff_with_shorts(2, 4, Some(2), (72, 1), extra);
            read(&read_exif(&data).unwrap()).mode
        };

        assert_eq!(mode_with(&[]), Some(PixelMode::Rgba));
        assert_eq!(mode_with(&[(0x0152, 1)]), Some(PixelMode::Rgba));
        assert_eq!(mode_with(&[(0x0152, 2)]), Some(PixelMode::Rgba));
        assert_eq!(mode_with(&[(0x0152, 0)]), Some(PixelMode::Rgbx));
        assert_eq!(PixelMode::Rgbx.bits_per_pixel(), None);
    }

    #[test]
    fn unitless_resolution_is_dropped() {
        let data = tiff_with(5, 4, Some(1), (72, 1));
        let exif = read_exif(&data).unwrap();
        let details = read(&exif);

        assert_eq!(details.mode, Some(PixelMode::Cmyk));
        assert_eq!(details.dpi, None);
    }
}
