use super::{i32_le, u16_le, u32_le, Dpi, FormatDetails};
use crate::{pixel_mode::PixelMode, report::MetadataEntry};

pub const TAG_COMPRESSION: &str = "Compression";

/// Compression names indexed by the header's compression field.
pub const COMPRESSIONS: &[&str] = &["RAW", "RLE8", "RLE4", "BITFIELDS", "JPEG", "PNG"];

const FILE_HEADER_LEN: usize = 14;
const CORE_HEADER_LEN: u32 = 12;
const INFO_HEADER_LEN: u32 = 40;

pub fn read(data: &[u8]) -> FormatDetails {
    if data.get(0..2) != Some(b"BM".as_slice()) {
        return FormatDetails::default();
    }
    let Some(dib_len) = u32_le(data, FILE_HEADER_LEN) else {
        return FormatDetails::default();
    };
    let dib = &data[FILE_HEADER_LEN..];

    if dib_len == CORE_HEADER_LEN {
        return read_core_header(dib, palette_at(data, dib_len));
    }
    if dib_len < INFO_HEADER_LEN {
        tracing::debug!("Unknown BMP header size {dib_len}");
        return FormatDetails::default();
    }

    let width = i32_le(dib, 4).map(i32::unsigned_abs);
    let height = i32_le(dib, 8).map(i32::unsigned_abs);
    let bit_count = u16_le(dib, 14);
    let compression = u32_le(dib, 16);
    let colors_used = u32_le(dib, 32).unwrap_or(0);

    let mut entries = vec![];
    if let Some(name) = compression.and_then(compression_name) {
        entries.push(MetadataEntry::new(TAG_COMPRESSION, name));
    }

    //an alpha mask only exists from the v3 header on
    let has_alpha_mask = dib_len >= 56 && u32_le(dib, 52).is_some_and(|mask| mask != 0);

    let mode = bit_count.and_then(|bits| {
        let palette = Palette::new(palette_at(data, dib_len), bits, colors_used, 4);
        mode_for(bits, has_alpha_mask, &palette)
    });

    FormatDetails {
        mode,
        dimensions: width.zip(height),
        dpi: u32_le(dib, 24)
            .zip(u32_le(dib, 28))
            .map(|(x, y)| Dpi::from_per_meter(x, y)),
        entries,
    }
}

//OS/2 headers have no compression field and are always uncompressed
fn read_core_header(dib: &[u8], palette: &[u8]) -> FormatDetails {
    let width = u16_le(dib, 4).map(u32::from);
    let height = u16_le(dib, 6).map(u32::from);
    let mode = u16_le(dib, 10)
        .and_then(|bits| mode_for(bits, false, &Palette::new(palette, bits, 0, 3)));

    FormatDetails {
        mode,
        dimensions: width.zip(height),
        dpi: None,
        entries: vec![MetadataEntry::new(TAG_COMPRESSION, COMPRESSIONS[0])],
    }
}

fn palette_at(data: &[u8], dib_len: u32) -> &[u8] {
    usize::try_from(dib_len)
        .ok()
        .and_then(|len| data.get(FILE_HEADER_LEN + len..))
        .unwrap_or_default()
}

/// Colour table of an indexed BMP.
struct Palette<'a> {
    data: &'a [u8],
    colors: usize,
    entry_len: usize,
}

impl<'a> Palette<'a> {
    fn new(data: &'a [u8], bits: u16, colors_used: u32, entry_len: usize) -> Self {
        let colors = match colors_used {
            0 => 1usize.checked_shl(u32::from(bits)).unwrap_or(0),
            n => usize::try_from(n).unwrap_or(0),
        };
        Palette {
            data,
            colors,
            entry_len,
        }
    }

    /// A table of plain grey ramps is stored as bilevel (two colours) or
    /// greyscale. Anything else stays a palette image.
    fn mode(&self) -> PixelMode {
        if !self.is_grey_ramp() {
            PixelMode::Palette
        } else if self.colors == 2 {
            PixelMode::Bilevel
        } else {
            PixelMode::L
        }
    }

    fn is_grey_ramp(&self) -> bool {
        if self.colors == 0 || self.colors > 256 {
            return false;
        }
        let levels: Vec<u8> = if self.colors == 2 {
            vec![0, 255]
        } else {
            (0..self.colors).map(|i| i as u8).collect()
        };

        levels.iter().enumerate().all(|(i, &level)| {
            let at = i * self.entry_len;
            self.data.get(at..at + 3) == Some([level; 3].as_slice())
        })
    }
}

pub fn compression_name(index: u32) -> Option<&'static str> {
    COMPRESSIONS.get(usize::try_from(index).ok()?).copied()
}

fn mode_for(bits: u16, has_alpha_mask: bool, palette: &Palette) -> Option<PixelMode> {
    match bits {
        1..=8 => Some(palette.mode()),
        16 | 24 => Some(PixelMode::Rgb),
        32 if has_alpha_mask => Some(PixelMode::Rgba),
        32 => Some(PixelMode::Rgb),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmp_header(bits: u16, compression: u32, ppm: u32) -> Vec<u8> {
        let mut data = b"BM".to_vec();
        data.extend_from_slice(&[0; 12]);
        data.extend_from_slice(&INFO_HEADER_LEN.to_le_bytes());
        data.extend_from_slice(&4i32.to_le_bytes());
        data.extend_from_slice(&(-3i32).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&bits.to_le_bytes());
        data.extend_from_slice(&compression.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&ppm.to_le_bytes());
        data.extend_from_slice(&ppm.to_le_bytes());
        data.extend_from_slice(&[0; 8]);
        data
    }

    #[test]
    fn reads_info_header() {
        let details = read(&bmp_header(24, 0, 3780));

        assert_eq!(details.dimensions, Some((4, 3)));
        assert_eq!(details.mode, Some(PixelMode::Rgb));
        assert_eq!(details.dpi.map(|d| d.rounded()), Some((96, 96)));
        assert_eq!(
            details.entries,
            vec![MetadataEntry::new(TAG_COMPRESSION, "RAW")]
        );
    }

    #[test]
    fn compression_table() {
        assert_eq!(compression_name(1), Some("RLE8"));
        assert_eq!(compression_name(3), Some("BITFIELDS"));
        assert_eq!(compression_name(5), Some("PNG"));
        assert_eq!(compression_name(6), None);
    }

    #[test]
    fn unknown_compression_has_no_row() {
        let details = read(&bmp_header(8, 6, 0));
        assert!(details.entries.is_empty());
        assert_eq!(details.mode, Some(PixelMode::Palette));
        assert_eq!(details.dpi.map(|d| d.rounded()), Some((0, 0)));
    }

    fn with_palette(mut data: Vec<u8>, colors: &[[u8; 3]], entry_len: usize) -> Vec<u8> {
        for rgb in colors {
            //stored as BGR
            data.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
            data.extend(std::iter::repeat(0).take(entry_len - 3));
        }
        data
    }

    fn grey_ramp(levels: usize) -> Vec<[u8; 3]> {
        (0..levels).map(|i| [i as u8; 3]).collect()
    }

    #[test]
    fn bit_counts() {
        assert_eq!(read(&bmp_header(24, 0, 0)).mode, Some(PixelMode::Rgb));
        assert_eq!(read(&bmp_header(32, 3, 0)).mode, Some(PixelMode::Rgb));
        assert_eq!(read(&bmp_header(64, 0, 0)).mode, None);
    }

    #[test]
    fn palette_decides_indexed_modes() {
        let black_white = with_palette(bmp_header(1, 0, 0), &[[0; 3], [255; 3]], 4);
        assert_eq!(read(&black_white).mode, Some(PixelMode::Bilevel));

        let coloured = with_palette(bmp_header(1, 0, 0), &[[0; 3], [255, 0, 0]], 4);
        assert_eq!(read(&coloured).mode, Some(PixelMode::Palette));

        let grey = with_palette(bmp_header(8, 0, 0), &grey_ramp(256), 4);
        assert_eq!(read(&grey).mode, Some(PixelMode::L));

        let mut tinted = grey_ramp(256);
        tinted[200] = [200, 200, 201];
        let tinted = with_palette(bmp_header(8, 0, 0), &tinted, 4);
        assert_eq!(read(&tinted).mode, Some(PixelMode::Palette));

        //no colour table at all
        assert_eq!(read(&bmp_header(4, 0, 0)).mode, Some(PixelMode::Palette));
    }

    #[test]
    fn core_header() {
        let mut data = b"BM".to_vec();
        data.extend_from_slice(&[0; 12]);
        data.extend_from_slice(&CORE_HEADER_LEN.to_le_bytes());
        data.extend_from_slice(&7u16.to_le_bytes());
        data.extend_from_slice(&5u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());

        let details = read(&data);
        assert_eq!(details.dimensions, Some((7, 5)));
        assert_eq!(details.mode, Some(PixelMode::Palette));
        assert_eq!(details.dpi, None);
        assert_eq!(
            details.entries,
            vec![MetadataEntry::new(TAG_COMPRESSION, "RAW")]
        );

        let grey = with_palette(data, &grey_ramp(16), 3);
        assert_eq!(read(&grey).mode, Some(PixelMode::L));
    }
}
