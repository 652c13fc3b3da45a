use super::{u16_le, Dpi, FormatDetails};
use crate::pixel_mode::PixelMode;

const HEADER_LEN: usize = 128;
const MANUFACTURER: u8 = 0x0A;
const VGA_PALETTE_MARKER: u8 = 0x0C;
const VGA_PALETTE_LEN: usize = 768;

pub fn is_pcx(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN
        && data[0] == MANUFACTURER
        && matches!(data[1], 0 | 2 | 3 | 4 | 5)
        && data[2] == 1
}

/// PCX carries everything in its fixed header, nothing here needs a decoder.
pub fn read(data: &[u8]) -> FormatDetails {
    if !is_pcx(data) {
        return FormatDetails::default();
    }

    let version = data[1];
    let bits = data[3];
    let planes = data[65];

    let dimensions = match (
        u16_le(data, 4),
        u16_le(data, 6),
        u16_le(data, 8),
        u16_le(data, 10),
    ) {
        (Some(x_min), Some(y_min), Some(x_max), Some(y_max))
            if x_max >= x_min && y_max >= y_min =>
        {
            Some((
                u32::from(x_max - x_min) + 1,
                u32::from(y_max - y_min) + 1,
            ))
        }
        _ => None,
    };

    let dpi = u16_le(data, 12)
        .zip(u16_le(data, 14))
        .map(|(x, y)| Dpi::new(f64::from(x), f64::from(y)));

    FormatDetails {
        mode: mode(data, version, bits, planes),
        dimensions,
        dpi,
        entries: vec![],
    }
}

fn mode(data: &[u8], version: u8, bits: u8, planes: u8) -> Option<PixelMode> {
    match (bits, planes) {
        (1, 1) => Some(PixelMode::Bilevel),
        (1, 2) | (1, 4) | (2, 1) | (4, 1) => Some(PixelMode::Palette),
        (8, 1) if version == 5 && has_gray_vga_palette(data) => Some(PixelMode::L),
        (8, 1) => Some(PixelMode::Palette),
        (8, 3) => Some(PixelMode::Rgb),
        (8, 4) => Some(PixelMode::Rgba),
        _ => None,
    }
}

fn has_gray_vga_palette(data: &[u8]) -> bool {
    let Some(start) = data.len().checked_sub(VGA_PALETTE_LEN + 1) else {
        return false;
    };
    if start < HEADER_LEN || data[start] != VGA_PALETTE_MARKER {
        return false;
    }

    data[start + 1..]
        .chunks_exact(3)
        .enumerate()
        .all(|(i, rgb)| rgb.iter().all(|c| usize::from(*c) == i))
}
