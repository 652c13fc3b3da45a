use super::{u32_be, Dpi, FormatDetails};
use crate::pixel_mode::PixelMode;

const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

pub fn read(data: &[u8]) -> FormatDetails {
    if data.get(0..8) != Some(SIGNATURE.as_slice()) {
        return FormatDetails::default();
    }

    let mut details = FormatDetails::default();
    let mut pos = 8;

    while let (Some(len), Some(kind)) = (u32_be(data, pos), data.get(pos + 4..pos + 8)) {
        let start = pos + 8;
        let Some(end) = start.checked_add(len as usize) else {
            break;
        };
        let Some(chunk) = data.get(start..end) else {
            tracing::debug!("Truncated PNG chunk");
            break;
        };

        match kind {
            b"IHDR" => {
                details.dimensions = u32_be(chunk, 0).zip(u32_be(chunk, 4));
                if let (Some(bit_depth), Some(color_type)) = (chunk.get(8), chunk.get(9)) {
                    details.mode = mode(*color_type, *bit_depth);
                }
            }
            b"pHYs" => details.dpi = phys_dpi(chunk),
            b"IDAT" | b"IEND" => break,
            _ => {}
        }

        //chunk data + crc
        pos = end + 4;
    }

    details
}

fn mode(color_type: u8, bit_depth: u8) -> Option<PixelMode> {
    match (color_type, bit_depth) {
        (0, 1) => Some(PixelMode::Bilevel),
        (0, 16) => Some(PixelMode::I16),
        (0, _) => Some(PixelMode::L),
        (2, _) => Some(PixelMode::Rgb),
        (3, _) => Some(PixelMode::Palette),
        (4, _) => Some(PixelMode::La),
        (6, _) => Some(PixelMode::Rgba),
        _ => None,
    }
}

/// Only metre based densities are physical, unit 0 is an aspect ratio.
fn phys_dpi(chunk: &[u8]) -> Option<Dpi> {
    let x = u32_be(chunk, 0)?;
    let y = u32_be(chunk, 4)?;
    match chunk.get(8)? {
        1 => Some(Dpi::from_per_meter(x, y)),
        _ => None,
    }
}
