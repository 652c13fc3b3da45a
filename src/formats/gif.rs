use super::{format_list, u16_le, FormatDetails};
use crate::{pixel_mode::PixelMode, report::MetadataEntry};

pub const TAG_PALETTE: &str = "Palette";
pub const TAG_DURATION: &str = "Duration";
pub const TAG_FRAMES: &str = "Frames";
pub const TAG_FRAME_DURATIONS: &str = "Frame durations";

const IMAGE_DESCRIPTOR: u8 = 0x2C;
const EXTENSION: u8 = 0x21;
const TRAILER: u8 = 0x3B;
const GRAPHIC_CONTROL: u8 = 0xF9;

#[derive(Debug, Default)]
struct GifStructure {
    dimensions: Option<(u32, u32)>,
    palette: Option<Vec<u8>>,
    /// One entry per frame, `None` when the frame had no graphic control block.
    frame_delays_ms: Vec<Option<u32>>,
}

pub fn read(data: &[u8]) -> FormatDetails {
    let Some(gif) = parse(data) else {
        return FormatDetails::default();
    };

    let mut entries = vec![];

    if let Some(palette) = &gif.palette {
        let swatches = palette
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        entries.push(MetadataEntry::new(TAG_PALETTE, format_list(palette)).with_swatches(swatches));
    }

    if let Some(Some(first)) = gif.frame_delays_ms.first() {
        entries.push(MetadataEntry::new(TAG_DURATION, first.to_string()));
    }

    if gif.frame_delays_ms.len() > 1 {
        let delays: Vec<u32> = gif.frame_delays_ms.iter().map(|d| d.unwrap_or(0)).collect();
        entries.push(MetadataEntry::new(TAG_FRAMES, delays.len().to_string()));
        entries.push(MetadataEntry::new(TAG_FRAME_DURATIONS, format_list(&delays)));
    }

    FormatDetails {
        mode: Some(PixelMode::Palette),
        dimensions: gif.dimensions,
        dpi: None,
        entries,
    }
}

fn color_table_len(packed: u8) -> usize {
    3 * (1usize << ((packed & 0x07) + 1))
}

fn parse(data: &[u8]) -> Option<GifStructure> {
    let signature = data.get(0..6)?;
    if signature != b"GIF87a" && signature != b"GIF89a" {
        return None;
    }

    let mut gif = GifStructure {
        dimensions: Some((u32::from(u16_le(data, 6)?), u32::from(u16_le(data, 8)?))),
        ..Default::default()
    };

    let packed = *data.get(10)?;
    let mut pos = 13;
    if packed & 0x80 != 0 {
        let len = color_table_len(packed);
        gif.palette = data.get(pos..pos + len).map(<[u8]>::to_vec);
        pos += len;
    }

    let mut pending_delay: Option<u32> = None;

    while let Some(&block) = data.get(pos) {
        match block {
            IMAGE_DESCRIPTOR => {
                gif.frame_delays_ms.push(pending_delay.take());

                let Some(&local_packed) = data.get(pos + 9) else {
                    break;
                };
                pos += 10;
                if local_packed & 0x80 != 0 {
                    let len = color_table_len(local_packed);
                    if gif.palette.is_none() {
                        gif.palette = data.get(pos..pos + len).map(<[u8]>::to_vec);
                    }
                    pos += len;
                }
                //lzw minimum code size
                pos += 1;
                match skip_sub_blocks(data, pos) {
                    Some(next) => pos = next,
                    None => break,
                }
            }
            EXTENSION => {
                if data.get(pos + 1) == Some(&GRAPHIC_CONTROL) {
                    //delay is stored in hundredths of a second
                    pending_delay = u16_le(data, pos + 4).map(|d| u32::from(d) * 10);
                }
                match skip_sub_blocks(data, pos + 2) {
                    Some(next) => pos = next,
                    None => break,
                }
            }
            TRAILER => break,
            _ => {
                tracing::debug!("Unexpected GIF block {block:#04x} at {pos}");
                break;
            }
        }
    }

    Some(gif)
}

/// Returns the position just past the block terminator.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let size = usize::from(*data.get(pos)?);
        pos += 1;
        if size == 0 {
            return Some(pos);
        }
        pos += size;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn frame(delay_cs: Option<u16>) -> Vec<u8> {
        let mut out = vec![];
        if let Some(delay) = delay_cs {
            out.extend_from_slice(&[EXTENSION, GRAPHIC_CONTROL, 4, 0]);
            out.extend_from_slice(&delay.to_le_bytes());
            out.extend_from_slice(&[0, 0]);
        }
        out.extend_from_slice(&[IMAGE_DESCRIPTOR, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
        out.extend_from_slice(&[2, 2, 0x44, 0x01, 0]);
        out
    }

    /// 1x1 GIF with a two colour global table (black, white).
    pub(crate) fn sample_gif(delays_cs: &[Option<u16>]) -> Vec<u8> {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&[1, 0, 1, 0, 0x80, 0, 0]);
        data.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        for delay in delays_cs {
            data.extend(frame(*delay));
        }
        data.push(TRAILER);
        data
    }

    fn value<'a>(details: &'a FormatDetails, tag: &str) -> Option<&'a str> {
        details
            .entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.value.as_str())
    }

    #[test]
    fn still_gif() {
        let details = read(&sample_gif(&[Some(10)]));

        assert_eq!(details.dimensions, Some((1, 1)));
        assert_eq!(details.mode, Some(PixelMode::Palette));
        assert_eq!(value(&details, TAG_PALETTE), Some("[0, 0, 0, 255, 255, 255]"));
        assert_eq!(value(&details, TAG_DURATION), Some("100"));
        assert_eq!(value(&details, TAG_FRAMES), None);

        let palette = details.entries.iter().find(|e| e.tag == TAG_PALETTE).unwrap();
        assert_eq!(
            palette.swatches,
            Some(vec![[0, 0, 0], [255, 255, 255]])
        );
    }

    #[test]
    fn animated_gif_lists_every_frame() {
        let details = read(&sample_gif(&[Some(5), None, Some(20)]));

        assert_eq!(value(&details, TAG_DURATION), Some("50"));
        assert_eq!(value(&details, TAG_FRAMES), Some("3"));
        assert_eq!(value(&details, TAG_FRAME_DURATIONS), Some("[50, 0, 200]"));
    }

    #[test]
    fn no_graphic_control_means_no_duration() {
        let details = read(&sample_gif(&[None]));
        assert_eq!(value(&details, TAG_DURATION), None);
    }

    #[test]
    fn local_palette_is_used_without_global_table() {
        let mut data = b"GIF87a".to_vec();
        data.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]);
        data.extend_from_slice(&[IMAGE_DESCRIPTOR, 0, 0, 0, 0, 1, 0, 1, 0, 0x80]);
        data.extend_from_slice(&[10, 20, 30, 40, 50, 60]);
        data.extend_from_slice(&[2, 2, 0x44, 0x01, 0, TRAILER]);

        let details = read(&data);
        assert_eq!(value(&details, TAG_PALETTE), Some("[10, 20, 30, 40, 50, 60]"));
    }

    #[test]
    fn not_a_gif() {
        assert_eq!(read(b"GIF90a......"), FormatDetails::default());
    }
}
