use std::collections::BTreeMap;

use super::{format_list, u16_be, Dpi, FormatDetails};
use crate::{pixel_mode::PixelMode, report::MetadataEntry};

pub const TAG_QUANTIZATION: &str = "Quantization table";
pub const TAG_ENCODING: &str = "Encoding";

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const DQT: u8 = 0xDB;
const APP0: u8 = 0xE0;

/// Position in the 8x8 block for each coefficient in stream (zigzag) order.
const NATURAL_ORDER: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

#[derive(Debug, Default)]
struct JpegHeader {
    encoding: Option<&'static str>,
    components: Option<u8>,
    dimensions: Option<(u32, u32)>,
    dpi: Option<Dpi>,
    quantization: BTreeMap<u8, Vec<u16>>,
}

pub fn read(data: &[u8]) -> FormatDetails {
    let header = match parse(data) {
        Some(header) => header,
        None => {
            tracing::debug!("Not a JPEG stream, skipping header");
            return FormatDetails::default();
        }
    };

    let mut entries = vec![];
    if let Some(encoding) = header.encoding {
        entries.push(MetadataEntry::new(TAG_ENCODING, encoding));
    }
    if !header.quantization.is_empty() {
        entries.push(MetadataEntry::new(
            TAG_QUANTIZATION,
            format_tables(&header.quantization),
        ));
    }

    FormatDetails {
        mode: header.components.and_then(mode_from_components),
        dimensions: header.dimensions,
        dpi: header.dpi,
        entries,
    }
}

fn mode_from_components(components: u8) -> Option<PixelMode> {
    match components {
        1 => Some(PixelMode::L),
        3 => Some(PixelMode::Rgb),
        4 => Some(PixelMode::Cmyk),
        _ => None,
    }
}

/// Walks marker segments up to the first scan. Tables defined between
/// progressive scans are not reported.
fn parse(data: &[u8]) -> Option<JpegHeader> {
    if data.get(0..2)? != [0xFF, SOI] {
        return None;
    }

    let mut header = JpegHeader::default();
    let mut pos = 2;

    while pos < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        //fill bytes
        while data.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        if marker == EOI || marker == SOS {
            break;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        let len = usize::from(u16_be(data, pos)?);
        if len < 2 {
            break;
        }
        let end = (pos + len).min(data.len());
        let Some(payload) = data.get(pos + 2..end) else {
            break;
        };

        match marker {
            APP0 => {
                if header.dpi.is_none() {
                    header.dpi = jfif_dpi(payload);
                }
            }
            DQT => read_dqt(payload, &mut header.quantization),
            m if is_sof(m) => read_sof(m, payload, &mut header),
            _ => {}
        }

        pos += len;
    }

    Some(header)
}

fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn encoding_name(marker: u8) -> &'static str {
    match marker {
        0xC0 => "Baseline DCT",
        0xC1 => "Extended sequential DCT",
        0xC2 => "Progressive DCT",
        0xC3 => "Lossless",
        0xC9 => "Extended sequential DCT (arithmetic)",
        0xCA => "Progressive DCT (arithmetic)",
        0xCB => "Lossless (arithmetic)",
        _ => "Hierarchical",
    }
}

fn read_sof(marker: u8, payload: &[u8], header: &mut JpegHeader) {
    if header.dimensions.is_some() {
        return;
    }
    let (Some(height), Some(width), Some(components)) =
        (u16_be(payload, 1), u16_be(payload, 3), payload.get(5))
    else {
        return;
    };

    header.encoding = Some(encoding_name(marker));
    header.dimensions = Some((u32::from(width), u32::from(height)));
    header.components = Some(*components);
}

fn jfif_dpi(payload: &[u8]) -> Option<Dpi> {
    if payload.get(0..5)? != b"JFIF\0" {
        return None;
    }
    let unit = *payload.get(7)?;
    let x = f64::from(u16_be(payload, 8)?);
    let y = f64::from(u16_be(payload, 10)?);

    match unit {
        1 => Some(Dpi::new(x, y)),
        2 => Some(Dpi::from_per_cm(x, y)),
        _ => None,
    }
}

fn read_dqt(mut payload: &[u8], tables: &mut BTreeMap<u8, Vec<u16>>) {
    while let Some(&pq_tq) = payload.first() {
        let sixteen_bit = pq_tq >> 4 != 0;
        let id = pq_tq & 0x0F;
        let size = if sixteen_bit { 128 } else { 64 };

        let Some(raw) = payload.get(1..1 + size) else {
            tracing::debug!("Truncated quantization table {id}");
            return;
        };

        let mut natural = vec![0u16; 64];
        for (i, slot) in NATURAL_ORDER.iter().enumerate() {
            natural[*slot] = if sixteen_bit {
                u16::from_be_bytes([raw[i * 2], raw[i * 2 + 1]])
            } else {
                u16::from(raw[i])
            };
        }
        tables.insert(id, natural);

        payload = &payload[1 + size..];
    }
}

fn format_tables(tables: &BTreeMap<u8, Vec<u16>>) -> String {
    let items: Vec<String> = tables
        .iter()
        .map(|(id, values)| format!("{id}: {}", format_list(values)))
        .collect();
    format!("{{{}}}", items.join(", "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() + 2) as u16;
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Header only JPEG: JFIF, one DQT holding 1..=64 in stream order, SOF0.
    pub(crate) fn sample_header(unit: u8, density: u16, components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, SOI];

        let mut jfif = b"JFIF\0".to_vec();
        jfif.extend_from_slice(&[1, 1, unit]);
        jfif.extend_from_slice(&density.to_be_bytes());
        jfif.extend_from_slice(&density.to_be_bytes());
        jfif.extend_from_slice(&[0, 0]);
        data.extend(segment(APP0, &jfif));

        let mut dqt = vec![0x00];
        dqt.extend(1..=64u8);
        data.extend(segment(DQT, &dqt));

        let mut sof = vec![8];
        sof.extend_from_slice(&2u16.to_be_bytes());
        sof.extend_from_slice(&3u16.to_be_bytes());
        sof.push(components);
        for c in 0..components {
            sof.extend_from_slice(&[c + 1, 0x11, 0]);
        }
        data.extend(segment(0xC0, &sof));

        data.extend(segment(SOS, &[1, 1, 0, 0, 63, 0]));
        data.extend_from_slice(&[0x00, 0xFF, EOI]);
        data
    }

    #[test]
    fn reads_sof_and_jfif() {
        let details = read(&sample_header(1, 300, 3));

        assert_eq!(details.dimensions, Some((3, 2)));
        assert_eq!(details.mode, Some(PixelMode::Rgb));
        assert_eq!(details.dpi.map(|d| d.rounded()), Some((300, 300)));
        assert_eq!(details.entries[0].value, "Baseline DCT");
    }

    #[test]
    fn jfif_units() {
        let per_cm = read(&sample_header(2, 118, 1));
        assert_eq!(per_cm.dpi.map(|d| d.rounded()), Some((300, 300)));
        assert_eq!(per_cm.mode, Some(PixelMode::L));

        let aspect_only = read(&sample_header(0, 1, 4));
        assert_eq!(aspect_only.dpi, None);
        assert_eq!(aspect_only.mode, Some(PixelMode::Cmyk));
    }

    #[test]
    fn quantization_table_is_in_natural_order() {
        let details = read(&sample_header(1, 72, 3));
        let table = details
            .entries
            .iter()
            .find(|e| e.tag == TAG_QUANTIZATION)
            .unwrap();

        //stream order 1,2,3,.. lands as 1,2,6,7,.. in the first row
        assert!(table.value.starts_with("{0: [1, 2, 6, 7, 15, 16, 28, 29, 3, 5, 8,"));
        assert!(table.value.ends_with("58, 59, 63, 64]}"));
    }

    #[test]
    fn sixteen_bit_tables() {
        let mut payload = vec![0x11];
        for v in 0..64u16 {
            payload.extend_from_slice(&(v + 256).to_be_bytes());
        }
        let mut tables = BTreeMap::new();
        read_dqt(&payload, &mut tables);

        assert_eq!(tables[&1][0], 256);
        assert_eq!(tables[&1][1], 257);
        assert_eq!(tables[&1][8], 258);
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(read(b"not a jpeg"), FormatDetails::default());
        assert_eq!(read(&[0xFF, SOI, 0xFF, DQT, 0x00]).entries, vec![]);
    }
}
