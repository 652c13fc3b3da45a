//! EXIF rows. Parsing is left to `kamadak-exif`, this module only turns the
//! parsed fields into tree rows and answers a few lookups.

use std::io::Cursor;

use exif::{Exif, Field, In, Tag, Value};

use crate::{formats::Dpi, report::MetadataEntry};

/// `None` for containers without an EXIF block, which is the common case
/// for GIF, BMP and PCX.
pub fn read_exif(data: &[u8]) -> Option<Exif> {
    match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => Some(exif),
        Err(e) => {
            tracing::debug!("No EXIF data -> {e}");
            None
        }
    }
}

/// One row per field of the primary image, in file order.
pub fn exif_entries(exif: &Exif) -> Vec<MetadataEntry> {
    exif.fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .map(|f| MetadataEntry::new(f.tag.to_string(), format_value(f)))
        .collect()
}

/// Single numbers are shown as integers, rationals rounded to the nearest
/// one. Text is shown as is. Everything else uses the library's own
/// rendering.
pub fn format_value(field: &Field) -> String {
    if let Value::Ascii(strings) = &field.value {
        return strings
            .iter()
            .map(|s| String::from_utf8_lossy(s).trim_end_matches('\0').to_string())
            .collect::<Vec<_>>()
            .join(", ");
    }

    let rounded = match &field.value {
        Value::Byte(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::Short(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::Long(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::SByte(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::SShort(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::SLong(v) if v.len() == 1 => Some(i64::from(v[0])),
        Value::Rational(v) if v.len() == 1 => round(v[0].to_f64()),
        Value::SRational(v) if v.len() == 1 => round(v[0].to_f64()),
        Value::Float(v) if v.len() == 1 => round(f64::from(v[0])),
        Value::Double(v) if v.len() == 1 => round(v[0]),
        _ => None,
    };

    match rounded {
        Some(n) => n.to_string(),
        None => field.display_value().to_string(),
    }
}

fn round(v: f64) -> Option<i64> {
    if v.is_finite() {
        Some(v.round() as i64)
    } else {
        None
    }
}

pub fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = match &field.value {
        Value::Rational(v) => v.first()?.to_f64(),
        Value::SRational(v) => v.first()?.to_f64(),
        other => f64::from(other.get_uint(0)?),
    };
    value.is_finite().then_some(value)
}

pub const DEFAULT_JPEG_DPI: f64 = 72.;

/// Resolution of a JPEG carrying EXIF but no JFIF density. The x resolution
/// is applied to both axes. Without both a resolution unit and a usable x
/// resolution the file is taken to be 72 dpi.
pub fn fallback_dpi(exif: &Exif) -> Dpi {
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0));

    match (unit, rational(exif, Tag::XResolution)) {
        (Some(3), Some(x)) => Dpi::from_per_cm(x, x),
        (Some(_), Some(x)) => Dpi::new(x, x),
        _ => {
            tracing::debug!("EXIF resolution incomplete, assuming {DEFAULT_JPEG_DPI} dpi");
            Dpi::new(DEFAULT_JPEG_DPI, DEFAULT_JPEG_DPI)
        }
    }
}
