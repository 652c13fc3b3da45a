//! Header readers for the supported containers.
//!
//! Decoding belongs to the `image` crate. These readers only pick up the
//! container fields it does not expose: the stored pixel mode, the physical
//! resolution and format specific extras such as quantization tables.

pub mod bmp;
pub mod gif;
pub mod jpeg;
pub mod pcx;
pub mod png;
pub mod tiff;

use std::path::Path;

use image::ImageFormat;

use crate::{crawler, pixel_mode::PixelMode, report::MetadataEntry};

/// Physical resolution as read from the file, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpi {
    pub x: f64,
    pub y: f64,
}

impl Dpi {
    pub fn new(x: f64, y: f64) -> Dpi {
        Dpi { x, y }
    }

    pub fn from_per_meter(x: u32, y: u32) -> Dpi {
        Dpi::new(f64::from(x) * 0.0254, f64::from(y) * 0.0254)
    }

    pub fn from_per_cm(x: f64, y: f64) -> Dpi {
        Dpi::new(x * 2.54, y * 2.54)
    }

    pub fn rounded(&self) -> (u32, u32) {
        (round_non_negative(self.x), round_non_negative(self.y))
    }
}

fn round_non_negative(v: f64) -> u32 {
    if v.is_finite() && v > 0. {
        v.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormatDetails {
    pub mode: Option<PixelMode>,
    pub dimensions: Option<(u32, u32)>,
    pub dpi: Option<Dpi>,
    pub entries: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Pcx,
}

impl ImageKind {
    pub fn from_extension(ext: &str) -> Option<ImageKind> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            "bmp" => Some(ImageKind::Bmp),
            "tif" | "tiff" => Some(ImageKind::Tiff),
            "pcx" => Some(ImageKind::Pcx),
            _ => None,
        }
    }

    /// Sniffs the content first so mislabelled files still get the right
    /// reader, falling back to the extension.
    pub fn detect(path: &Path, data: &[u8]) -> Option<ImageKind> {
        if let Ok(format) = image::guess_format(data) {
            if let Some(kind) = Self::from_image_format(format) {
                return Some(kind);
            }
        }

        if pcx::is_pcx(data) {
            return Some(ImageKind::Pcx);
        }

        Self::from_extension(&crawler::extension_lowercase(path))
    }

    fn from_image_format(format: ImageFormat) -> Option<ImageKind> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::Bmp => Some(ImageKind::Bmp),
            ImageFormat::Tiff => Some(ImageKind::Tiff),
            _ => None,
        }
    }

    pub fn image_format(self) -> Option<ImageFormat> {
        match self {
            ImageKind::Jpeg => Some(ImageFormat::Jpeg),
            ImageKind::Png => Some(ImageFormat::Png),
            ImageKind::Gif => Some(ImageFormat::Gif),
            ImageKind::Bmp => Some(ImageFormat::Bmp),
            ImageKind::Tiff => Some(ImageFormat::Tiff),
            ImageKind::Pcx => None,
        }
    }

    /// Runs the header reader for this container. TIFF is handled through
    /// its EXIF directory in [`crate::inspect`].
    pub fn read_details(self, data: &[u8]) -> FormatDetails {
        match self {
            ImageKind::Jpeg => jpeg::read(data),
            ImageKind::Png => png::read(data),
            ImageKind::Gif => gif::read(data),
            ImageKind::Bmp => bmp::read(data),
            ImageKind::Pcx => pcx::read(data),
            ImageKind::Tiff => FormatDetails::default(),
        }
    }
}

pub(crate) fn u16_le(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*data.get(at)?, *data.get(at + 1)?]))
}

pub(crate) fn u16_be(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*data.get(at)?, *data.get(at + 1)?]))
}

pub(crate) fn u32_le(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn u32_be(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn i32_le(data: &[u8], at: usize) -> Option<i32> {
    let b = data.get(at..at + 4)?;
    Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// `[1, 2, 3]` style list, the way palettes and tables are shown.
pub(crate) fn format_list<T: std::fmt::Display>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}
