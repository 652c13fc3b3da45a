use std::{
    fs,
    io::Cursor,
    ops::ControlFlow,
    path::Path,
    time::Instant,
};

use image::{
    codecs::{
        bmp::BmpDecoder, gif::GifDecoder, jpeg::JpegDecoder, png::PngDecoder, tiff::TiffDecoder,
    },
    ColorType, ImageDecoder, ImageResult,
};

use crate::{
    crawler,
    error::InspectError,
    exif_tags, icc,
    formats::{tiff, FormatDetails, ImageKind},
    pixel_mode::PixelMode,
    report::{ImageReport, ScanFailure, ScanSummary},
};

/// What the `image` decoders expose without decoding pixel data.
struct DecoderInfo {
    dimensions: (u32, u32),
    color_type: ColorType,
    icc_profile: Option<Vec<u8>>,
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

/// Reads everything shown for one file. Only failing to read the file or
/// its pixel size is an error, every other field is optional.
pub fn inspect(path: &Path) -> Result<ImageReport, InspectError> {
    let name = file_name(path);

    let mut now = Instant::now();
    let data = fs::read(path).map_err(|e| InspectError::Io(e, path.to_path_buf()))?;
    tracing::trace!("{name} -> Spent {}ms reading into buffer", now.elapsed().as_millis());
    now = Instant::now();

    let kind = ImageKind::detect(path, &data)
        .ok_or_else(|| InspectError::UnsupportedFormat(path.to_path_buf()))?;

    let exif = exif_tags::read_exif(&data);
    let details = match kind {
        ImageKind::Tiff => exif.as_ref().map(tiff::read).unwrap_or_default(),
        other => other.read_details(&data),
    };
    tracing::trace!("{name} -> Spent {}ms reading headers", now.elapsed().as_millis());
    now = Instant::now();

    let decoded = match decoder_info(kind, &data) {
        Some(Ok(info)) => Some(info),
        Some(Err(e)) if details.dimensions.is_none() => {
            return Err(InspectError::Decode(e, path.to_path_buf()));
        }
        Some(Err(e)) => {
            tracing::debug!("{name} -> Decoder refused file, using header fields: {e}");
            None
        }
        None => None,
    };
    tracing::trace!("{name} -> Spent {}ms probing decoder", now.elapsed().as_millis());

    let (width, height) = decoded
        .as_ref()
        .map(|d| d.dimensions)
        .or(details.dimensions)
        .ok_or_else(|| InspectError::MissingDimensions(path.to_path_buf()))?;

    let mode = details
        .mode
        .or_else(|| decoded.as_ref().and_then(|d| PixelMode::from_color_type(d.color_type)));

    let dpi = match (details.dpi, kind, &exif) {
        (Some(dpi), _, _) => Some(dpi),
        (None, ImageKind::Jpeg, Some(exif)) => Some(exif_tags::fallback_dpi(exif)),
        _ => None,
    };

    let FormatDetails {
        entries: format_entries,
        ..
    } = details;

    let mut entries = exif.as_ref().map(exif_tags::exif_entries).unwrap_or_default();
    entries.extend(format_entries);
    if let Some(icc) = decoded.as_ref().and_then(|d| d.icc_profile.as_deref()) {
        entries.extend(icc::icc_entry(icc));
    }

    Ok(ImageReport {
        path: path.to_path_buf(),
        name,
        width,
        height,
        resolution: dpi.map(|d| d.rounded()).unwrap_or((0, 0)),
        mode,
        bit_depth: mode.and_then(PixelMode::bits_per_pixel),
        entries,
    })
}

fn decoder_info(kind: ImageKind, data: &[u8]) -> Option<ImageResult<DecoderInfo>> {
    let cursor = Cursor::new(data);
    let info = match kind {
        ImageKind::Jpeg => JpegDecoder::new(cursor).and_then(describe),
        ImageKind::Png => PngDecoder::new(cursor).and_then(describe),
        ImageKind::Gif => GifDecoder::new(cursor).and_then(describe),
        ImageKind::Bmp => BmpDecoder::new(cursor).and_then(describe),
        ImageKind::Tiff => TiffDecoder::new(cursor).and_then(describe),
        ImageKind::Pcx => return None,
    };
    Some(info)
}

fn describe<D: ImageDecoder>(mut decoder: D) -> ImageResult<DecoderInfo> {
    let icc_profile = match decoder.icc_profile() {
        Ok(icc) => icc,
        Err(e) => {
            tracing::debug!("Failure reading embedded ICC profile -> {e}");
            None
        }
    };

    Ok(DecoderInfo {
        dimensions: decoder.dimensions(),
        color_type: decoder.color_type(),
        icc_profile,
    })
}

pub fn scan_folder(folder: &Path) -> ScanSummary {
    scan_folder_with(folder, |_| ControlFlow::Continue(()))
}

/// Scans every supported file below `folder`, handing each result to
/// `on_file` as soon as it is known. Returning `Break` stops the scan.
pub fn scan_folder_with<F>(folder: &Path, mut on_file: F) -> ScanSummary
where
    F: FnMut(&Result<ImageReport, InspectError>) -> ControlFlow<()>,
{
    let start = Instant::now();
    let files = crawler::crawl(folder);
    tracing::info!("Scanning {} images in {}", files.len(), folder.display());

    let mut summary = ScanSummary::new(folder);

    for file in &files {
        let result = inspect(file);
        let flow = on_file(&result);

        match result {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                tracing::warn!("Skipping {} -> {e}", file.display());
                summary.failures.push(ScanFailure {
                    path: e.path().clone(),
                    reason: e.to_string(),
                });
            }
        }

        if flow.is_break() {
            tracing::info!("Scan of {} cancelled", folder.display());
            break;
        }
    }

    summary.elapsed = start.elapsed();
    tracing::info!("{}", summary.timing_line());

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{bmp, gif, jpeg};
    use std::fs;

    fn write(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn hand_made_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "dot.gif", &gif::tests::sample_gif(&[Some(10)]));

        let report = inspect(&path).unwrap();

        assert_eq!(report.name, "dot.gif");
        assert_eq!(report.pixel_size(), "1x1");
        assert_eq!(report.resolution, (0, 0));
        assert_eq!(report.mode, Some(PixelMode::Palette));
        assert_eq!(report.bit_depth, Some(8));
        assert_eq!(
            report.entry(gif::TAG_DURATION).map(|e| e.value.as_str()),
            Some("100")
        );
        assert!(report.entry(gif::TAG_PALETTE).is_some());
    }

    #[test]
    fn pcx_comes_from_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let data = crate::formats::pcx::tests::sample_header(8, 3, 32, 16, 96);
        let path = write(dir.path(), "old.pcx", &data);

        let report = inspect(&path).unwrap();

        assert_eq!(report.pixel_size(), "32x16");
        assert_eq!(report.resolution_text(), "96x96");
        assert_eq!(report.bit_depth, Some(24));
    }

    #[test]
    fn tiff_reports_exif_rows() {
        let dir = tempfile::tempdir().unwrap();
        let data = exif_tags::tests::tiff_with(2, 3, Some(2), (300, 1));
        let path = write(dir.path(), "scan.tiff", &data);

        //header only tiff, the decoder may refuse it but the IFD has the size
        let report = inspect(&path).unwrap();

        assert_eq!(report.pixel_size(), "4x2");
        assert_eq!(report.resolution, (300, 300));
        assert_eq!(report.bit_depth, Some(24));
        assert!(report.entry("XResolution").is_some());
    }

    #[test]
    fn truncated_jpeg_still_reports_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "cut.jpg", &jpeg::tests::sample_header(1, 72, 3));

        let report = inspect(&path).unwrap();

        assert_eq!(report.pixel_size(), "3x2");
        assert_eq!(report.resolution, (72, 72));
        assert!(report.entry(jpeg::TAG_QUANTIZATION).is_some());
        assert!(report.entry(bmp::TAG_COMPRESSION).is_none());
    }

    /// Puts an APP1 Exif segment right after the JFIF segment.
    fn with_exif(mut jpeg: Vec<u8>, tiff: &[u8]) -> Vec<u8> {
        let app0_end = 4 + usize::from(u16::from_be_bytes([jpeg[4], jpeg[5]]));
        let mut app1 = vec![0xFF, 0xE1];
        app1.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(tiff);
        jpeg.splice(app0_end..app0_end, app1);
        jpeg
    }

    #[test]
    fn jpeg_resolution_falls_back_to_exif() {
        let dir = tempfile::tempdir().unwrap();
        let aspect_only = jpeg::tests::sample_header(0, 1, 3);

        let tiff = exif_tags::tests::tiff_with(2, 3, Some(2), (240, 1));
        let path = write(dir.path(), "inch.jpg", &with_exif(aspect_only.clone(), &tiff));
        let report = inspect(&path).unwrap();
        assert_eq!(report.resolution, (240, 240));
        assert_eq!(
            report.entry("XResolution").map(|e| e.value.as_str()),
            Some("240")
        );

        let tiff = exif_tags::tests::tiff_with(2, 3, None, (300, 1));
        let path = write(dir.path(), "no_unit.jpg", &with_exif(aspect_only.clone(), &tiff));
        assert_eq!(inspect(&path).unwrap().resolution, (72, 72));

        let path = write(dir.path(), "plain.jpg", &aspect_only);
        assert_eq!(inspect(&path).unwrap().resolution, (0, 0));
    }

    #[test]
    fn jfif_density_wins_over_exif() {
        let dir = tempfile::tempdir().unwrap();
        let tiff = exif_tags::tests::tiff_with(2, 3, Some(2), (240, 1));

        let per_cm = with_exif(jpeg::tests::sample_header(2, 118, 3), &tiff);
        let path = write(dir.path(), "cm.jpg", &per_cm);
        assert_eq!(inspect(&path).unwrap().resolution, (300, 300));

        let dpi = with_exif(jpeg::tests::sample_header(1, 96, 3), &tiff);
        let path = write(dir.path(), "dpi.jpg", &dpi);
        assert_eq!(inspect(&path).unwrap().resolution, (96, 96));
    }

    #[test]
    fn missing_and_unknown_files_fail() {
        let dir = tempfile::tempdir().unwrap();

        let missing = inspect(&dir.path().join("gone.png"));
        assert!(matches!(missing, Err(InspectError::Io(..))));

        let text = write(dir.path(), "text.pcx", b"hello");
        assert!(matches!(
            inspect(&text),
            Err(InspectError::MissingDimensions(_))
        ));
    }

    #[test]
    fn scan_collects_failures_and_stops_on_break() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.gif", &gif::tests::sample_gif(&[None]));
        write(dir.path(), "b.png", b"not a png");
        write(dir.path(), "c.gif", &gif::tests::sample_gif(&[None]));

        let summary = scan_folder(dir.path());
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].path.ends_with("b.png"));

        let mut seen = 0;
        let partial = scan_folder_with(dir.path(), |_| {
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1);
        assert_eq!(partial.total_files(), 1);
    }
}
