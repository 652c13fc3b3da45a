use std::{fs, io::Cursor, path::Path, time::Instant};

use epaint::ColorImage;
use fast_image_resize::{images::Image as FirImage, PixelType, ResizeOptions, Resizer};
use image::ImageReader;

use crate::{error::ThumbnailError, formats::ImageKind, inspect::file_name};

/// Largest size fitting `max_side` on both axes while keeping the aspect
/// ratio. Images already small enough keep their size.
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width, height);
    }

    let aspect_ratio = width as f32 / height as f32;
    if width >= height {
        let dest_height = (max_side as f32 / aspect_ratio).round() as u32;
        (max_side, dest_height.max(1))
    } else {
        let dest_width = (max_side as f32 * aspect_ratio).round() as u32;
        (dest_width.max(1), max_side)
    }
}

/// Decodes the whole image and scales it down for the tree's icon column.
pub fn make_thumbnail(path: &Path, max_side: u32) -> Result<ColorImage, ThumbnailError> {
    let name = file_name(path);

    let mut now = Instant::now();
    let buffer = fs::read(path).map_err(|e| ThumbnailError::Io(e, path.to_path_buf()))?;

    let format = ImageKind::detect(path, &buffer)
        .and_then(ImageKind::image_format)
        .ok_or_else(|| ThumbnailError::Unsupported(path.to_path_buf()))?;

    let img = ImageReader::with_format(Cursor::new(buffer), format)
        .decode()
        .map_err(|e| ThumbnailError::Decode(e, path.to_path_buf()))?;

    tracing::trace!("{name} -> Spent {}ms decoding thumbnail", now.elapsed().as_millis());
    now = Instant::now();

    let (dest_width, dest_height) = fit_within(img.width(), img.height(), max_side.max(1));
    let src_image = FirImage::from_vec_u8(
        img.width(),
        img.height(),
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ThumbnailError::Resize(e.to_string()))?;

    let mut dest_image = FirImage::new(dest_width, dest_height, src_image.pixel_type());

    // Resizer premultiplies alpha for U8x4 on its own
    Resizer::new()
        .resize(&src_image, &mut dest_image, &ResizeOptions::new())
        .map_err(|e| ThumbnailError::Resize(e.to_string()))?;

    tracing::trace!("{name} -> Spent {}ms resizing thumbnail", now.elapsed().as_millis());

    Ok(ColorImage::from_rgba_unmultiplied(
        [dest_width as usize, dest_height as usize],
        dest_image.buffer(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn fits_longest_side() {
        assert_eq!(fit_within(400, 200, 100), (100, 50));
        assert_eq!(fit_within(200, 400, 100), (50, 100));
        assert_eq!(fit_within(64, 32, 100), (64, 32));
        assert_eq!(fit_within(1000, 1, 100), (100, 1));
    }

    #[test]
    fn thumbnail_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(80, 40, Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let thumb = make_thumbnail(&path, 32).unwrap();

        assert_eq!(thumb.size, [32, 16]);
        assert_eq!(thumb.pixels[0].r(), 200);
    }

    #[test]
    fn unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"nope").unwrap();

        assert!(matches!(
            make_thumbnail(&path, 32),
            Err(ThumbnailError::Decode(..))
        ));
    }

    #[test]
    fn pcx_has_no_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.pcx");
        fs::write(&path, crate::formats::pcx::tests::sample_header(8, 3, 4, 4, 72)).unwrap();

        assert!(matches!(
            make_thumbnail(&path, 32),
            Err(ThumbnailError::Unsupported(_))
        ));
    }
}
