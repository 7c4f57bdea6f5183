// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading card photos and writing rectified cards, using the `image` crate.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use scantron_core::error::{GradeError, Result};
use tracing::{debug, info, instrument};

/// Load a card photo from a file. The format is inferred from its contents.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GradeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let img = image::open(path).map_err(|err| {
        GradeError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    info!(width = img.width(), height = img.height(), "Card image loaded");
    Ok(img)
}

/// Decode a card photo from raw encoded bytes (JPEG, PNG, TIFF, etc.).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| GradeError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(width = img.width(), height = img.height(), "Card image decoded");
    Ok(img)
}

/// Encode an image as PNG bytes.
pub fn to_png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| GradeError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Write an image to a file. The format is inferred from the file extension.
pub fn save_image(image: &DynamicImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.save(path).map_err(|err| {
        GradeError::ImageError(format!("failed to save image to {}: {}", path.display(), err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 10, 10])))
    }

    #[test]
    fn png_bytes_decode_back_to_same_size() {
        let bytes = to_png_bytes(&sample()).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, GradeError::ImageError(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_image(dir.path().join("nope.png")).unwrap_err();
        match err {
            GradeError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn save_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        save_image(&sample(), &path).unwrap();
        let loaded = open_image(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 6));
    }
}
