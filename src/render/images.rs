//! Transient staging of embedded images for the PDF writer.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tempfile::TempDir;

use crate::detect::sniff_image_format;
use crate::error::{Error, Result};
use crate::model::ImageContent;

/// An image written to the staging directory and decoded for embedding.
#[derive(Debug)]
pub struct StagedImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

/// Per-invocation directory for image files.
///
/// Files are named `{token}-{page}-{block}.{ext}`. The directory and its
/// contents are removed when the stager is dropped or closed.
#[derive(Debug)]
pub struct ImageStager {
    dir: TempDir,
    token: String,
}

impl ImageStager {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pdftrans-images-").tempdir()?;
        let token = chrono::Utc::now().timestamp_micros().to_string();
        Ok(Self { dir, token })
    }

    /// Staging directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write and decode one image.
    ///
    /// Returns `Ok(None)` when the byte stream is not a recognized raster
    /// format or cannot be decoded; the block is then skipped.
    pub fn stage(&self, page: usize, block: usize, image: &ImageContent) -> Result<Option<StagedImage>> {
        let Some(format) = sniff_image_format(&image.data) else {
            log::warn!(
                "Skipping image {} on page {}: unrecognized format",
                block,
                page + 1
            );
            return Ok(None);
        };

        let path = self.dir.path().join(format!(
            "{}-{}-{}.{}",
            self.token,
            page,
            block,
            format.extension()
        ));
        fs::write(&path, &image.data)?;

        match image::open(&path) {
            Ok(decoded) => Ok(Some(StagedImage {
                path,
                pixels: decoded.to_rgb8(),
            })),
            Err(e) => {
                log::warn!(
                    "Skipping image {} on page {}: {}",
                    block,
                    page + 1,
                    Error::from(e)
                );
                Ok(None)
            }
        }
    }

    /// Remove the staging directory, reporting any failure.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_stage_png() {
        let stager = ImageStager::new().unwrap();
        let image = ImageContent::new(png_bytes(), 40.0, 20.0, 500.0);
        let staged = stager.stage(0, 3, &image).unwrap().unwrap();

        assert!(staged.path.exists());
        assert!(staged.path.file_name().unwrap().to_string_lossy().ends_with("-0-3.png"));
        assert_eq!(staged.pixels.dimensions(), (4, 2));
    }

    #[test]
    fn test_unrecognized_bytes_skipped() {
        let stager = ImageStager::new().unwrap();
        let image = ImageContent::new(vec![0, 1, 2, 3], 10.0, 10.0, 500.0);
        assert!(stager.stage(0, 0, &image).unwrap().is_none());
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let stager = ImageStager::new().unwrap();
        let dir = stager.dir().to_path_buf();
        stager
            .stage(1, 0, &ImageContent::new(png_bytes(), 4.0, 2.0, 0.0))
            .unwrap();
        assert!(dir.exists());
        drop(stager);
        assert!(!dir.exists());
    }
}
