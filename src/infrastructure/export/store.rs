//! Writes composed images to the export directory.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageResult, Rgb, RgbImage, RgbaImage};
use tracing::{debug, info, warn};

use crate::domain::errors::ExportError;

/// Name of the export directory under the cache root.
pub const EXPORT_DIR_NAME: &str = "Exports";

/// File name prefix used when none is configured.
pub const DEFAULT_EXPORT_PREFIX: &str = "lenso_export_";

/// JPEG quality for exported images.
pub const JPEG_QUALITY: u8 = 90;

/// Suffixes tried when exports land in the same second.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Encoded export ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExport {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// File extension matching the encoding.
    pub extension: &'static str,
}

/// Saves exported images as `<prefix><unix_ts>.jpg`, or `.png` when JPEG fails.
///
/// Existing files are never replaced: a second export in the same second becomes
/// `<prefix><unix_ts>_1.jpg`, then `_2` and so on.
#[derive(Debug, Clone)]
pub struct ExportStore {
    export_dir: PathBuf,
    prefix: String,
}

impl ExportStore {
    /// Creates a store writing into `export_dir`.
    #[must_use]
    pub fn new(export_dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            export_dir,
            prefix: prefix.into(),
        }
    }

    /// Returns the export directory.
    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Returns the file name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encodes and writes `image`, returning the final path.
    ///
    /// Blocking; run it on a blocking task from async code.
    ///
    /// # Errors
    /// Returns `EncodeFailed` if neither JPEG nor PNG encoding works, or `Io` if the
    /// file cannot be written. Nothing is left on disk in either case.
    pub fn save(&self, image: &RgbaImage) -> Result<PathBuf, ExportError> {
        let encoded = encode_with_fallback(image, encode_jpeg, encode_png)?;
        std::fs::create_dir_all(&self.export_dir)?;

        let path = self.persist_unique(&encoded.bytes, encoded.extension, Utc::now().timestamp())?;
        info!(path = %path.display(), size = encoded.bytes.len(), "Exported image");
        Ok(path)
    }

    /// Writes `bytes` to a temporary file and moves it to the first free export name.
    fn persist_unique(&self, bytes: &[u8], extension: &str, stamp: i64) -> std::io::Result<PathBuf> {
        let mut temp_file = tempfile::NamedTempFile::new_in(&self.export_dir)?;
        temp_file.write_all(bytes)?;
        temp_file.flush()?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}{stamp}.{extension}", self.prefix)
            } else {
                format!("{}{stamp}_{attempt}.{extension}", self.prefix)
            };
            let path = self.export_dir.join(file_name);
            match temp_file.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Export name taken");
                    temp_file = e.file;
                }
                Err(e) => return Err(e.error),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free export name for {}{stamp}", self.prefix),
        ))
    }
}

/// Tries `primary` (JPEG) and falls back to `fallback` (PNG).
pub(crate) fn encode_with_fallback(
    image: &RgbaImage,
    primary: impl FnOnce(&RgbaImage) -> ImageResult<Vec<u8>>,
    fallback: impl FnOnce(&RgbaImage) -> ImageResult<Vec<u8>>,
) -> Result<EncodedExport, ExportError> {
    let jpeg_err = match primary(image) {
        Ok(bytes) => {
            return Ok(EncodedExport {
                bytes,
                extension: "jpg",
            });
        }
        Err(e) => e,
    };
    warn!(error = %jpeg_err, "JPEG encoding failed, falling back to PNG");

    match fallback(image) {
        Ok(bytes) => Ok(EncodedExport {
            bytes,
            extension: "png",
        }),
        Err(png_err) => Err(ExportError::encode_failed(
            jpeg_err.to_string(),
            png_err.to_string(),
        )),
    }
}

/// Drops alpha by compositing over black.
fn flatten_alpha(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let scale = |c: u8| {
            let v = u16::from(c) * u16::from(a) + 127;
            u8::try_from(v / 255).unwrap_or(u8::MAX)
        };
        Rgb([scale(r), scale(g), scale(b)])
    })
}

fn encode_jpeg(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let rgb = flatten_alpha(image);
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    debug!(size = out.len(), "Encoded JPEG");
    Ok(out)
}

fn encode_png(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut out))?;
    debug!(size = out.len(), "Encoded PNG");
    Ok(out)
}
