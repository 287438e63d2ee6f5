use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response body is empty")]
    Empty,

    #[error("unrecognised image format")]
    UnknownFormat,

    #[error("malformed {format} data: {message}")]
    Malformed { format: String, message: String },
}

/// A downloaded still: the bytes as received plus the decoded pixels.
///
/// The source bytes are kept so saving writes exactly what the camera sent
/// instead of re-encoding.
#[derive(Clone)]
pub struct GrabbedImage {
    bytes: Bytes,
    format: ImageFormat,
    pixels: DynamicImage,
}

impl GrabbedImage {
    /// Decode an in-memory image.
    ///
    /// Decoding is best-effort: webcams regularly cut the tail off a JPEG,
    /// and a stream that stops early still decodes, with whatever rows are
    /// missing left blank.
    pub fn decode(bytes: impl Into<Bytes>) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let format = image::guess_format(&bytes).map_err(|_| DecodeError::UnknownFormat)?;
        let pixels = image::load_from_memory_with_format(&bytes, format)
            .map_err(|err| malformed(format, &err))?;

        Ok(Self {
            bytes,
            format,
            pixels,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Preferred file extension for the source format (`"jpg"`, `"png"`, ...).
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

impl fmt::Debug for GrabbedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("GrabbedImage")
            .field("format", &self.format)
            .field("size", &self.bytes.len())
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

fn malformed(format: ImageFormat, err: &image::ImageError) -> DecodeError {
    DecodeError::Malformed {
        format: format!("{format:?}").to_lowercase(),
        message: err.to_string(),
    }
}
