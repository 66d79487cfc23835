use arboard::{Clipboard as Arboard, ImageData};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use crate::clip::{ClipContent, ClipType};
use crate::{ClipSyncError, Result};

/// Clipboard value in its local form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Raw RGBA pixels, not yet encoded for transport.
    Image {
        width: usize,
        height: usize,
        rgba: Vec<u8>,
    },
}

/// What was on the clipboard at one read.
///
/// Images stay as pixels until `into_content` is called, so comparing
/// fingerprints never pays for a PNG encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub payload: Payload,
    /// Identity used for change detection. Two reads of the same clipboard
    /// value yield the same fingerprint.
    pub fingerprint: String,
}

impl Snapshot {
    pub fn text(text: impl Into<String>) -> Self {
        let content = ClipContent::text(text);
        Self {
            fingerprint: content.fingerprint(),
            payload: Payload::Text(content.data),
        }
    }

    pub fn image(width: usize, height: usize, rgba: Vec<u8>) -> Self {
        Self {
            fingerprint: pixel_fingerprint(width, height, &rgba),
            payload: Payload::Image {
                width,
                height,
                rgba,
            },
        }
    }

    /// Local form of a wire clip; images are decoded to pixels.
    pub fn from_content(content: &ClipContent) -> Result<Self> {
        match content.clip_type {
            ClipType::Text => Ok(Self::text(content.data.as_str())),
            ClipType::Image => {
                let (width, height, rgba) = decode_image(&content.data)?;
                Ok(Self::image(width, height, rgba))
            }
        }
    }

    pub fn clip_type(&self) -> ClipType {
        match self.payload {
            Payload::Text(_) => ClipType::Text,
            Payload::Image { .. } => ClipType::Image,
        }
    }

    /// Transport form: text as is, images as base64 PNG.
    pub fn into_content(self) -> Result<ClipContent> {
        match self.payload {
            Payload::Text(text) => Ok(ClipContent::text(text)),
            Payload::Image {
                width,
                height,
                rgba,
            } => Ok(ClipContent::image(encode_png(width, height, rgba)?)),
        }
    }
}

/// Access to a local clipboard.
pub trait ClipboardBackend: Send + Sync {
    /// Current clipboard value, `None` when empty or not text/image.
    fn read(&self) -> Result<Option<Snapshot>>;

    /// Places `content` on the clipboard and returns the fingerprint that
    /// a following `read` will report for it.
    fn write(&self, content: &ClipContent) -> Result<String>;
}

/// System clipboard through arboard.
pub struct ClipboardManager {
    clipboard: Arc<Mutex<Arboard>>,
}

impl ClipboardManager {
    pub fn new() -> Result<Self> {
        let clipboard = Arboard::new().map_err(|e| ClipSyncError::Clipboard(e.to_string()))?;

        Ok(Self {
            clipboard: Arc::new(Mutex::new(clipboard)),
        })
    }
}

impl ClipboardBackend for ClipboardManager {
    fn read(&self) -> Result<Option<Snapshot>> {
        let mut clipboard = self
            .clipboard
            .lock()
            .map_err(|e| ClipSyncError::Clipboard(format!("Lock error: {e}")))?;

        // Try to get image first (more specific)
        if let Ok(image_data) = clipboard.get_image() {
            return Ok(Some(Snapshot::image(
                image_data.width,
                image_data.height,
                image_data.bytes.into_owned(),
            )));
        }

        if let Ok(text) = clipboard.get_text() {
            return Ok(Some(Snapshot::text(text)));
        }

        Ok(None)
    }

    fn write(&self, content: &ClipContent) -> Result<String> {
        // Decode before touching the clipboard so bad image data leaves it alone.
        let snapshot = Snapshot::from_content(content)?;

        let mut clipboard = self
            .clipboard
            .lock()
            .map_err(|e| ClipSyncError::Clipboard(format!("Lock error: {e}")))?;

        match snapshot.payload {
            Payload::Text(text) => clipboard
                .set_text(text)
                .map_err(|e| ClipSyncError::Clipboard(e.to_string()))?,
            Payload::Image {
                width,
                height,
                rgba,
            } => clipboard
                .set_image(ImageData {
                    width,
                    height,
                    bytes: Cow::Owned(rgba),
                })
                .map_err(|e| ClipSyncError::Clipboard(e.to_string()))?,
        }

        Ok(snapshot.fingerprint)
    }
}

/// Reads the clipboard off the async runtime; backends may block.
pub async fn read_clipboard<C>(clipboard: Arc<C>) -> Result<Option<Snapshot>>
where
    C: ClipboardBackend + ?Sized + 'static,
{
    tokio::task::spawn_blocking(move || clipboard.read())
        .await
        .map_err(|e| ClipSyncError::Clipboard(format!("Task join error: {e}")))?
}

pub async fn write_clipboard<C>(clipboard: Arc<C>, content: ClipContent) -> Result<String>
where
    C: ClipboardBackend + ?Sized + 'static,
{
    tokio::task::spawn_blocking(move || clipboard.write(&content))
        .await
        .map_err(|e| ClipSyncError::Clipboard(format!("Task join error: {e}")))?
}

/// Decodes base64 image data (PNG, or anything `image` recognises) to RGBA.
pub fn decode_image(base64_data: &str) -> Result<(usize, usize, Vec<u8>)> {
    let bytes = BASE64.decode(base64_data.trim())?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width as usize, height as usize, rgba.into_raw()))
}

/// Encodes RGBA pixels as base64 PNG.
pub fn encode_png(width: usize, height: usize, rgba: Vec<u8>) -> Result<String> {
    let img = RgbaImage::from_raw(width as u32, height as u32, rgba).ok_or_else(|| {
        ClipSyncError::ImageProcessing(image::ImageError::Limits(
            image::error::LimitError::from_kind(image::error::LimitErrorKind::DimensionError),
        ))
    })?;

    let mut png_bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(BASE64.encode(&png_bytes))
}

/// Fingerprint over decoded pixels, independent of how the PNG was encoded.
pub fn pixel_fingerprint(width: usize, height: usize, rgba: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"pixels:");
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(rgba);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_base64(width: u32, height: u32, pixel: [u8; 4]) -> String {
        let img = RgbaImage::from_pixel(width, height, image::Rgba(pixel));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        BASE64.encode(&png)
    }

    #[test]
    fn test_decode_image_dimensions() {
        let (w, h, rgba) = decode_image(&png_base64(3, 2, [255, 0, 0, 255])).unwrap();
        assert_eq!((w, h), (3, 2));
        assert_eq!(rgba.len(), 3 * 2 * 4);
        assert_eq!(&rgba[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image("!!not base64!!"),
            Err(ClipSyncError::Decode(_))
        ));
        assert!(matches!(
            decode_image(&BASE64.encode(b"not an image")),
            Err(ClipSyncError::ImageProcessing(_))
        ));
    }

    #[test]
    fn test_pixel_fingerprint_ignores_encoding() {
        let (w, h, rgba) = decode_image(&png_base64(4, 4, [1, 2, 3, 255])).unwrap();
        let a = pixel_fingerprint(w, h, &rgba);
        let b = pixel_fingerprint(4, 4, &[1u8, 2, 3, 255].repeat(16));
        assert_eq!(a, b);
        assert_ne!(a, pixel_fingerprint(2, 8, &rgba));
    }

    #[test]
    fn test_image_snapshot_encodes_on_demand() {
        let rgba = [9u8, 8, 7, 255].repeat(6);
        let snapshot = Snapshot::image(3, 2, rgba.clone());
        assert_eq!(snapshot.clip_type(), ClipType::Image);
        assert_eq!(snapshot.fingerprint, pixel_fingerprint(3, 2, &rgba));

        let content = snapshot.into_content().unwrap();
        assert_eq!(content.clip_type, ClipType::Image);
        assert_eq!(decode_image(&content.data).unwrap(), (3, 2, rgba));
    }

    #[test]
    fn test_snapshot_from_content_matches_read_fingerprint() {
        let content = ClipContent::image(png_base64(2, 2, [5, 5, 5, 255]));
        let snapshot = Snapshot::from_content(&content).unwrap();
        assert_eq!(
            snapshot.fingerprint,
            Snapshot::image(2, 2, [5u8, 5, 5, 255].repeat(4)).fingerprint
        );

        let text = Snapshot::from_content(&ClipContent::text("hi")).unwrap();
        assert_eq!(text, Snapshot::text("hi"));
        assert_eq!(text.fingerprint, ClipContent::text("hi").fingerprint());
    }

    #[test]
    fn test_encode_rejects_short_pixel_buffer() {
        assert!(matches!(
            encode_png(4, 4, vec![0; 3]),
            Err(ClipSyncError::ImageProcessing(_))
        ));
    }
}
