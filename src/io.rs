use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageError, ImageFormat};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::PixelBuffer;
use crate::components::history::HistoryManager;
use crate::model::CanvasModel;

// ============================================================================
// ERRORS
// ============================================================================

/// Error type for file and encoding operations at the canvas boundary
#[derive(Debug)]
pub enum IoError {
    Io(std::io::Error),
    Image(ImageError),
    Session(String),
    BadMagic(String),
    DimensionMismatch { width: u32, height: u32, len: usize },
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "I/O error: {}", e),
            IoError::Image(e) => write!(f, "Image error: {}", e),
            IoError::Session(e) => write!(f, "Session error: {}", e),
            IoError::BadMagic(m) => write!(f, "Not a session file (magic {:?})", m),
            IoError::DimensionMismatch { width, height, len } => write!(
                f,
                "Pixel data of {} bytes does not match {}x{}",
                len, width, height
            ),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e)
    }
}

impl From<ImageError> for IoError {
    fn from(e: ImageError) -> Self {
        IoError::Image(e)
    }
}

impl From<Box<bincode::ErrorKind>> for IoError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        IoError::Session(e.to_string())
    }
}

// ============================================================================
// PNG (remote service boundary + file export)
// ============================================================================

/// Encode a buffer as an RGBA8 PNG.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, IoError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new(&mut out);
    #[allow(deprecated)]
    encoder.encode(
        buffer.as_raw(),
        buffer.width(),
        buffer.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(out)
}

/// Decode PNG bytes, normalizing any color type to RGBA8.
pub fn decode_png(bytes: &[u8]) -> Result<PixelBuffer, IoError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    Ok(PixelBuffer::from_image(&image))
}

/// Load any supported raster file (format guessed from content).
pub fn load_image_sync(path: &Path) -> Result<PixelBuffer, IoError> {
    let reader = image::io::Reader::open(path)?.with_guessed_format()?;
    let image = reader.decode()?;
    crate::log_info!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(PixelBuffer::from_image(&image))
}

/// Write a buffer to disk; the format follows the extension (PNG when
/// missing or unknown). JPEG output drops the alpha channel.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<(), IoError> {
    let format = path
        .extension()
        .and_then(|e| ImageFormat::from_extension(e))
        .unwrap_or(ImageFormat::Png);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let image = DynamicImage::ImageRgba8(buffer.as_rgba_image().clone());
    match format {
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut writer, format)?;
        }
        ImageFormat::Png | ImageFormat::Bmp => {
            image.write_to(&mut writer, format)?;
        }
        _ => {
            image.write_to(&mut writer, ImageFormat::Png)?;
        }
    }
    crate::log_info!("Saved {}", path.display());
    Ok(())
}

// ============================================================================
// PXS SESSION FILE FORMAT
// ============================================================================

/// Magic header for session files
const PXS_MAGIC_V1: &str = "PXS1";

/// One serialized buffer (snapshots may differ in size after raw loads)
#[derive(Serialize, Deserialize)]
struct SessionImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SessionImage {
    fn capture(buffer: &PixelBuffer) -> Self {
        Self {
            width: buffer.width(),
            height: buffer.height(),
            pixels: buffer.as_raw().to_vec(),
        }
    }

    fn restore(self) -> Result<PixelBuffer, IoError> {
        let (width, height, len) = (self.width, self.height, self.pixels.len());
        PixelBuffer::from_raw(width, height, self.pixels)
            .ok_or(IoError::DimensionMismatch { width, height, len })
    }
}

/// Serializable canvas session: live buffer plus both history stacks
#[derive(Serialize, Deserialize)]
struct SessionFile {
    magic: String,
    max_undo: u32,
    current: SessionImage,
    /// Oldest first
    undo: Vec<SessionImage>,
    /// Oldest first
    redo: Vec<SessionImage>,
}

/// Save the canvas with its undo/redo history as a `.pxs` session file.
pub fn save_session(model: &CanvasModel, path: &Path) -> Result<(), IoError> {
    let history = model.history();
    let session = SessionFile {
        magic: PXS_MAGIC_V1.to_string(),
        max_undo: history.capacity() as u32,
        current: SessionImage::capture(model.image()),
        undo: history.undo_snapshots().map(SessionImage::capture).collect(),
        redo: history.redo_snapshots().map(SessionImage::capture).collect(),
    };
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &session)?;
    crate::log_info!(
        "Saved session {} ({} undo, {} redo)",
        path.display(),
        session.undo.len(),
        session.redo.len()
    );
    Ok(())
}

/// Load a `.pxs` session file.
pub fn load_session(path: &Path) -> Result<CanvasModel, IoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let session: SessionFile = bincode::deserialize_from(reader)?;
    session_to_model(session)
}

/// Decode a session from memory.
pub fn load_session_bytes(bytes: &[u8]) -> Result<CanvasModel, IoError> {
    let session: SessionFile = bincode::deserialize_from(Cursor::new(bytes))?;
    session_to_model(session)
}

fn session_to_model(session: SessionFile) -> Result<CanvasModel, IoError> {
    if session.magic != PXS_MAGIC_V1 {
        return Err(IoError::BadMagic(session.magic));
    }
    let current = session.current.restore()?;
    let undo = session
        .undo
        .into_iter()
        .map(SessionImage::restore)
        .collect::<Result<Vec<_>, _>>()?;
    let redo = session
        .redo
        .into_iter()
        .map(SessionImage::restore)
        .collect::<Result<Vec<_>, _>>()?;
    let history = HistoryManager::from_parts(session.max_undo as usize, undo, redo);
    Ok(CanvasModel::from_parts(current, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, Pen, Point};
    use image::Rgba;

    fn temp_path(ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pix_io_{}.{}", uuid::Uuid::new_v4(), ext))
    }

    #[test]
    fn png_preserves_every_channel() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.set_pixel(0, 0, Rgba([1, 2, 3, 4]));
        buf.set_pixel(2, 1, Rgba([250, 0, 128, 0]));
        let decoded = decode_png(&encode_png(&buf).unwrap()).unwrap();
        assert_eq!(decoded, buf);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_png(b"not a png"), Err(IoError::Image(_))));
    }

    #[test]
    fn file_save_and_load() {
        let path = temp_path("png");
        let mut buf = PixelBuffer::new(4, 4);
        buf.set_pixel(1, 2, BLACK);
        save_image(&buf, &path).unwrap();
        assert_eq!(load_image_sync(&path).unwrap(), buf);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn truncated_session_is_a_session_error() {
        assert!(matches!(load_session_bytes(&[1, 2, 3]), Err(IoError::Session(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_image_sync(&temp_path("png")).unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn session_keeps_history() {
        let mut model = CanvasModel::with_capacity(5, 5, 4);
        model.save_state();
        model.draw_point(Point::new(1, 1), &Pen::new(BLACK, 1));
        model.save_state();
        model.draw_point(Point::new(3, 3), &Pen::new(BLACK, 1));
        model.undo();

        let path = temp_path("pxs");
        save_session(&model, &path).unwrap();
        let mut restored = load_session(&path).unwrap();
        let _ = std::fs::remove_file(path);

        assert_eq!(restored.image(), model.image());
        assert_eq!(restored.history().capacity(), 4);
        assert_eq!(restored.history().undo_len(), 1);
        assert!(restored.can_redo());
        restored.redo();
        assert_eq!(restored.image().get_pixel(3, 3), Some(BLACK));
        restored.undo();
        restored.undo();
        assert_eq!(restored.image().count_color(BLACK), 0);
    }

    #[test]
    fn session_with_wrong_magic_is_rejected() {
        let session = SessionFile {
            magic: "NOPE".to_string(),
            max_undo: 10,
            current: SessionImage::capture(&PixelBuffer::new(1, 1)),
            undo: Vec::new(),
            redo: Vec::new(),
        };
        let bytes = bincode::serialize(&session).unwrap();
        assert!(matches!(
            load_session_bytes(&bytes),
            Err(IoError::BadMagic(_))
        ));
    }

    #[test]
    fn session_with_short_pixels_is_rejected() {
        let session = SessionFile {
            magic: PXS_MAGIC_V1.to_string(),
            max_undo: 10,
            current: SessionImage { width: 4, height: 4, pixels: vec![0; 3] },
            undo: Vec::new(),
            redo: Vec::new(),
        };
        let bytes = bincode::serialize(&session).unwrap();
        assert!(matches!(
            load_session_bytes(&bytes),
            Err(IoError::DimensionMismatch { width: 4, height: 4, len: 3 })
        ));
    }
}
