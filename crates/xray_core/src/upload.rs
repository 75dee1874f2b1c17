use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Longest edge of the decoded preview, in pixels.
pub const PREVIEW_SIZE: u32 = 768;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Reasons a file cannot become an [`UploadedImage`].
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error("Image file is empty: {0}")]
    Empty(String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode {name}: {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },
}

/// Container format of an uploaded radiograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Dicom,
}

impl ImageFormat {
    /// Format by file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|s| s.to_str())?;
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "dcm" | "dicom" => Some(Self::Dicom),
            _ => None,
        }
    }

    /// Content type sent with the multipart upload.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Dicom => "application/dicom",
        }
    }
}

/// Extensions offered by file pickers.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "dcm", "dicom"];

/// A selected radiograph: the raw bytes sent to inference plus a preview.
///
/// The preview lives exactly as long as the handle, so replacing or clearing
/// the selection releases it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    id: u64,
    name: String,
    format: ImageFormat,
    bytes: Arc<[u8]>,
    preview: Option<Arc<RgbaImage>>,
}

impl UploadedImage {
    /// Read and decode an image file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if ImageFormat::from_path(path).is_none() {
            return Err(ImageError::Unsupported(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(name, bytes)
    }

    /// Build an image from bytes already in memory (drag and drop).
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let name = name.into();
        let format = ImageFormat::from_path(Path::new(&name))
            .ok_or_else(|| ImageError::Unsupported(PathBuf::from(&name)))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty(name));
        }

        let preview = match format {
            // No DICOM decoder; the report still works without a preview.
            ImageFormat::Dicom => None,
            ImageFormat::Png | ImageFormat::Jpeg => {
                let img = image::load_from_memory(&bytes).map_err(|source| ImageError::Decode {
                    name: name.clone(),
                    source,
                })?;
                let thumb = if img.width() > PREVIEW_SIZE || img.height() > PREVIEW_SIZE {
                    img.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE)
                } else {
                    img
                };
                Some(Arc::new(thumb.to_rgba8()))
            }
        };

        let id = NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("loaded image {name} ({} bytes, id {id})", bytes.len());
        Ok(Self {
            id,
            name,
            format,
            bytes: bytes.into(),
            preview,
        })
    }

    /// Unique per selection; two loads of the same file get different ids.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// File name as picked or dropped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container format, from the file extension.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Raw file contents, sent unchanged to the backend.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Downscaled RGBA preview; `None` for DICOM.
    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img: RgbaImage = ImageBuffer::from_pixel(w, h, Rgba([90, 90, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn png_gets_a_preview() -> Result<()> {
        let img = UploadedImage::from_bytes("chest.PNG", png_bytes(16, 8))?;
        assert_eq!(img.format(), ImageFormat::Png);
        let preview = img.preview().expect("preview");
        assert_eq!(preview.dimensions(), (16, 8));
        Ok(())
    }

    #[test]
    fn large_images_are_downscaled_for_preview() -> Result<()> {
        let img = UploadedImage::from_bytes("big.png", png_bytes(PREVIEW_SIZE * 2, PREVIEW_SIZE))?;
        let (w, h) = img.preview().expect("preview").dimensions();
        assert!(w <= PREVIEW_SIZE && h <= PREVIEW_SIZE);
        Ok(())
    }

    #[test]
    fn dicom_is_accepted_without_preview() -> Result<()> {
        let img = UploadedImage::from_bytes("study.dcm", vec![0u8; 132])?;
        assert_eq!(img.format(), ImageFormat::Dicom);
        assert!(img.preview().is_none());
        assert_eq!(img.bytes().len(), 132);
        Ok(())
    }

    #[test]
    fn rejects_unsupported_and_empty_input() {
        assert!(matches!(
            UploadedImage::from_bytes("notes.txt", vec![1, 2, 3]),
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("chest.png", Vec::new()),
            Err(ImageError::Empty(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("chest.jpg", vec![1, 2, 3]),
            Err(ImageError::Decode { .. })
        ));
    }

    #[test]
    fn every_accepted_extension_is_offered_by_the_picker() {
        for ext in ["png", "PNG", "jpg", "jpeg", "dcm", "dicom", "DICOM"] {
            let path = PathBuf::from(format!("scan.{ext}"));
            assert!(ImageFormat::from_path(&path).is_some(), "{ext}");
            assert!(
                SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
                "{ext}"
            );
        }
        assert!(ImageFormat::from_path(Path::new("scan.gif")).is_none());
    }

    #[test]
    fn dicom_long_extension_is_accepted() -> Result<()> {
        let img = UploadedImage::from_bytes("study.dicom", vec![0u8; 16])?;
        assert_eq!(img.format(), ImageFormat::Dicom);
        Ok(())
    }

    #[test]
    fn from_path_reads_file_and_assigns_fresh_ids() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.png");
        fs::write(&path, png_bytes(4, 4))?;

        let a = UploadedImage::from_path(&path)?;
        let b = UploadedImage::from_path(&path)?;
        assert_eq!(a.name(), "scan.png");
        assert_ne!(a.id(), b.id());
        assert!(matches!(
            UploadedImage::from_path(dir.path().join("missing.png")),
            Err(ImageError::Read { .. })
        ));
        Ok(())
    }
}
