use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Encoded still photo taken from the camera
///
/// Immutable once built; the bytes are shared, so clones are cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
    quality: u8,
    captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, quality: u8) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
            quality,
            captured_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    /// Self-contained `data:` URL, the form the visitor service accepts
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(self.data()))
    }
}
