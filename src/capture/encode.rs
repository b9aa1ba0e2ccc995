use crate::error::SessionError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use tracing::trace;

/// Turns a raw RGB8 frame into a compact image artifact
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    async fn encode(
        &self,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, SessionError>;
}

/// JPEG encoder running on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegFrameEncoder;

impl JpegFrameEncoder {
    fn encode_blocking(
        pixels: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, SessionError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(SessionError::EncodeFailed {
                details: format!("expected {} RGB bytes, got {}", expected, pixels.len()),
            });
        }

        let mut out = Vec::with_capacity(pixels.len() / 8);
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(pixels, width, height, ColorType::Rgb8)
            .map_err(|e| SessionError::EncodeFailed {
                details: e.to_string(),
            })?;
        trace!("Encoded {}x{} frame into {} bytes", width, height, out.len());
        Ok(out)
    }
}

#[async_trait]
impl FrameEncoder for JpegFrameEncoder {
    async fn encode(
        &self,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, SessionError> {
        tokio::task::spawn_blocking(move || Self::encode_blocking(&pixels, width, height, quality))
            .await
            .map_err(|e| SessionError::EncodeFailed {
                details: format!("encoder task failed: {}", e),
            })?
    }
}
