use super::{CapturedFrame, FrameEncoder};
use crate::config::CaptureConfig;
use crate::error::SessionError;
use crate::playback::{ReadyState, RenderSurface};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Grabs, encodes and validates one still frame per call
#[derive(Clone)]
pub struct FrameCapturer {
    encoder: Arc<dyn FrameEncoder>,
    quality: u8,
    min_frame_bytes: usize,
    min_ready: ReadyState,
}

impl FrameCapturer {
    pub fn new(encoder: Arc<dyn FrameEncoder>, config: &CaptureConfig) -> Self {
        Self {
            encoder,
            quality: config.jpeg_quality,
            min_frame_bytes: config.min_frame_bytes,
            min_ready: config.min_ready(),
        }
    }

    /// Capture the frame currently shown on `surface`
    ///
    /// Readiness and dimensions are checked before any pixel work; a failed
    /// check produces no buffer. Calls are independent and may be retried.
    pub async fn capture(&self, surface: &dyn RenderSurface) -> Result<CapturedFrame, SessionError> {
        let ready_state = surface.ready_state();
        if ready_state < self.min_ready {
            warn!(
                "Surface not ready for capture: {:?} (need {:?})",
                ready_state, self.min_ready
            );
            return Err(SessionError::SurfaceNotReady {
                details: format!(
                    "ready state {} below {}",
                    ready_state.ordinal(),
                    self.min_ready.ordinal()
                ),
            });
        }

        let (width, height) = surface.video_dimensions();
        if width == 0 || height == 0 {
            warn!("Surface has no dimensions: {}x{}", width, height);
            return Err(SessionError::SurfaceNotReady {
                details: format!("video dimensions are {}x{}", width, height),
            });
        }

        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        surface.copy_frame(&mut pixels)?;
        debug!("Copied {}x{} frame from surface", width, height);

        let encoded = self
            .encoder
            .encode(pixels, width, height, self.quality)
            .await?;

        if encoded.len() < self.min_frame_bytes {
            warn!(
                "Encoded photo too small: {} bytes (minimum {})",
                encoded.len(),
                self.min_frame_bytes
            );
            return Err(SessionError::EncodeFailed {
                details: format!(
                    "photo data is invalid or too small ({} bytes)",
                    encoded.len()
                ),
            });
        }

        info!(
            "Captured {}x{} photo ({} bytes, quality {})",
            width,
            height,
            encoded.len(),
            self.quality
        );
        Ok(CapturedFrame::new(encoded, width, height, self.quality))
    }
}
