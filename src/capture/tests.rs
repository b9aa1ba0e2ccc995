use super::*;
use crate::config::CaptureConfig;
use crate::device::{Constraints, DeviceCapabilityService, DeviceHandle, Facing};
use crate::error::SessionError;
use crate::playback::{ReadyState, RenderSurface};
use crate::sim::{SimulatedCamera, SimulatedSurface, SurfaceBehavior};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Returns a fixed, tiny payload and counts calls
#[derive(Default)]
struct TinyEncoder {
    calls: AtomicUsize,
}

#[async_trait]
impl FrameEncoder for TinyEncoder {
    async fn encode(
        &self,
        _pixels: Vec<u8>,
        _width: u32,
        _height: u32,
        _quality: u8,
    ) -> Result<Vec<u8>, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

async fn playing_surface(camera: &SimulatedCamera) -> (Arc<SimulatedSurface>, DeviceHandle) {
    let handle = camera
        .request(&Constraints::new(Facing::User, 1280, 720))
        .await
        .unwrap();
    let surface = Arc::new(SimulatedSurface::new(SurfaceBehavior {
        ready_after: None,
        reject_play: false,
    }));
    surface.attach(&handle);
    surface.play().await.unwrap();
    (surface, handle)
}

fn jpeg_capturer() -> FrameCapturer {
    FrameCapturer::new(Arc::new(JpegFrameEncoder), &CaptureConfig::default())
}

#[tokio::test]
async fn test_capture_encodes_jpeg_at_stream_size() {
    let camera = SimulatedCamera::new(vec![(1280, 720)]);
    let (surface, mut handle) = playing_surface(&camera).await;

    let frame = jpeg_capturer().capture(surface.as_ref()).await.unwrap();

    assert_eq!((frame.width(), frame.height()), (1280, 720));
    assert!(frame.byte_len() >= 100);
    assert_eq!(&frame.data()[..2], &[0xFF, 0xD8]);
    assert_eq!(frame.quality(), 85);
    assert_eq!(frame.mime_type(), "image/jpeg");
    assert!(frame.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));

    handle.release();
}

#[tokio::test]
async fn test_zero_width_is_not_ready() {
    let camera = SimulatedCamera::new(vec![(1280, 720)]);
    let (surface, mut handle) = playing_surface(&camera).await;
    surface.force_dimensions(0, 720);

    let encoder = Arc::new(TinyEncoder::default());
    let capturer = FrameCapturer::new(encoder.clone(), &CaptureConfig::default());

    let result = capturer.capture(surface.as_ref()).await;
    assert!(matches!(result, Err(SessionError::SurfaceNotReady { .. })));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);

    handle.release();
}

#[tokio::test]
async fn test_low_ready_state_is_not_ready() {
    let camera = SimulatedCamera::new(vec![(1280, 720)]);
    let (surface, mut handle) = playing_surface(&camera).await;
    surface.force_ready_state(ReadyState::HaveMetadata);

    let result = jpeg_capturer().capture(surface.as_ref()).await;
    match result {
        Err(SessionError::SurfaceNotReady { details }) => {
            assert!(details.contains("below 2"));
        }
        other => panic!("Expected SurfaceNotReady, got {:?}", other.map(|f| f.byte_len())),
    }

    handle.release();
}

#[tokio::test]
async fn test_unbound_surface_is_not_ready() {
    let surface = SimulatedSurface::default();
    let result = jpeg_capturer().capture(&surface).await;
    assert!(matches!(result, Err(SessionError::SurfaceNotReady { .. })));
}

#[tokio::test]
async fn test_undersized_encoding_is_rejected() {
    let camera = SimulatedCamera::new(vec![(1280, 720)]);
    let (surface, mut handle) = playing_surface(&camera).await;

    let encoder = Arc::new(TinyEncoder::default());
    let capturer = FrameCapturer::new(encoder.clone(), &CaptureConfig::default());

    match capturer.capture(surface.as_ref()).await {
        Err(SessionError::EncodeFailed { details }) => {
            assert!(details.contains("too small"));
        }
        other => panic!("Expected EncodeFailed, got {:?}", other.map(|f| f.byte_len())),
    }
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);

    handle.release();
}

#[tokio::test]
async fn test_threshold_is_configurable() {
    let camera = SimulatedCamera::new(vec![(1280, 720)]);
    let (surface, mut handle) = playing_surface(&camera).await;

    let config = CaptureConfig {
        min_frame_bytes: 4,
        ..CaptureConfig::default()
    };
    let capturer = FrameCapturer::new(Arc::new(TinyEncoder::default()), &config);

    let frame = capturer.capture(surface.as_ref()).await.unwrap();
    assert_eq!(frame.byte_len(), 4);

    handle.release();
}

#[tokio::test]
async fn test_captures_are_independent() {
    let camera = SimulatedCamera::new(vec![(640, 480)]);
    let (surface, mut handle) = playing_surface(&camera).await;
    let capturer = jpeg_capturer();

    let first = capturer.capture(surface.as_ref()).await.unwrap();
    let second = capturer.capture(surface.as_ref()).await.unwrap();

    assert_eq!((first.width(), first.height()), (640, 480));
    assert_eq!((second.width(), second.height()), (640, 480));
    assert!(second.captured_at() >= first.captured_at());

    handle.release();
}

#[tokio::test]
async fn test_jpeg_encoder_rejects_short_buffer() {
    let result = JpegFrameEncoder.encode(vec![0u8; 10], 64, 64, 85).await;
    assert!(matches!(result, Err(SessionError::EncodeFailed { .. })));
}
