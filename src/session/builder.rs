use super::CaptureSession;
use crate::capture::{FrameCapturer, FrameEncoder, JpegFrameEncoder};
use crate::config::KioskConfig;
use crate::device::{DeviceAcquirer, DeviceCapabilityService};
use crate::error::{KioskError, Result};
use crate::events::{EventBus, NotificationSink};
use crate::playback::{PlaybackCoordinator, RenderSurface};
use std::sync::Arc;

/// Builder wiring the four session components together
pub struct CaptureSessionBuilder {
    config: Option<KioskConfig>,
    device_service: Option<Arc<dyn DeviceCapabilityService>>,
    surface: Option<Arc<dyn RenderSurface>>,
    encoder: Option<Arc<dyn FrameEncoder>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    event_bus: Option<EventBus>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device_service: None,
            surface: None,
            encoder: None,
            notifier: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: KioskConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn device_service(mut self, service: Arc<dyn DeviceCapabilityService>) -> Self {
        self.device_service = Some(service);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Defaults to JPEG
    pub fn encoder(mut self, encoder: Arc<dyn FrameEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Defaults to publishing notifications on the event bus
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let device_service = self
            .device_service
            .ok_or_else(|| KioskError::system("Device service must be specified"))?;
        let surface = self
            .surface
            .ok_or_else(|| KioskError::system("Render surface must be specified"))?;

        let events = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(config.events.bus_capacity));
        let encoder = self
            .encoder
            .unwrap_or_else(|| Arc::new(JpegFrameEncoder) as Arc<dyn FrameEncoder>);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(events.clone()) as Arc<dyn NotificationSink>);

        let acquirer = DeviceAcquirer::new(device_service, config.camera.constraints());
        let coordinator =
            PlaybackCoordinator::new(surface, config.playback.fallback(), events.clone());
        let capturer = FrameCapturer::new(encoder, &config.capture);

        Ok(CaptureSession::from_parts(
            acquirer,
            coordinator,
            capturer,
            notifier,
            events,
        ))
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
