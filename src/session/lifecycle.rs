use super::{SessionState, TeardownGuard, TeardownReport};
use crate::capture::{CapturedFrame, FrameCapturer};
use crate::device::{DeviceAcquirer, DeviceHandle, HandleId};
use crate::error::SessionError;
use crate::events::{EventBus, KioskEvent, NotificationKind, NotificationSink};
use crate::playback::{PlaybackCoordinator, RenderSurface};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Mutable session fields; only touched under the session lock
pub(crate) struct SessionInner {
    pub(crate) state: SessionState,
    pub(crate) device: Option<DeviceHandle>,
    pub(crate) captured: Option<CapturedFrame>,
    pub(crate) last_error: Option<SessionError>,
    /// Cancelled on every teardown so suspended work can tell it is stale
    pub(crate) liveness: CancellationToken,
}

pub(super) struct SessionShared {
    pub(super) id: Uuid,
    pub(super) inner: Mutex<SessionInner>,
    pub(super) acquirer: DeviceAcquirer,
    pub(super) coordinator: PlaybackCoordinator,
    pub(super) capturer: FrameCapturer,
    pub(super) teardown: TeardownGuard,
    pub(super) notifier: Arc<dyn NotificationSink>,
    pub(super) events: EventBus,
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        let report = self.teardown.release(self.inner.get_mut());
        if report.released_anything() {
            info!("Capture session {} unmounted; camera released", self.id);
        }
    }
}

/// One visitor's camera capture flow
///
/// Cloning yields another handle to the same session. The camera is released
/// when the last handle is dropped, whatever state the session is in.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<SessionShared>,
}

impl CaptureSession {
    pub(super) fn from_parts(
        acquirer: DeviceAcquirer,
        coordinator: PlaybackCoordinator,
        capturer: FrameCapturer,
        notifier: Arc<dyn NotificationSink>,
        events: EventBus,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!("Created capture session {}", id);

        Self {
            shared: Arc::new(SessionShared {
                id,
                inner: Mutex::new(SessionInner {
                    state: SessionState::Idle,
                    device: None,
                    captured: None,
                    last_error: None,
                    liveness: CancellationToken::new(),
                }),
                acquirer,
                teardown: TeardownGuard::new(coordinator.clone(), events.clone()),
                coordinator,
                capturer,
                notifier,
                events,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// The accepted photo, present only in `Captured`
    pub fn captured_frame(&self) -> Option<CapturedFrame> {
        self.shared.inner.lock().captured.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.shared.inner.lock().last_error.clone()
    }

    /// Camera currently held by the session
    pub fn device_id(&self) -> Option<HandleId> {
        self.shared
            .inner
            .lock()
            .device
            .as_ref()
            .map(|handle| handle.id())
    }

    /// Camera the surface is bound to
    pub fn binding_token(&self) -> Option<HandleId> {
        self.shared.coordinator.binding_token()
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.shared.coordinator
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        self.shared.coordinator.surface()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Open the camera: `Idle -> Acquiring`, then `Streaming` or `Error`
    ///
    /// Also accepted from `Error`, which restarts after a failed acquisition;
    /// any other state returns `AlreadyActive`. Resolves once acquisition
    /// settles. Returns `Cancelled` when the session was torn down while the
    /// camera request was pending.
    pub async fn start(&self) -> Result<(), SessionError> {
        let (liveness, held) = {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                SessionState::Idle => {}
                SessionState::Error => {
                    debug!("Restarting capture session {} after error", self.shared.id);
                    self.shared.teardown.release(&mut inner);
                }
                state => {
                    error!(
                        "start() called on session {} while {:?}",
                        self.shared.id, state
                    );
                    return Err(SessionError::AlreadyActive);
                }
            }
            self.begin_acquiring(&mut inner)?
        };

        self.acquire(liveness, held).await
    }

    /// Take the photo shown on the surface
    ///
    /// Only valid while `Streaming`. Failures leave the session streaming so
    /// the visitor can try again; success stores the photo and releases the camera.
    pub async fn capture_requested(&self) -> Result<CapturedFrame, SessionError> {
        let liveness = {
            let mut inner = self.shared.inner.lock();
            if inner.state != SessionState::Streaming {
                warn!("Capture requested while {:?}", inner.state);
                return Err(SessionError::NotStreaming { state: inner.state });
            }
            if let Some(lost) = Self::ended_device(&inner) {
                let reason = SessionError::DeviceUnavailable {
                    details: format!("camera {} stopped delivering video", lost),
                };
                self.shared.teardown.release(&mut inner);
                self.acquisition_failed(&mut inner, reason.clone());
                return Err(reason);
            }
            inner.liveness.clone()
        };

        let surface = Arc::clone(self.shared.coordinator.surface());
        let result = self.shared.capturer.capture(surface.as_ref()).await;

        let mut inner = self.shared.inner.lock();
        if liveness.is_cancelled() || inner.state != SessionState::Streaming {
            debug!("Discarding capture result for torn down session");
            return Err(SessionError::Cancelled);
        }

        match result {
            Ok(frame) => {
                self.capture_succeeded(&mut inner, frame.clone());
                Ok(frame)
            }
            Err(e) => {
                self.capture_failed(&mut inner, &e);
                Err(e)
            }
        }
    }

    /// Throw away the photo and open the camera again: `Captured -> Acquiring`
    pub async fn retake(&self) -> Result<(), SessionError> {
        let (liveness, held) = {
            let mut inner = self.shared.inner.lock();
            if inner.state != SessionState::Captured {
                warn!("Retake requested while {:?}", inner.state);
                return Err(SessionError::NotStreaming { state: inner.state });
            }
            inner.captured = None;
            self.shared.teardown.release(&mut inner);
            self.begin_acquiring(&mut inner)?
        };

        info!("Retaking photo for session {}", self.shared.id);
        self.acquire(liveness, held).await
    }

    /// Visitor backed out of the capture flow
    pub fn cancel(&self) -> TeardownReport {
        debug!("Capture session {} cancelled", self.shared.id);
        self.teardown()
    }

    /// Release the camera and binding and return to `Idle`. Idempotent.
    pub fn teardown(&self) -> TeardownReport {
        let mut inner = self.shared.inner.lock();
        let report = self.shared.teardown.release(&mut inner);
        inner.captured = None;
        self.transition(&mut inner, SessionState::Idle);
        report
    }

    /// Enter `Acquiring`; refuses while a camera is still held
    fn begin_acquiring(
        &self,
        inner: &mut SessionInner,
    ) -> Result<(CancellationToken, Option<HandleId>), SessionError> {
        let held = inner.device.as_ref().map(|handle| handle.id());
        self.shared.acquirer.ensure_released(held)?;

        inner.last_error = None;
        self.transition(inner, SessionState::Acquiring);
        Ok((inner.liveness.clone(), held))
    }

    async fn acquire(
        &self,
        liveness: CancellationToken,
        held: Option<HandleId>,
    ) -> Result<(), SessionError> {
        let result = self.shared.acquirer.acquire(held).await;

        let mut inner = self.shared.inner.lock();
        if liveness.is_cancelled() || inner.state != SessionState::Acquiring {
            if let Ok(mut handle) = result {
                let handle_id = handle.id();
                let tracks_stopped = handle.release();
                info!(
                    "Discarding camera {} granted after teardown ({} tracks stopped)",
                    handle_id, tracks_stopped
                );
                self.shared.events.emit(KioskEvent::DeviceReleased {
                    handle_id,
                    tracks_stopped,
                });
            }
            return Err(SessionError::Cancelled);
        }

        match result {
            Ok(handle) => {
                self.device_ready(&mut inner, handle);
                Ok(())
            }
            Err(e) => {
                self.acquisition_failed(&mut inner, e.clone());
                Err(e)
            }
        }
    }

    /// Held camera whose tracks have all ended underneath the session
    fn ended_device(inner: &SessionInner) -> Option<HandleId> {
        let handle = inner.device.as_ref()?;
        if handle.tracks().iter().any(|track| track.is_live()) {
            None
        } else {
            Some(handle.id())
        }
    }

    fn device_ready(&self, inner: &mut SessionInner, handle: DeviceHandle) {
        let handle_id = handle.id();
        let (width, height) = handle
            .settings()
            .map(|settings| (settings.width, settings.height))
            .unwrap_or((0, 0));

        self.shared.events.emit(KioskEvent::DeviceAcquired {
            handle_id,
            width,
            height,
        });

        let handle = inner.device.insert(handle);
        self.shared.coordinator.bind(handle, &inner.liveness);
        self.transition(inner, SessionState::Streaming);

        self.shared.notifier.notify(
            NotificationKind::Info,
            "Camera ready! Click \"Capture Photo\" when ready.",
        );
    }

    fn acquisition_failed(&self, inner: &mut SessionInner, reason: SessionError) {
        let message = match &reason {
            SessionError::PermissionDenied { .. } => {
                "Camera access denied. Please enable camera permissions and try again."
            }
            _ => "No camera available. Please check the camera and try again.",
        };
        warn!("Camera acquisition failed: {}", reason);

        inner.last_error = Some(reason);
        self.transition(inner, SessionState::Error);
        self.shared.notifier.notify(NotificationKind::Error, message);
    }

    fn capture_succeeded(&self, inner: &mut SessionInner, frame: CapturedFrame) {
        self.shared.events.emit(KioskEvent::FrameCaptured {
            width: frame.width(),
            height: frame.height(),
            byte_len: frame.byte_len(),
        });

        inner.captured = Some(frame);
        inner.last_error = None;
        self.transition(inner, SessionState::Captured);
        self.shared.teardown.release(inner);

        self.shared
            .notifier
            .notify(NotificationKind::Success, "Photo captured successfully!");
    }

    fn capture_failed(&self, inner: &mut SessionInner, reason: &SessionError) {
        self.shared.events.emit(KioskEvent::CaptureFailed {
            reason: reason.to_string(),
        });
        inner.last_error = Some(reason.clone());

        let message = match reason {
            SessionError::SurfaceNotReady { .. } => {
                "Camera not ready. Please wait and try again.".to_string()
            }
            other => format!("Failed to capture photo: {}", other),
        };
        self.shared.notifier.notify(NotificationKind::Error, &message);
    }

    fn transition(&self, inner: &mut SessionInner, to: SessionState) {
        let from = inner.state;
        if from == to {
            return;
        }
        if !from.can_transition_to(to) {
            warn!("Unexpected session transition {:?} -> {:?}", from, to);
        }

        inner.state = to;
        info!("Capture session {}: {:?} -> {:?}", self.shared.id, from, to);
        self.shared
            .events
            .emit(KioskEvent::StateChanged { from, to });
    }
}
