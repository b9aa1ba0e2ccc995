use super::attempt::PlaybackAttempt;
use super::RenderSurface;
use crate::device::{DeviceHandle, HandleId};
use crate::error::SessionError;
use crate::events::EventBus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What started a playback attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackTrigger {
    /// The surface reported loaded metadata
    ReadyEvent,
    /// The ready signal never came within the fallback delay
    Fallback,
}

/// Result of the most recent playback attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    pub handle_id: HandleId,
    pub trigger: PlaybackTrigger,
    pub result: Result<(), SessionError>,
}

/// Which camera the surface is bound to and whether an attempt is pending
#[derive(Debug, Default)]
pub(super) struct RenderSurfaceBinding {
    pub(super) token: Option<HandleId>,
    pub(super) in_flight: bool,
}

#[derive(Default)]
pub(super) struct CoordinatorState {
    pub(super) binding: RenderSurfaceBinding,
    pub(super) attempt: Option<PlaybackAttempt>,
    pub(super) last_outcome: Option<PlaybackOutcome>,
}

/// Binds a camera to the surface and gets it playing exactly once per camera
#[derive(Clone)]
pub struct PlaybackCoordinator {
    surface: Arc<dyn RenderSurface>,
    fallback: Duration,
    events: EventBus,
    state: Arc<Mutex<CoordinatorState>>,
}

impl PlaybackCoordinator {
    pub fn new(surface: Arc<dyn RenderSurface>, fallback: Duration, events: EventBus) -> Self {
        Self {
            surface,
            fallback,
            events,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn fallback(&self) -> Duration {
        self.fallback
    }

    /// Bind `handle` to the surface and start a playback attempt
    ///
    /// Returns `false` when this handle is already bound. Must run inside a
    /// tokio runtime; the attempt is cancelled with `liveness`.
    pub fn bind(&self, handle: &DeviceHandle, liveness: &CancellationToken) -> bool {
        let handle_id = handle.id();
        let mut state = self.state.lock();

        if state.binding.token == Some(handle_id) {
            debug!("Camera {} already bound; ignoring duplicate bind", handle_id);
            return false;
        }

        if let Some(previous) = state.binding.token.take() {
            warn!(
                "Surface still bound to {} while binding {}; dropping stale binding",
                previous, handle_id
            );
            if let Some(attempt) = state.attempt.take() {
                attempt.cancel();
            }
            self.surface.detach();
        }

        self.surface.attach(handle);
        state.binding.token = Some(handle_id);
        state.binding.in_flight = true;
        state.last_outcome = None;

        info!(
            "Bound camera {} to surface; waiting for ready signal (fallback {:?})",
            handle_id, self.fallback
        );

        state.attempt = Some(PlaybackAttempt::spawn(
            handle_id,
            Arc::clone(&self.surface),
            self.fallback,
            liveness.child_token(),
            Arc::clone(&self.state),
            self.events.clone(),
        ));

        true
    }

    /// Cancel any pending attempt and unbind the surface
    ///
    /// Returns the handle that was bound, if any. Safe to call repeatedly.
    pub fn release(&self) -> Option<HandleId> {
        let mut state = self.state.lock();

        if let Some(attempt) = state.attempt.take() {
            debug!("Cancelling playback attempt for {}", attempt.handle_id());
            attempt.cancel();
        }
        state.binding.in_flight = false;

        let previous = state.binding.token.take();
        if let Some(handle_id) = previous {
            self.surface.detach();
            debug!("Unbound camera {} from surface", handle_id);
        }
        previous
    }

    /// Identity of the camera currently bound
    pub fn binding_token(&self) -> Option<HandleId> {
        self.state.lock().binding.token
    }

    pub fn attempt_in_flight(&self) -> bool {
        self.state.lock().binding.in_flight
    }

    pub fn last_outcome(&self) -> Option<PlaybackOutcome> {
        self.state.lock().last_outcome.clone()
    }
}
