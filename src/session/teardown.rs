use super::lifecycle::SessionInner;
use crate::device::HandleId;
use crate::events::{EventBus, KioskEvent};
use crate::playback::PlaybackCoordinator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a release actually let go of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub handle_id: Option<HandleId>,
    pub unbound: Option<HandleId>,
    pub tracks_stopped: usize,
}

impl TeardownReport {
    pub fn released_anything(&self) -> bool {
        self.handle_id.is_some() || self.unbound.is_some()
    }
}

/// Single release path for the camera and its surface binding
///
/// Capture success, cancel, retake and unmount all converge here.
#[derive(Clone)]
pub struct TeardownGuard {
    coordinator: PlaybackCoordinator,
    events: EventBus,
}

impl TeardownGuard {
    pub fn new(coordinator: PlaybackCoordinator, events: EventBus) -> Self {
        Self {
            coordinator,
            events,
        }
    }

    /// Release everything the session holds. No-op when nothing is held.
    pub(crate) fn release(&self, inner: &mut SessionInner) -> TeardownReport {
        // in-flight operations observe this and discard their results
        inner.liveness.cancel();
        inner.liveness = CancellationToken::new();

        // listener and timer go before the camera does
        let unbound = self.coordinator.release();

        let mut report = TeardownReport {
            unbound,
            ..TeardownReport::default()
        };

        if let Some(mut handle) = inner.device.take() {
            let handle_id = handle.id();
            report.tracks_stopped = handle.release();
            report.handle_id = Some(handle_id);

            info!(
                "Released camera {} ({} tracks stopped)",
                handle_id, report.tracks_stopped
            );
            self.events.emit(KioskEvent::DeviceReleased {
                handle_id,
                tracks_stopped: report.tracks_stopped,
            });
        } else {
            debug!("Teardown with no camera held");
        }

        report
    }
}
