use super::coordinator::{CoordinatorState, PlaybackOutcome, PlaybackTrigger};
use super::RenderSurface;
use crate::device::HandleId;
use crate::error::SessionError;
use crate::events::{EventBus, KioskEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// One bind-and-play try: a ready listener raced against a fallback timer
pub(super) struct PlaybackAttempt {
    handle_id: HandleId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PlaybackAttempt {
    pub(super) fn spawn(
        handle_id: HandleId,
        surface: Arc<dyn RenderSurface>,
        fallback: Duration,
        cancel: CancellationToken,
        state: Arc<Mutex<CoordinatorState>>,
        events: EventBus,
    ) -> Self {
        let task = tokio::spawn(run_attempt(
            handle_id,
            surface,
            fallback,
            cancel.clone(),
            state,
            events,
        ));

        Self {
            handle_id,
            cancel,
            task,
        }
    }

    pub(super) fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    /// Drop both the listener and the timer
    pub(super) fn cancel(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn run_attempt(
    handle_id: HandleId,
    surface: Arc<dyn RenderSurface>,
    fallback: Duration,
    cancel: CancellationToken,
    state: Arc<Mutex<CoordinatorState>>,
    events: EventBus,
) {
    // The losing branch is dropped when select! returns
    let trigger = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            trace!("Playback attempt for {} cancelled before trigger", handle_id);
            return;
        }
        _ = surface.ready() => PlaybackTrigger::ReadyEvent,
        _ = tokio::time::sleep(fallback) => PlaybackTrigger::Fallback,
    };

    if trigger == PlaybackTrigger::Fallback {
        warn!(
            "{}; attempting playback of {} anyway",
            SessionError::BindTimeout {
                timeout_ms: fallback.as_millis() as u64
            },
            handle_id
        );
    } else {
        debug!("Surface ready for {}", handle_id);
    }

    if surface.bound_handle() != Some(handle_id) {
        debug!("Surface no longer bound to {}; skipping playback", handle_id);
        let mut state = state.lock();
        if state.binding.token == Some(handle_id) {
            state.binding.in_flight = false;
        }
        return;
    }

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            trace!("Playback attempt for {} cancelled during play", handle_id);
            return;
        }
        result = surface.play() => result,
    };

    let mut state = state.lock();
    if cancel.is_cancelled() || state.binding.token != Some(handle_id) {
        trace!("Discarding playback result for released camera {}", handle_id);
        return;
    }

    state.binding.in_flight = false;
    match &result {
        Ok(()) => {
            info!("Camera {} playing (via {:?})", handle_id, trigger);
            events.emit(KioskEvent::PlaybackStarted { handle_id, trigger });
        }
        Err(e) => {
            events.emit(KioskEvent::PlaybackRejected {
                handle_id,
                reason: e.to_string(),
            });
        }
    }
    state.last_outcome = Some(PlaybackOutcome {
        handle_id,
        trigger,
        result,
    });
}
