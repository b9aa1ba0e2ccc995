use crate::device::{DeviceHandle, HandleId};
use crate::error::SessionError;
use crate::playback::{ReadyState, RenderSurface};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// How a [`SimulatedSurface`] reacts once a camera is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceBehavior {
    /// Delay before metadata loads; `None` means the ready signal never fires
    pub ready_after: Option<Duration>,
    /// Refuse `play()` as an autoplay policy would
    pub reject_play: bool,
}

impl Default for SurfaceBehavior {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::from_millis(50)),
            reject_play: false,
        }
    }
}

#[derive(Default)]
struct SurfaceState {
    bound: Option<HandleId>,
    stream_size: (u32, u32),
    dimensions: (u32, u32),
    ready_state: ReadyState,
    metadata_loaded: bool,
    playing: bool,
    frames_drawn: u64,
    loader: Option<JoinHandle<()>>,
    forced_dimensions: Option<(u32, u32)>,
    forced_ready_state: Option<ReadyState>,
}

/// Video surface that draws a synthetic gradient from the attached camera
pub struct SimulatedSurface {
    behavior: Mutex<SurfaceBehavior>,
    state: Arc<Mutex<SurfaceState>>,
    loaded: Arc<Notify>,
    play_calls: Mutex<Vec<Instant>>,
    created_at: Instant,
}

impl SimulatedSurface {
    pub fn new(behavior: SurfaceBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            state: Arc::new(Mutex::new(SurfaceState::default())),
            loaded: Arc::new(Notify::new()),
            play_calls: Mutex::new(Vec::new()),
            created_at: Instant::now(),
        }
    }

    pub fn set_behavior(&self, behavior: SurfaceBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Report these dimensions regardless of the stream
    pub fn force_dimensions(&self, width: u32, height: u32) {
        self.state.lock().forced_dimensions = Some((width, height));
    }

    /// Report this readiness regardless of the stream
    pub fn force_ready_state(&self, ready_state: ReadyState) {
        self.state.lock().forced_ready_state = Some(ready_state);
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Offsets from surface creation at which `play()` was called
    pub fn play_calls(&self) -> Vec<Duration> {
        self.play_calls
            .lock()
            .iter()
            .map(|at| at.duration_since(self.created_at))
            .collect()
    }
}

impl Default for SimulatedSurface {
    fn default() -> Self {
        Self::new(SurfaceBehavior::default())
    }
}

#[async_trait]
impl RenderSurface for SimulatedSurface {
    fn attach(&self, handle: &DeviceHandle) {
        let behavior = *self.behavior.lock();
        let stream_size = handle
            .settings()
            .map(|settings| (settings.width, settings.height))
            .unwrap_or((0, 0));
        let handle_id = handle.id();

        let mut state = self.state.lock();
        if let Some(loader) = state.loader.take() {
            loader.abort();
        }
        state.bound = Some(handle_id);
        state.stream_size = stream_size;
        state.dimensions = (0, 0);
        state.ready_state = ReadyState::HaveNothing;
        state.metadata_loaded = false;
        state.playing = false;

        if let Some(delay) = behavior.ready_after {
            let shared = Arc::clone(&self.state);
            let loaded = Arc::clone(&self.loaded);
            state.loader = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut state = shared.lock();
                if state.bound != Some(handle_id) {
                    return;
                }
                state.metadata_loaded = true;
                state.dimensions = state.stream_size;
                if state.ready_state < ReadyState::HaveMetadata {
                    state.ready_state = ReadyState::HaveMetadata;
                }
                trace!("Simulated surface loaded metadata for {}", handle_id);
                loaded.notify_waiters();
            }));
        }
        debug!("Simulated surface attached to {}", handle_id);
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        if let Some(loader) = state.loader.take() {
            loader.abort();
        }
        state.bound = None;
        state.stream_size = (0, 0);
        state.dimensions = (0, 0);
        state.ready_state = ReadyState::HaveNothing;
        state.metadata_loaded = false;
        state.playing = false;
    }

    fn bound_handle(&self) -> Option<HandleId> {
        self.state.lock().bound
    }

    async fn ready(&self) {
        let notified = self.loaded.notified();
        if self.state.lock().metadata_loaded {
            return;
        }
        notified.await;
    }

    async fn play(&self) -> Result<(), SessionError> {
        self.play_calls.lock().push(Instant::now());

        if self.behavior.lock().reject_play {
            return Err(SessionError::PlaybackRejected {
                details: "play() requires a user gesture".to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.bound.is_none() {
            return Err(SessionError::PlaybackRejected {
                details: "no camera attached".to_string(),
            });
        }
        state.dimensions = state.stream_size;
        state.ready_state = ReadyState::HaveEnoughData;
        state.playing = true;
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        let state = self.state.lock();
        state.forced_ready_state.unwrap_or(state.ready_state)
    }

    fn video_dimensions(&self) -> (u32, u32) {
        let state = self.state.lock();
        state.forced_dimensions.unwrap_or(state.dimensions)
    }

    fn copy_frame(&self, buffer: &mut [u8]) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let (width, height) = state.forced_dimensions.unwrap_or(state.dimensions);
        let expected = width as usize * height as usize * 3;
        if state.bound.is_none() || expected == 0 {
            return Err(SessionError::SurfaceNotReady {
                details: "nothing is being drawn".to_string(),
            });
        }
        if buffer.len() != expected {
            return Err(SessionError::SurfaceNotReady {
                details: format!("buffer holds {} bytes, frame needs {}", buffer.len(), expected),
            });
        }

        let phase = (state.frames_drawn % 256) as u32;
        state.frames_drawn += 1;
        for (index, pixel) in buffer.chunks_exact_mut(3).enumerate() {
            let x = index as u32 % width;
            let y = index as u32 / width;
            pixel[0] = ((x * 255 / width.max(1)) as u8).wrapping_add(phase as u8);
            pixel[1] = (y * 255 / height.max(1)) as u8;
            pixel[2] = (((x / 16 + y / 16) % 2) * 160) as u8;
        }
        Ok(())
    }
}
