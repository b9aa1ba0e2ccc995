use super::Facing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an acquired camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cam-{}", self.0)
    }
}

/// Capability actually granted for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSettings {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
}

/// One live track of a camera
///
/// `stop` must be idempotent: stopping an already stopped track does nothing.
pub trait MediaTrack: Send + Sync {
    fn label(&self) -> &str;
    fn settings(&self) -> TrackSettings;
    fn is_live(&self) -> bool;
    fn stop(&self);
}

/// Exclusive lock on a camera, made of one or more live tracks
///
/// Not `Clone`. Dropping a handle that was never released stops its tracks.
pub struct DeviceHandle {
    id: HandleId,
    tracks: Vec<Box<dyn MediaTrack>>,
    released: bool,
}

impl DeviceHandle {
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        let id = HandleId::next();
        debug!("Created device handle {} with {} tracks", id, tracks.len());
        Self {
            id,
            tracks,
            released: false,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    /// Settings of the first track, which carries the video
    pub fn settings(&self) -> Option<TrackSettings> {
        self.tracks.first().map(|track| track.settings())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track still live; returns how many were stopped
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;

        let mut stopped = 0;
        for track in &self.tracks {
            if track.is_live() {
                track.stop();
                stopped += 1;
                trace!("Stopped track '{}' of {}", track.label(), self.id);
            } else {
                trace!("Track '{}' of {} already stopped", track.label(), self.id);
            }
        }
        stopped
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!("Device handle {} dropped without teardown; stopping tracks", self.id);
            self.release();
        }
    }
}
