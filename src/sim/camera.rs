use crate::device::{
    Constraints, DeviceCapabilityService, DeviceHandle, Facing, MediaTrack, TrackSettings,
};
use crate::error::SessionError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Video track handed out by [`SimulatedCamera`]
pub struct SimulatedTrack {
    label: String,
    settings: TrackSettings,
    live: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}

impl MediaTrack for SimulatedTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn settings(&self) -> TrackSettings {
        self.settings
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            debug!("Simulated track '{}' stopped", self.label);
        }
    }
}

struct IssuedTrack {
    live: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}

/// Single simulated camera; only one grant may be live at a time
pub struct SimulatedCamera {
    supported: Vec<(u32, u32)>,
    acquire_delay: Duration,
    deny_permission: AtomicBool,
    disconnected: AtomicBool,
    issued: Mutex<Vec<IssuedTrack>>,
    requests: AtomicUsize,
}

impl SimulatedCamera {
    pub fn new(supported: Vec<(u32, u32)>) -> Self {
        Self {
            supported,
            acquire_delay: Duration::ZERO,
            deny_permission: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            issued: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        }
    }

    /// Time the permission prompt takes to resolve
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn set_deny_permission(&self, deny: bool) {
        self.deny_permission.store(deny, Ordering::SeqCst);
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Pull the camera out: live tracks end without being stopped
    pub fn unplug(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        for track in self.issued.lock().iter() {
            track.live.store(false, Ordering::SeqCst);
        }
        info!("Simulated camera unplugged");
    }

    /// Number of requests received, granted or not
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of tracks ever granted
    pub fn grant_count(&self) -> usize {
        self.issued.lock().len()
    }

    /// Number of granted tracks not yet stopped
    pub fn live_tracks(&self) -> usize {
        self.issued
            .lock()
            .iter()
            .filter(|track| track.live.load(Ordering::SeqCst))
            .count()
    }

    /// How many times each granted track was actually stopped, in grant order
    pub fn stop_counts(&self) -> Vec<usize> {
        self.issued
            .lock()
            .iter()
            .map(|track| track.stops.load(Ordering::SeqCst))
            .collect()
    }
}

#[async_trait]
impl DeviceCapabilityService for SimulatedCamera {
    async fn request(&self, constraints: &Constraints) -> Result<DeviceHandle, SessionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(SessionError::PermissionDenied {
                details: "permission prompt dismissed".to_string(),
            });
        }

        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SessionError::DeviceUnavailable {
                details: "no camera connected".to_string(),
            });
        }

        let (width, height) =
            constraints
                .nearest_resolution(&self.supported)
                .ok_or_else(|| SessionError::DeviceUnavailable {
                    details: "camera reports no supported resolutions".to_string(),
                })?;

        let mut issued = self.issued.lock();
        if issued.iter().any(|track| track.live.load(Ordering::SeqCst)) {
            return Err(SessionError::DeviceUnavailable {
                details: "camera is busy".to_string(),
            });
        }

        let live = Arc::new(AtomicBool::new(true));
        let stops = Arc::new(AtomicUsize::new(0));
        issued.push(IssuedTrack {
            live: Arc::clone(&live),
            stops: Arc::clone(&stops),
        });

        let facing_label = match constraints.facing {
            Facing::User => "front",
            Facing::Environment => "back",
        };
        let track = SimulatedTrack {
            label: format!("Simulated {} camera {}x{}", facing_label, width, height),
            settings: TrackSettings {
                width,
                height,
                facing: constraints.facing,
            },
            live,
            stops,
        };

        info!("Simulated camera granted at {}x{}", width, height);
        Ok(DeviceHandle::new(vec![Box::new(track)]))
    }
}
