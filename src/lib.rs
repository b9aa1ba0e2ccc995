pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod sim;
pub mod submission;

pub use capture::{CapturedFrame, FrameCapturer, FrameEncoder, JpegFrameEncoder};
pub use config::KioskConfig;
pub use device::{
    Constraints, DeviceAcquirer, DeviceCapabilityService, DeviceHandle, Facing, HandleId,
    MediaTrack, TrackSettings,
};
pub use error::{EventBusError, KioskError, Result, SessionError};
pub use events::{
    EventBus, EventFilter, EventReceiver, KioskEvent, NotificationBanner, NotificationKind,
    NotificationSink,
};
pub use playback::{PlaybackCoordinator, PlaybackOutcome, PlaybackTrigger, ReadyState, RenderSurface};
pub use session::{CaptureSession, CaptureSessionBuilder, SessionState, TeardownGuard, TeardownReport};
pub use sim::{SimulatedCamera, SimulatedSurface, SurfaceBehavior};
pub use submission::{VisitorDetails, VisitorSubmission};
