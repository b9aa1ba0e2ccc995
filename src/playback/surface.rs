use crate::device::{DeviceHandle, HandleId};
use crate::error::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How much of the stream a surface has decoded
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(ReadyState::HaveNothing),
            1 => Some(ReadyState::HaveMetadata),
            2 => Some(ReadyState::HaveCurrentData),
            3 => Some(ReadyState::HaveFutureData),
            4 => Some(ReadyState::HaveEnoughData),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// On-screen element that renders a live camera stream
///
/// Accessors are synchronous snapshots; `ready` and `play` suspend.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Point the surface at a camera so it can draw from it
    fn attach(&self, handle: &DeviceHandle);

    /// Stop drawing and forget the attached camera
    fn detach(&self);

    /// Camera the surface currently draws from
    fn bound_handle(&self) -> Option<HandleId>;

    /// Resolves when the surface reports loaded metadata. May never resolve.
    ///
    /// Dropping the future unregisters the listener.
    async fn ready(&self);

    /// Start playback; may be refused by policy outside the caller's control
    async fn play(&self) -> Result<(), SessionError>;

    fn ready_state(&self) -> ReadyState;

    /// Native (width, height) of the current stream, zero when unknown
    fn video_dimensions(&self) -> (u32, u32);

    /// Copy the current frame as packed RGB8 into `buffer`
    fn copy_frame(&self, buffer: &mut [u8]) -> Result<(), SessionError>;
}
