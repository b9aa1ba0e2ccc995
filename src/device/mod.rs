mod acquirer;
mod handle;
#[cfg(test)]
mod tests;

pub use acquirer::{Constraints, DeviceAcquirer, DeviceCapabilityService, Facing};
pub use handle::{DeviceHandle, HandleId, MediaTrack, TrackSettings};
