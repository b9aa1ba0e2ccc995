mod attempt;
mod coordinator;
mod surface;

pub use coordinator::{PlaybackCoordinator, PlaybackOutcome, PlaybackTrigger};
pub use surface::{ReadyState, RenderSurface};
