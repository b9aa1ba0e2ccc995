//! In-process camera and surface that behave like their hardware counterparts,
//! including slow permission prompts, missing ready signals and autoplay refusal.

mod camera;
mod surface;

pub use camera::{SimulatedCamera, SimulatedTrack};
pub use surface::{SimulatedSurface, SurfaceBehavior};
