mod builder;
mod lifecycle;
mod state;
mod teardown;


pub use builder::CaptureSessionBuilder;
pub use lifecycle::CaptureSession;
pub use state::SessionState;
pub use teardown::{TeardownGuard, TeardownReport};
