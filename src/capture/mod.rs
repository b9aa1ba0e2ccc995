mod capturer;
mod encode;
mod frame;
#[cfg(test)]
mod tests;

pub use capturer::FrameCapturer;
pub use encode::{FrameEncoder, JpegFrameEncoder};
pub use frame::CapturedFrame;
