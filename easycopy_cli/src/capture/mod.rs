//! Background capture of finished network exchanges

mod buffer;
mod har;

pub use buffer::{CaptureBuffer, CaptureHandle, LiveExchange, WeakCaptureHandle};
pub use har::{load_har, spawn_observer};
