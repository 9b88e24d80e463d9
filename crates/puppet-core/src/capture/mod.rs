//! Captured frame streams
//!
//! A capture file is the raw concatenation of frames in wire format, so
//! the same [`crate::protocol::FrameCodec`] reads it back.

mod control;
mod reader;
mod writer;

pub use control::{ControlStream, Divergence, describe_frame};
pub use reader::{open_captured, read_captured};
pub use writer::{CaptureSet, CaptureWriter, Recorder};
