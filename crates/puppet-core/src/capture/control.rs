//! Comparison of produced frames against a recorded control stream

use crate::protocol::{CommandKind, RawFrame};
use std::collections::VecDeque;
use std::fmt;

/// First point at which produced frames differ from the control stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Zero-based index among compared frames
    pub index: usize,
    /// Control frame, `None` when the control stream ran out
    pub expected: Option<String>,
    /// Produced frame, `None` when production stopped early
    pub actual: Option<String>,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}: expected {}, got {}",
            self.index,
            self.expected.as_deref().unwrap_or("end of stream"),
            self.actual.as_deref().unwrap_or("end of stream")
        )
    }
}

/// Heartbeats depend on timing, not on input, and are never compared
fn is_compared(frame: &RawFrame) -> bool {
    frame.known_kind() != Some(CommandKind::PuppetAlive)
}

/// Human-readable rendering of a frame for reports
pub fn describe_frame(frame: &RawFrame) -> String {
    match frame.decode() {
        Ok(Some(command)) => command.to_string(),
        Ok(None) => format!("unknown kind {} ({} bytes)", frame.kind, frame.payload.len()),
        Err(err) => format!("undecodable frame: {}", err),
    }
}

/// Expected frames, consumed in order
#[derive(Debug, Default)]
pub struct ControlStream {
    frames: VecDeque<RawFrame>,
    compared: usize,
}

impl ControlStream {
    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().filter(is_compared).collect(),
            compared: 0,
        }
    }

    /// Compare the next produced frame
    pub fn check(&mut self, actual: &RawFrame) -> Result<(), Divergence> {
        if !is_compared(actual) {
            return Ok(());
        }
        let index = self.compared;
        self.compared += 1;
        match self.frames.pop_front() {
            Some(expected) if expected == *actual => Ok(()),
            expected => Err(Divergence {
                index,
                expected: expected.as_ref().map(describe_frame),
                actual: Some(describe_frame(actual)),
            }),
        }
    }

    /// Frames matched so far
    pub fn compared(&self) -> usize {
        self.compared
    }

    /// Finish; leftover control frames are a divergence
    pub fn finish(mut self) -> Result<usize, Divergence> {
        match self.frames.pop_front() {
            None => Ok(self.compared),
            Some(expected) => Err(Divergence {
                index: self.compared,
                expected: Some(describe_frame(&expected)),
                actual: None,
            }),
        }
    }
}
