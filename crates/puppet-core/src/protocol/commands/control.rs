//! Channel control commands: handshake and capture requests

use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// Handshake marker; the worker answers with the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynchronizeCommand {
    sync_id: i32,
}

impl SynchronizeCommand {
    pub fn new(sync_id: i32) -> Self {
        Self { sync_id }
    }

    pub fn sync_id(&self) -> i32 {
        self.sync_id
    }
}

impl WireFormat for SynchronizeCommand {
    const NAME: &'static str = "Synchronize";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.sync_id);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            sync_id: input.get_i32("syncId")?,
        })
    }
}

impl fmt::Display for SynchronizeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SynchronizeCommand(syncId: {})", self.sync_id)
    }
}

/// Asks the worker to render previews; an empty id list means every instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureCommand {
    step: i32,
    instance_ids: Vec<i32>,
}

impl CaptureCommand {
    pub fn new(step: i32, instance_ids: Vec<i32>) -> Self {
        Self { step, instance_ids }
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn instance_ids(&self) -> &[i32] {
        &self.instance_ids
    }

    pub fn captures_all(&self) -> bool {
        self.instance_ids.is_empty()
    }
}

impl WireFormat for CaptureCommand {
    const NAME: &'static str = "Capture";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.step);
        out.put_ids(&self.instance_ids);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            step: input.get_i32("step")?,
            instance_ids: input.get_ids("instanceIds")?,
        })
    }
}

impl fmt::Display for CaptureCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureCommand(step: {}, instances: {:?})",
            self.step, self.instance_ids
        )
    }
}
