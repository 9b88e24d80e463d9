//! Debug output command

use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// Severity of a message produced inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum DebugOutputType {
    #[default]
    Debug = 0,
    Warning = 1,
    Error = 2,
    Fatal = 3,
}

impl DebugOutputType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Debug),
            1 => Some(Self::Warning),
            2 => Some(Self::Error),
            3 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

/// A log line from the worker, optionally attributed to instances.
///
/// Equality looks at type and text only; the instance list is context,
/// and two reports of the same message are the same message.
#[derive(Debug, Clone, Default)]
pub struct DebugOutputCommand {
    output_type: DebugOutputType,
    text: String,
    instance_ids: Vec<i32>,
}

impl DebugOutputCommand {
    pub fn new(output_type: DebugOutputType, text: impl Into<String>, instance_ids: Vec<i32>) -> Self {
        Self {
            output_type,
            text: text.into(),
            instance_ids,
        }
    }

    pub fn output_type(&self) -> DebugOutputType {
        self.output_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn instance_ids(&self) -> &[i32] {
        &self.instance_ids
    }
}

impl PartialEq for DebugOutputCommand {
    fn eq(&self, other: &Self) -> bool {
        self.output_type == other.output_type && self.text == other.text
    }
}

impl WireFormat for DebugOutputCommand {
    const NAME: &'static str = "DebugOutput";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_u32(self.output_type as u32);
        out.put_str(&self.text);
        out.put_ids(&self.instance_ids);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        let raw = input.get_u32("type")?;
        let output_type = DebugOutputType::from_u32(raw).ok_or(DecodeError::InvalidEnum {
            field: "type",
            value: raw,
        })?;
        Ok(Self {
            output_type,
            text: input.get_string("text")?,
            instance_ids: input.get_ids("instanceIds")?,
        })
    }
}

impl fmt::Display for DebugOutputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DebugOutputCommand(type: {}, text: {:?}, instances: {:?})",
            self.output_type.as_str(),
            self.text,
            self.instance_ids
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_instance_ids() {
        let a = DebugOutputCommand::new(DebugOutputType::Warning, "binding loop", vec![1, 2]);
        let b = DebugOutputCommand::new(DebugOutputType::Warning, "binding loop", vec![7]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_checks_type_and_text() {
        let a = DebugOutputCommand::new(DebugOutputType::Warning, "x", vec![]);
        assert_ne!(a, DebugOutputCommand::new(DebugOutputType::Error, "x", vec![]));
        assert_ne!(a, DebugOutputCommand::new(DebugOutputType::Warning, "y", vec![]));
    }

    #[test]
    fn test_round_trip_keeps_instance_ids() {
        let command = DebugOutputCommand::new(DebugOutputType::Fatal, "", vec![4, 4, -1]);
        let decoded = DebugOutputCommand::from_bytes(command.to_bytes()).unwrap();
        assert_eq!(decoded.instance_ids(), &[4, 4, -1]);
    }

    #[test]
    fn test_invalid_type_is_rejected() {
        let mut writer = WireWriter::new();
        writer.put_u32(9);
        writer.put_str("x");
        writer.put_ids(&[]);
        assert!(matches!(
            DebugOutputCommand::from_bytes(writer.finish()),
            Err(DecodeError::InvalidEnum { field: "type", value: 9 })
        ));
    }
}
