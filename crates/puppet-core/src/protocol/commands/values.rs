//! Property value commands

use crate::protocol::containers::{PropertyAbstractContainer, PropertyValueContainer};
use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// Designer to worker: assign property values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeValuesCommand {
    values: Vec<PropertyValueContainer>,
}

impl ChangeValuesCommand {
    pub fn new(values: Vec<PropertyValueContainer>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[PropertyValueContainer] {
        &self.values
    }
}

impl WireFormat for ChangeValuesCommand {
    const NAME: &'static str = "ChangeValues";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.values);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            values: input.get_seq("values")?,
        })
    }
}

impl fmt::Display for ChangeValuesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_values(f, "ChangeValuesCommand", &self.values)
    }
}

/// Worker to designer: property values changed inside the scene.
///
/// Names may be logical paths such as `font.pixelSize` or `anchors/fill`
/// produced by the signal spy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesChangedCommand {
    values: Vec<PropertyValueContainer>,
}

impl ValuesChangedCommand {
    pub fn new(values: Vec<PropertyValueContainer>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[PropertyValueContainer] {
        &self.values
    }
}

impl WireFormat for ValuesChangedCommand {
    const NAME: &'static str = "ValuesChanged";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.values);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            values: input.get_seq("values")?,
        })
    }
}

impl fmt::Display for ValuesChangedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_values(f, "ValuesChangedCommand", &self.values)
    }
}

/// Designer to worker: reset properties to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovePropertiesCommand {
    properties: Vec<PropertyAbstractContainer>,
}

impl RemovePropertiesCommand {
    pub fn new(properties: Vec<PropertyAbstractContainer>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[PropertyAbstractContainer] {
        &self.properties
    }
}

impl WireFormat for RemovePropertiesCommand {
    const NAME: &'static str = "RemoveProperties";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.properties);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            properties: input.get_seq("properties")?,
        })
    }
}

impl fmt::Display for RemovePropertiesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemovePropertiesCommand(")?;
        for (index, property) in self.properties.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", property)?;
        }
        write!(f, ")")
    }
}

fn write_values(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    values: &[PropertyValueContainer],
) -> fmt::Result {
    write!(f, "{}(", label)?;
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    write!(f, ")")
}
