//! Forwarded user input for the worker's interactive views

use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use crate::protocol::value::PropertyValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum InputEventType {
    #[default]
    MousePress = 0,
    MouseRelease = 1,
    MouseMove = 2,
    MouseDoubleClick = 3,
    Wheel = 4,
    KeyPress = 5,
    KeyRelease = 6,
}

impl InputEventType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::MousePress),
            1 => Some(Self::MouseRelease),
            2 => Some(Self::MouseMove),
            3 => Some(Self::MouseDoubleClick),
            4 => Some(Self::Wheel),
            5 => Some(Self::KeyPress),
            6 => Some(Self::KeyRelease),
            _ => None,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Self::KeyPress | Self::KeyRelease)
    }
}

/// A mouse, wheel or key event replayed inside the worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputEventCommand {
    event_type: InputEventType,
    x: f64,
    y: f64,
    button: u32,
    modifiers: u32,
    key: i32,
    delta: i32,
}

impl InputEventCommand {
    pub fn mouse(event_type: InputEventType, x: f64, y: f64, button: u32, modifiers: u32) -> Self {
        Self {
            event_type,
            x,
            y,
            button,
            modifiers,
            ..Self::default()
        }
    }

    pub fn wheel(x: f64, y: f64, delta: i32, modifiers: u32) -> Self {
        Self {
            event_type: InputEventType::Wheel,
            x,
            y,
            delta,
            modifiers,
            ..Self::default()
        }
    }

    pub fn key(event_type: InputEventType, key: i32, modifiers: u32) -> Self {
        Self {
            event_type,
            key,
            modifiers,
            ..Self::default()
        }
    }

    pub fn event_type(&self) -> InputEventType {
        self.event_type
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn button(&self) -> u32 {
        self.button
    }

    pub fn modifiers(&self) -> u32 {
        self.modifiers
    }

    pub fn key_code(&self) -> i32 {
        self.key
    }

    pub fn delta(&self) -> i32 {
        self.delta
    }
}

impl PartialEq for InputEventCommand {
    fn eq(&self, other: &Self) -> bool {
        self.event_type == other.event_type
            && self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.button == other.button
            && self.modifiers == other.modifiers
            && self.key == other.key
            && self.delta == other.delta
    }
}

impl WireFormat for InputEventCommand {
    const NAME: &'static str = "InputEvent";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_u32(self.event_type as u32);
        out.put_f64(self.x);
        out.put_f64(self.y);
        out.put_u32(self.button);
        out.put_u32(self.modifiers);
        out.put_i32(self.key);
        out.put_i32(self.delta);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        let raw = input.get_u32("eventType")?;
        let event_type = InputEventType::from_u32(raw).ok_or(DecodeError::InvalidEnum {
            field: "eventType",
            value: raw,
        })?;
        Ok(Self {
            event_type,
            x: input.get_f64("x")?,
            y: input.get_f64("y")?,
            button: input.get_u32("button")?,
            modifiers: input.get_u32("modifiers")?,
            key: input.get_i32("key")?,
            delta: input.get_i32("delta")?,
        })
    }
}

impl fmt::Display for InputEventCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.event_type.is_key() {
            write!(f, "InputEventCommand({:?}, key: {})", self.event_type, self.key)
        } else {
            write!(
                f,
                "InputEventCommand({:?}, pos: ({}, {}), button: {})",
                self.event_type, self.x, self.y, self.button
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum View3DActionType {
    #[default]
    Empty = 0,
    MoveTool = 1,
    ScaleTool = 2,
    RotateTool = 3,
    FitToView = 4,
    SelectionModeToggle = 5,
    ShowGrid = 6,
    EditLightToggle = 7,
    CameraToggle = 8,
}

impl View3DActionType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Empty),
            1 => Some(Self::MoveTool),
            2 => Some(Self::ScaleTool),
            3 => Some(Self::RotateTool),
            4 => Some(Self::FitToView),
            5 => Some(Self::SelectionModeToggle),
            6 => Some(Self::ShowGrid),
            7 => Some(Self::EditLightToggle),
            8 => Some(Self::CameraToggle),
            _ => None,
        }
    }
}

/// A toolbar action of the 3D editor view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View3DActionCommand {
    action: View3DActionType,
    value: PropertyValue,
}

impl View3DActionCommand {
    pub fn new(action: View3DActionType, value: PropertyValue) -> Self {
        Self { action, value }
    }

    pub fn action(&self) -> View3DActionType {
        self.action
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

impl WireFormat for View3DActionCommand {
    const NAME: &'static str = "View3DAction";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_u32(self.action as u32);
        self.value.write_to(out);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        let raw = input.get_u32("action")?;
        let action = View3DActionType::from_u32(raw).ok_or(DecodeError::InvalidEnum {
            field: "action",
            value: raw,
        })?;
        Ok(Self {
            action,
            value: PropertyValue::read_from(input)?,
        })
    }
}

impl fmt::Display for View3DActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View3DActionCommand({:?}, {})", self.action, self.value)
    }
}
