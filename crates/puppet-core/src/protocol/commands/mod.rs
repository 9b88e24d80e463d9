//! Command value objects
//!
//! Each command is a plain value with a fixed field order on the wire, a
//! `Default` sentinel, structural equality and a `Display` form for logs.

mod control;
mod debug_output;
mod input;
mod instances;
mod state_preview;
mod token;
mod values;

pub use control::{CaptureCommand, SynchronizeCommand};
pub use debug_output::{DebugOutputCommand, DebugOutputType};
pub use input::{InputEventCommand, InputEventType, View3DActionCommand, View3DActionType};
pub use instances::{
    ChildrenChangedCommand, ComponentCompletedCommand, CreateSceneCommand,
    InformationChangedCommand, RemoveInstancesCommand, SelectionCommand,
};
pub use state_preview::StatePreviewImageChangedCommand;
pub use token::TokenCommand;
pub use values::{ChangeValuesCommand, RemovePropertiesCommand, ValuesChangedCommand};
