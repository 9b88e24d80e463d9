//! Node-instance wire protocol
//!
//! ## Layers
//!
//! - [`stream`]: big-endian field encoding shared by every record
//! - [`value`], [`containers`], [`commands`]: the command value objects
//! - [`command`]: the tagged union and its kind dispatch
//! - [`codec`]: frame delimiting, used identically by designer and worker

pub mod codec;
pub mod command;
pub mod commands;
pub mod containers;
pub mod error;
pub mod kind;
pub mod stream;
pub mod value;

pub use codec::{FrameCodec, RawFrame, decode_frame, encode_frame};
pub use command::Command;
pub use commands::*;
pub use containers::{
    ImageContainer, InformationContainer, InformationName, InstanceContainer, NO_INSTANCE,
    PropertyAbstractContainer, PropertyValueContainer,
};
pub use error::{DecodeError, FrameError};
pub use kind::CommandKind;
pub use stream::{WireFormat, WireReader, WireWriter};
pub use value::PropertyValue;

/// Protocol revision reported by `--version` and logged at handshake
pub const PROTOCOL_VERSION: u32 = 3;
