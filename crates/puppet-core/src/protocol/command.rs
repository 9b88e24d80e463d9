//! The tagged union of every command

use super::commands::*;
use super::error::DecodeError;
use super::kind::CommandKind;
use super::stream::{WireFormat, WireWriter};
use bytes::Bytes;
use std::fmt;

/// One decoded command of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PuppetAlive,
    Synchronize(SynchronizeCommand),
    EndPuppet,
    CreateScene(CreateSceneCommand),
    SceneCreated,
    ChangeValues(ChangeValuesCommand),
    ValuesChanged(ValuesChangedCommand),
    RemoveInstances(RemoveInstancesCommand),
    RemoveProperties(RemovePropertiesCommand),
    InformationChanged(InformationChangedCommand),
    ChildrenChanged(ChildrenChangedCommand),
    ComponentCompleted(ComponentCompletedCommand),
    Selection(SelectionCommand),
    Token(TokenCommand),
    DebugOutput(DebugOutputCommand),
    StatePreviewImageChanged(StatePreviewImageChangedCommand),
    Capture(CaptureCommand),
    InputEvent(InputEventCommand),
    View3DAction(View3DActionCommand),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::PuppetAlive => CommandKind::PuppetAlive,
            Self::Synchronize(_) => CommandKind::Synchronize,
            Self::EndPuppet => CommandKind::EndPuppet,
            Self::CreateScene(_) => CommandKind::CreateScene,
            Self::SceneCreated => CommandKind::SceneCreated,
            Self::ChangeValues(_) => CommandKind::ChangeValues,
            Self::ValuesChanged(_) => CommandKind::ValuesChanged,
            Self::RemoveInstances(_) => CommandKind::RemoveInstances,
            Self::RemoveProperties(_) => CommandKind::RemoveProperties,
            Self::InformationChanged(_) => CommandKind::InformationChanged,
            Self::ChildrenChanged(_) => CommandKind::ChildrenChanged,
            Self::ComponentCompleted(_) => CommandKind::ComponentCompleted,
            Self::Selection(_) => CommandKind::Selection,
            Self::Token(_) => CommandKind::Token,
            Self::DebugOutput(_) => CommandKind::DebugOutput,
            Self::StatePreviewImageChanged(_) => CommandKind::StatePreviewImageChanged,
            Self::Capture(_) => CommandKind::Capture,
            Self::InputEvent(_) => CommandKind::InputEvent,
            Self::View3DAction(_) => CommandKind::View3DAction,
        }
    }

    /// Append this command's payload (without frame header)
    pub fn write_payload(&self, out: &mut WireWriter) {
        match self {
            Self::PuppetAlive | Self::EndPuppet | Self::SceneCreated => {}
            Self::Synchronize(c) => c.write_to(out),
            Self::CreateScene(c) => c.write_to(out),
            Self::ChangeValues(c) => c.write_to(out),
            Self::ValuesChanged(c) => c.write_to(out),
            Self::RemoveInstances(c) => c.write_to(out),
            Self::RemoveProperties(c) => c.write_to(out),
            Self::InformationChanged(c) => c.write_to(out),
            Self::ChildrenChanged(c) => c.write_to(out),
            Self::ComponentCompleted(c) => c.write_to(out),
            Self::Selection(c) => c.write_to(out),
            Self::Token(c) => c.write_to(out),
            Self::DebugOutput(c) => c.write_to(out),
            Self::StatePreviewImageChanged(c) => c.write_to(out),
            Self::Capture(c) => c.write_to(out),
            Self::InputEvent(c) => c.write_to(out),
            Self::View3DAction(c) => c.write_to(out),
        }
    }

    pub fn payload(&self) -> Bytes {
        let mut writer = WireWriter::new();
        self.write_payload(&mut writer);
        writer.finish()
    }

    /// Decode a payload of a known kind. The payload must be consumed exactly.
    pub fn decode(kind: CommandKind, payload: Bytes) -> Result<Self, DecodeError> {
        let command = match kind {
            CommandKind::PuppetAlive => {
                expect_empty(&payload, "PuppetAlive")?;
                Self::PuppetAlive
            }
            CommandKind::EndPuppet => {
                expect_empty(&payload, "EndPuppet")?;
                Self::EndPuppet
            }
            CommandKind::SceneCreated => {
                expect_empty(&payload, "SceneCreated")?;
                Self::SceneCreated
            }
            CommandKind::Synchronize => Self::Synchronize(WireFormat::from_bytes(payload)?),
            CommandKind::CreateScene => Self::CreateScene(WireFormat::from_bytes(payload)?),
            CommandKind::ChangeValues => Self::ChangeValues(WireFormat::from_bytes(payload)?),
            CommandKind::ValuesChanged => Self::ValuesChanged(WireFormat::from_bytes(payload)?),
            CommandKind::RemoveInstances => {
                Self::RemoveInstances(WireFormat::from_bytes(payload)?)
            }
            CommandKind::RemoveProperties => {
                Self::RemoveProperties(WireFormat::from_bytes(payload)?)
            }
            CommandKind::InformationChanged => {
                Self::InformationChanged(WireFormat::from_bytes(payload)?)
            }
            CommandKind::ChildrenChanged => {
                Self::ChildrenChanged(WireFormat::from_bytes(payload)?)
            }
            CommandKind::ComponentCompleted => {
                Self::ComponentCompleted(WireFormat::from_bytes(payload)?)
            }
            CommandKind::Selection => Self::Selection(WireFormat::from_bytes(payload)?),
            CommandKind::Token => Self::Token(WireFormat::from_bytes(payload)?),
            CommandKind::DebugOutput => Self::DebugOutput(WireFormat::from_bytes(payload)?),
            CommandKind::StatePreviewImageChanged => {
                Self::StatePreviewImageChanged(WireFormat::from_bytes(payload)?)
            }
            CommandKind::Capture => Self::Capture(WireFormat::from_bytes(payload)?),
            CommandKind::InputEvent => Self::InputEvent(WireFormat::from_bytes(payload)?),
            CommandKind::View3DAction => Self::View3DAction(WireFormat::from_bytes(payload)?),
        };
        Ok(command)
    }
}

fn expect_empty(payload: &Bytes, command: &'static str) -> Result<(), DecodeError> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::TrailingBytes {
            command,
            count: payload.len(),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PuppetAlive => write!(f, "PuppetAliveCommand()"),
            Self::EndPuppet => write!(f, "EndPuppetCommand()"),
            Self::SceneCreated => write!(f, "SceneCreatedCommand()"),
            Self::Synchronize(c) => write!(f, "{c}"),
            Self::CreateScene(c) => write!(f, "{c}"),
            Self::ChangeValues(c) => write!(f, "{c}"),
            Self::ValuesChanged(c) => write!(f, "{c}"),
            Self::RemoveInstances(c) => write!(f, "{c}"),
            Self::RemoveProperties(c) => write!(f, "{c}"),
            Self::InformationChanged(c) => write!(f, "{c}"),
            Self::ChildrenChanged(c) => write!(f, "{c}"),
            Self::ComponentCompleted(c) => write!(f, "{c}"),
            Self::Selection(c) => write!(f, "{c}"),
            Self::Token(c) => write!(f, "{c}"),
            Self::DebugOutput(c) => write!(f, "{c}"),
            Self::StatePreviewImageChanged(c) => write!(f, "{c}"),
            Self::Capture(c) => write!(f, "{c}"),
            Self::InputEvent(c) => write!(f, "{c}"),
            Self::View3DAction(c) => write!(f, "{c}"),
        }
    }
}

macro_rules! impl_from_command {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Command {
                fn from(command: $ty) -> Self {
                    Self::$variant(command)
                }
            }
        )*
    };
}

impl_from_command!(
    Synchronize(SynchronizeCommand),
    CreateScene(CreateSceneCommand),
    ChangeValues(ChangeValuesCommand),
    ValuesChanged(ValuesChangedCommand),
    RemoveInstances(RemoveInstancesCommand),
    RemoveProperties(RemovePropertiesCommand),
    InformationChanged(InformationChangedCommand),
    ChildrenChanged(ChildrenChangedCommand),
    ComponentCompleted(ComponentCompletedCommand),
    Selection(SelectionCommand),
    Token(TokenCommand),
    DebugOutput(DebugOutputCommand),
    StatePreviewImageChanged(StatePreviewImageChangedCommand),
    Capture(CaptureCommand),
    InputEvent(InputEventCommand),
    View3DAction(View3DActionCommand),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::containers::{
        ImageContainer, InformationContainer, InformationName, InstanceContainer,
        PropertyAbstractContainer, PropertyValueContainer,
    };
    use crate::protocol::value::PropertyValue;
    use proptest::prelude::*;

    fn round_trip(command: &Command) -> Command {
        Command::decode(command.kind(), command.payload()).unwrap()
    }

    fn samples() -> Vec<Command> {
        vec![
            Command::PuppetAlive,
            Command::EndPuppet,
            Command::SceneCreated,
            SynchronizeCommand::new(i32::MIN).into(),
            CreateSceneCommand::new(vec![
                InstanceContainer::new(0, "QtQuick.Item", None),
                InstanceContainer::new(1, "QtQuick.Text", Some(0)),
            ])
            .into(),
            ChangeValuesCommand::new(vec![PropertyValueContainer::new(
                1,
                "text",
                PropertyValue::from(""),
            )])
            .into(),
            ValuesChangedCommand::new(vec![
                PropertyValueContainer::new(1, "font.pixelSize", PropertyValue::Int(12))
                    .with_dynamic_type("int"),
            ])
            .into(),
            RemoveInstancesCommand::new(vec![]).into(),
            RemovePropertiesCommand::new(vec![PropertyAbstractContainer::new(3, "x", "")]).into(),
            InformationChangedCommand::new(vec![InformationContainer::new(
                1,
                InformationName::Size,
                vec![PropertyValue::Double(10.0), PropertyValue::Double(20.5)],
            )])
            .into(),
            ChildrenChangedCommand::new(0, vec![1, 2], vec![]).into(),
            ComponentCompletedCommand::new(vec![0, 1]).into(),
            SelectionCommand::new(vec![i32::MAX]).into(),
            TokenCommand::new("", 0, vec![]).into(),
            DebugOutputCommand::new(DebugOutputType::Error, "x".repeat(70_000), vec![1]).into(),
            StatePreviewImageChangedCommand::new(vec![ImageContainer::new(4, vec![0u8; 1024])])
                .into(),
            CaptureCommand::new(2, vec![]).into(),
            InputEventCommand::mouse(InputEventType::MouseMove, -1.0, 1e9, 1, 0x0200_0000).into(),
            View3DActionCommand::new(View3DActionType::ShowGrid, PropertyValue::Bool(true)).into(),
        ]
    }

    #[test]
    fn test_every_kind_round_trips() {
        let samples = samples();
        assert_eq!(samples.len(), CommandKind::ALL.len());
        for command in &samples {
            assert_eq!(&round_trip(command), command, "kind {}", command.kind());
        }
    }

    #[test]
    fn test_empty_commands_reject_payload() {
        let err = Command::decode(CommandKind::PuppetAlive, Bytes::from_static(&[0])).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { count: 1, .. }));
    }

    #[test]
    fn test_every_truncation_fails() {
        for command in samples() {
            let payload = command.payload();
            for cut in 0..payload.len().min(64) {
                assert!(
                    Command::decode(command.kind(), payload.slice(..cut)).is_err(),
                    "{} truncated at {} decoded",
                    command.kind(),
                    cut
                );
            }
        }
    }

    #[test]
    fn test_display_is_human_readable() {
        let command: Command = TokenCommand::new("build", 7, vec![3]).into();
        assert_eq!(
            command.to_string(),
            "TokenCommand(tokenName: build, tokenNumber: 7, instances: [3])"
        );
        assert_eq!(Command::PuppetAlive.to_string(), "PuppetAliveCommand()");
    }

    fn value_strategy() -> impl Strategy<Value = PropertyValue> {
        prop_oneof![
            Just(PropertyValue::Invalid),
            any::<bool>().prop_map(PropertyValue::Bool),
            any::<i64>().prop_map(PropertyValue::Int),
            any::<f64>().prop_map(PropertyValue::Double),
            ".{0,24}".prop_map(PropertyValue::String),
            proptest::collection::vec(any::<u8>(), 0..64)
                .prop_map(|b| PropertyValue::Bytes(Bytes::from(b))),
            any::<u32>().prop_map(PropertyValue::Color),
            any::<i32>().prop_map(PropertyValue::InstanceRef),
        ]
    }

    proptest! {
        #[test]
        fn prop_token_round_trips(
            name in ".{0,32}",
            number in any::<i32>(),
            ids in proptest::collection::vec(any::<i32>(), 0..32),
        ) {
            let command: Command = TokenCommand::new(name, number, ids).into();
            prop_assert_eq!(round_trip(&command), command);
        }

        #[test]
        fn prop_debug_output_round_trips(
            kind in 0u32..4,
            text in ".{0,64}",
            ids in proptest::collection::vec(any::<i32>(), 0..8),
        ) {
            let output_type = DebugOutputType::from_u32(kind).unwrap();
            let original = DebugOutputCommand::new(output_type, text, ids);
            let decoded = DebugOutputCommand::from_bytes(original.to_bytes()).unwrap();
            prop_assert_eq!(decoded.instance_ids(), original.instance_ids());
            prop_assert_eq!(decoded, original);
        }

        #[test]
        fn prop_values_changed_round_trips(
            entries in proptest::collection::vec(
                (any::<i32>(), "[a-z./]{0,16}", value_strategy(), "[a-z]{0,6}"),
                0..8,
            ),
        ) {
            let values = entries
                .into_iter()
                .map(|(id, name, value, dynamic)| {
                    PropertyValueContainer::new(id, name, value).with_dynamic_type(dynamic)
                })
                .collect();
            let command: Command = ValuesChangedCommand::new(values).into();
            prop_assert_eq!(round_trip(&command), command);
        }

        #[test]
        fn prop_property_abstract_container_round_trips(
            id in any::<i32>(),
            name in ".{0,16}",
            dynamic in ".{0,8}",
        ) {
            let container = PropertyAbstractContainer::new(id, name, dynamic);
            let decoded = PropertyAbstractContainer::from_bytes(container.to_bytes()).unwrap();
            prop_assert_eq!(decoded, container);
        }

        #[test]
        fn prop_state_preview_round_trips(
            images in proptest::collection::vec(
                (any::<i32>(), proptest::collection::vec(any::<u8>(), 0..256)),
                0..6,
            ),
        ) {
            let images = images
                .into_iter()
                .map(|(id, bytes)| ImageContainer::new(id, bytes))
                .collect();
            let command: Command = StatePreviewImageChangedCommand::new(images).into();
            prop_assert_eq!(round_trip(&command), command);
        }
    }
}
