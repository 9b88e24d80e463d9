//! Command kind discriminators

use std::fmt;

/// The 32-bit discriminator written in every frame header.
///
/// Values are stable across versions. Zero is reserved; numbers this build
/// does not know are reported by [`CommandKind::from_u32`] as `None` so that
/// newer workers can add kinds without breaking older designers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum CommandKind {
    PuppetAlive = 1,
    Synchronize = 2,
    EndPuppet = 3,
    CreateScene = 4,
    SceneCreated = 5,
    ChangeValues = 6,
    ValuesChanged = 7,
    RemoveInstances = 8,
    RemoveProperties = 9,
    InformationChanged = 10,
    ChildrenChanged = 11,
    ComponentCompleted = 12,
    Selection = 13,
    Token = 14,
    DebugOutput = 15,
    StatePreviewImageChanged = 16,
    Capture = 17,
    InputEvent = 18,
    View3DAction = 19,
}

impl CommandKind {
    pub const ALL: [CommandKind; 19] = [
        Self::PuppetAlive,
        Self::Synchronize,
        Self::EndPuppet,
        Self::CreateScene,
        Self::SceneCreated,
        Self::ChangeValues,
        Self::ValuesChanged,
        Self::RemoveInstances,
        Self::RemoveProperties,
        Self::InformationChanged,
        Self::ChildrenChanged,
        Self::ComponentCompleted,
        Self::Selection,
        Self::Token,
        Self::DebugOutput,
        Self::StatePreviewImageChanged,
        Self::Capture,
        Self::InputEvent,
        Self::View3DAction,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_u32() == value)
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PuppetAlive => "PuppetAlive",
            Self::Synchronize => "Synchronize",
            Self::EndPuppet => "EndPuppet",
            Self::CreateScene => "CreateScene",
            Self::SceneCreated => "SceneCreated",
            Self::ChangeValues => "ChangeValues",
            Self::ValuesChanged => "ValuesChanged",
            Self::RemoveInstances => "RemoveInstances",
            Self::RemoveProperties => "RemoveProperties",
            Self::InformationChanged => "InformationChanged",
            Self::ChildrenChanged => "ChildrenChanged",
            Self::ComponentCompleted => "ComponentCompleted",
            Self::Selection => "Selection",
            Self::Token => "Token",
            Self::DebugOutput => "DebugOutput",
            Self::StatePreviewImageChanged => "StatePreviewImageChanged",
            Self::Capture => "Capture",
            Self::InputEvent => "InputEvent",
            Self::View3DAction => "View3DAction",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
