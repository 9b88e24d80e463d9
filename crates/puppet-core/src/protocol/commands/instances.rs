//! Instance lifecycle and tree commands

use crate::protocol::containers::{InformationContainer, InstanceContainer};
use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// Declares a command whose whole payload is one list of instance ids.
macro_rules! id_list_command {
    ($(#[$meta:meta])* $name:ident, $wire:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            instance_ids: Vec<i32>,
        }

        impl $name {
            pub fn new(instance_ids: Vec<i32>) -> Self {
                Self { instance_ids }
            }

            pub fn instance_ids(&self) -> &[i32] {
                &self.instance_ids
            }
        }

        impl WireFormat for $name {
            const NAME: &'static str = $wire;

            fn write_to(&self, out: &mut WireWriter) {
                out.put_ids(&self.instance_ids);
            }

            fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
                Ok(Self {
                    instance_ids: input.get_ids("instanceIds")?,
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}Command(instances: {:?})", $wire, self.instance_ids)
            }
        }
    };
}

id_list_command!(
    /// Designer to worker: destroy these instances.
    RemoveInstancesCommand,
    "RemoveInstances"
);

id_list_command!(
    /// Worker to designer: these instances finished construction.
    ComponentCompletedCommand,
    "ComponentCompleted"
);

id_list_command!(
    /// The current selection, sent in either direction.
    SelectionCommand,
    "Selection"
);

/// Designer to worker: instantiate a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSceneCommand {
    instances: Vec<InstanceContainer>,
}

impl CreateSceneCommand {
    pub fn new(instances: Vec<InstanceContainer>) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &[InstanceContainer] {
        &self.instances
    }
}

impl WireFormat for CreateSceneCommand {
    const NAME: &'static str = "CreateScene";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.instances);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            instances: input.get_seq("instances")?,
        })
    }
}

impl fmt::Display for CreateSceneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CreateSceneCommand(")?;
        for (index, instance) in self.instances.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", instance.instance_id(), instance.type_name())?;
        }
        write!(f, ")")
    }
}

/// Worker to designer: facts about instances (type, parent, size, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InformationChangedCommand {
    informations: Vec<InformationContainer>,
}

impl InformationChangedCommand {
    pub fn new(informations: Vec<InformationContainer>) -> Self {
        Self { informations }
    }

    pub fn informations(&self) -> &[InformationContainer] {
        &self.informations
    }
}

impl WireFormat for InformationChangedCommand {
    const NAME: &'static str = "InformationChanged";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.informations);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            informations: input.get_seq("informations")?,
        })
    }
}

impl fmt::Display for InformationChangedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InformationChangedCommand({} entries)",
            self.informations.len()
        )
    }
}

/// Worker to designer: the child list of a parent instance changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildrenChangedCommand {
    parent_instance_id: i32,
    children: Vec<i32>,
    informations: Vec<InformationContainer>,
}

impl ChildrenChangedCommand {
    pub fn new(
        parent_instance_id: i32,
        children: Vec<i32>,
        informations: Vec<InformationContainer>,
    ) -> Self {
        Self {
            parent_instance_id,
            children,
            informations,
        }
    }

    pub fn parent_instance_id(&self) -> i32 {
        self.parent_instance_id
    }

    pub fn children(&self) -> &[i32] {
        &self.children
    }

    pub fn informations(&self) -> &[InformationContainer] {
        &self.informations
    }
}

impl WireFormat for ChildrenChangedCommand {
    const NAME: &'static str = "ChildrenChanged";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.parent_instance_id);
        out.put_ids(&self.children);
        out.put_seq(&self.informations);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            parent_instance_id: input.get_i32("parentInstanceId")?,
            children: input.get_ids("children")?,
            informations: input.get_seq("informations")?,
        })
    }
}

impl fmt::Display for ChildrenChangedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChildrenChangedCommand(parent: {}, children: {:?})",
            self.parent_instance_id, self.children
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list_commands_share_layout() {
        let a = RemoveInstancesCommand::new(vec![1, 2]).to_bytes();
        let b = SelectionCommand::new(vec![1, 2]).to_bytes();
        let c = ComponentCompletedCommand::new(vec![1, 2]).to_bytes();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_empty_selection() {
        let command = SelectionCommand::default();
        assert_eq!(&command.to_bytes()[..], &[0, 0, 0, 0]);
        assert_eq!(command.to_string(), "SelectionCommand(instances: [])");
    }

    #[test]
    fn test_children_changed_round_trip() {
        let command = ChildrenChangedCommand::new(0, vec![1, 2, 3], vec![]);
        let decoded = ChildrenChangedCommand::from_bytes(command.to_bytes()).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(decoded.children(), &[1, 2, 3]);
    }
}
