//! Worker-side command handling

use super::PuppetMode;
use crate::config::SpyConfig;
use crate::error::{PuppetError, PuppetResult};
use crate::instance::{InstanceTable, NodeInstance};
use crate::protocol::{
    CaptureCommand, ChangeValuesCommand, ChildrenChangedCommand, Command,
    ComponentCompletedCommand, CreateSceneCommand, DebugOutputCommand, DebugOutputType,
    ImageContainer, InformationChangedCommand, InformationContainer, InformationName,
    InstanceContainer, PropertyValue, RemoveInstancesCommand, RemovePropertiesCommand,
    StatePreviewImageChangedCommand,
};
use crate::spy::{ObjectId, SceneBackend};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Whether the dispatch loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFlow {
    Continue,
    Stop,
}

/// Applies designer commands to a scene backend and queues the responses
pub struct NodeInstanceServer<B> {
    backend: Arc<B>,
    instances: InstanceTable,
    selection: Vec<i32>,
    outbound: UnboundedSender<Command>,
    mode: PuppetMode,
    spy: SpyConfig,
}

impl<B: SceneBackend> NodeInstanceServer<B> {
    /// Create a server and the queue its responses and spy notifications go to
    pub fn new(
        backend: Arc<B>,
        mode: PuppetMode,
        spy: SpyConfig,
    ) -> (Self, UnboundedReceiver<Command>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let server = Self {
            backend,
            instances: InstanceTable::new(),
            selection: Vec::new(),
            outbound,
            mode,
            spy,
        };
        (server, receiver)
    }

    pub fn mode(&self) -> PuppetMode {
        self.mode
    }

    pub fn instances(&self) -> &InstanceTable {
        &self.instances
    }

    pub fn selection(&self) -> &[i32] {
        &self.selection
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Handle one decoded command
    ///
    /// Only internal failures (a rejected spy subscription) are errors; stale
    /// ids and refused writes are reported back as debug output.
    pub fn handle(&mut self, command: Command) -> PuppetResult<ServerFlow> {
        debug!("Handling {}", command);
        match command {
            Command::CreateScene(cmd) => self.create_scene(cmd)?,
            Command::ChangeValues(cmd) => self.change_values(cmd),
            Command::RemoveInstances(cmd) => self.remove_instances(cmd),
            Command::RemoveProperties(cmd) => self.remove_properties(cmd),
            Command::Selection(cmd) => {
                let mut ids: Vec<i32> = cmd
                    .instance_ids()
                    .iter()
                    .copied()
                    .filter(|id| self.instances.contains(*id))
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                self.selection = ids;
            }
            Command::Token(mut cmd) => {
                cmd.sort();
                self.send(cmd);
            }
            Command::Capture(cmd) => self.capture(cmd),
            Command::InputEvent(event) => self.backend.handle_input(&event),
            Command::View3DAction(action) => self.backend.handle_view_action(&action),
            Command::Synchronize(cmd) => self.send(cmd),
            Command::EndPuppet => {
                info!("End of session requested");
                return Ok(ServerFlow::Stop);
            }
            other => {
                self.warn(format!("Unexpected command from designer: {}", other.kind()), vec![]);
            }
        }
        Ok(ServerFlow::Continue)
    }

    /// Report a frame whose kind this build does not know
    pub fn report_unknown(&self, kind: u32) {
        self.warn(format!("Unknown command kind {} ignored", kind), vec![]);
    }

    /// Remove every instance and destroy its object
    pub fn clear(&mut self) {
        for object in self.instances.clear(&*self.backend) {
            self.backend.destroy_object(object);
        }
        self.selection.clear();
    }

    fn send(&self, command: impl Into<Command>) {
        // The receiver lives as long as the dispatch loop; after that nothing is listening.
        let _ = self.outbound.send(command.into());
    }

    fn warn(&self, text: String, instance_ids: Vec<i32>) {
        warn!("{}", text);
        self.send(DebugOutputCommand::new(
            DebugOutputType::Warning,
            text,
            instance_ids,
        ));
    }

    fn object_of(&self, id: i32) -> Option<ObjectId> {
        self.instances.get(id).map(NodeInstance::object)
    }

    fn create_scene(&mut self, cmd: CreateSceneCommand) -> PuppetResult<()> {
        let mut created: Vec<(InstanceContainer, ObjectId)> = Vec::new();
        for container in cmd.instances() {
            let id = container.instance_id();
            if self.instances.contains(id) || created.iter().any(|(c, _)| c.instance_id() == id) {
                self.warn(format!("Instance id {} already exists", id), vec![id]);
                continue;
            }
            let object = self.backend.create_object(container.type_name());
            created.push((container.clone(), object));
        }

        for (container, object) in &created {
            let Some(parent) = container.parent_id() else {
                continue;
            };
            let parent_object = created
                .iter()
                .find(|(c, _)| c.instance_id() == parent)
                .map(|(_, o)| *o)
                .or_else(|| self.object_of(parent));
            match parent_object {
                Some(parent_object) => {
                    if let Err(err) = self.backend.set_parent(*object, Some(parent_object)) {
                        self.warn(err.to_string(), vec![container.instance_id()]);
                    }
                }
                None => self.warn(
                    format!("Parent {} of instance {} is unknown", parent, container.instance_id()),
                    vec![container.instance_id()],
                ),
            }
        }

        let mut informations = Vec::new();
        let mut parents = BTreeSet::new();
        let mut completed = Vec::new();
        let mut pending = created.into_iter();
        while let Some((container, object)) = pending.next() {
            let id = container.instance_id();
            let attached = NodeInstance::attach(
                id,
                object,
                container.type_name(),
                container.parent_id(),
                &*self.backend,
                self.outbound.clone(),
                self.spy,
            )
            .map_err(PuppetError::from)
            .and_then(|instance| {
                self.instances
                    .insert(instance)
                    .map_err(|e| PuppetError::invalid_input(e.to_string()))
            });
            if let Err(e) = attached {
                // Objects never entered the instance table; nothing else owns them.
                let orphans: Vec<_> = std::iter::once(object)
                    .chain(pending.map(|(_, object)| object))
                    .collect();
                warn!("Destroying {} unattached objects: {}", orphans.len(), e);
                for orphan in orphans {
                    self.backend.destroy_object(orphan);
                }
                return Err(e);
            }

            informations.push(InformationContainer::new(
                id,
                InformationName::TypeName,
                vec![PropertyValue::from(container.type_name())],
            ));
            if let Some(parent) = container.parent_id() {
                informations.push(InformationContainer::new(
                    id,
                    InformationName::Parent,
                    vec![PropertyValue::InstanceRef(parent)],
                ));
                parents.insert(parent);
            }
            completed.push(id);
        }

        if completed.is_empty() {
            self.send(Command::SceneCreated);
            return Ok(());
        }

        self.send(InformationChangedCommand::new(informations));
        for parent in parents {
            let children = self.instances.children_of(parent);
            self.send(ChildrenChangedCommand::new(parent, children, vec![]));
        }
        self.send(ComponentCompletedCommand::new(completed.clone()));
        self.send(Command::SceneCreated);

        if self.mode.renders_on_change() {
            self.send_previews(&completed);
        }
        Ok(())
    }

    fn change_values(&mut self, cmd: ChangeValuesCommand) {
        let mut touched = BTreeSet::new();
        for container in cmd.values() {
            let id = container.instance_id();
            let Some(object) = self.object_of(id) else {
                debug!("Skipping value for removed instance {}", id);
                continue;
            };
            match self
                .backend
                .write_property(object, container.name(), container.value().clone())
            {
                Ok(()) => {
                    touched.insert(id);
                }
                Err(err) => self.warn(err.to_string(), vec![id]),
            }
        }
        if self.mode.renders_on_change() && !touched.is_empty() {
            let ids: Vec<i32> = touched.into_iter().collect();
            self.send_previews(&ids);
        }
    }

    fn remove_instances(&mut self, cmd: RemoveInstancesCommand) {
        for &id in cmd.instance_ids() {
            match self.instances.remove(id, &*self.backend) {
                Some(object) => self.backend.destroy_object(object),
                None => debug!("Instance {} already removed", id),
            }
        }
        let instances = &self.instances;
        self.selection.retain(|id| instances.contains(*id));
    }

    fn remove_properties(&mut self, cmd: RemovePropertiesCommand) {
        for property in cmd.properties() {
            let id = property.instance_id();
            let Some(object) = self.object_of(id) else {
                debug!("Skipping reset for removed instance {}", id);
                continue;
            };
            if let Err(err) = self.backend.reset_property(object, property.name()) {
                self.warn(err.to_string(), vec![id]);
            }
        }
    }

    fn capture(&mut self, cmd: CaptureCommand) {
        let ids = if cmd.captures_all() {
            self.instances.ids()
        } else {
            cmd.instance_ids().to_vec()
        };
        debug!("Capture step {} for {} instances", cmd.step(), ids.len());
        self.send_previews(&ids);
    }

    fn send_previews(&self, ids: &[i32]) {
        let images = ids
            .iter()
            .filter_map(|&id| {
                let object = self.object_of(id)?;
                let image = self.backend.render_preview(object)?;
                Some(ImageContainer::new(id, image))
            })
            .collect();
        let mut command = StatePreviewImageChangedCommand::new(images);
        command.sort();
        self.send(command);
    }
}
