//! Node-instance arena
//!
//! The table is the sole owner of every [`NodeInstance`]. Other components
//! refer to instances by id only and tolerate ids that have gone away.

use crate::config::SpyConfig;
use crate::protocol::Command;
use crate::spy::{InstanceLiveness, ObjectId, ObjectModel, SignalSpy, SpyError};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("instance id {0} is already in use")]
    DuplicateId(i32),
}

/// One live object known to the designer by id
#[derive(Debug)]
pub struct NodeInstance {
    id: i32,
    object: ObjectId,
    type_name: String,
    parent: Option<i32>,
    liveness: InstanceLiveness,
    spy: SignalSpy,
}

impl NodeInstance {
    /// Wrap `object` and start spying on its properties
    pub fn attach(
        id: i32,
        object: ObjectId,
        type_name: impl Into<String>,
        parent: Option<i32>,
        model: &dyn ObjectModel,
        sender: UnboundedSender<Command>,
        config: SpyConfig,
    ) -> Result<Self, SpyError> {
        let liveness = InstanceLiveness::default();
        let spy = SignalSpy::register(model, object, id, &liveness, sender, config)?;
        Ok(Self {
            id,
            object,
            type_name: type_name.into(),
            parent,
            liveness,
            spy,
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parent(&self) -> Option<i32> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<i32>) {
        self.parent = parent;
    }

    pub fn spy(&self) -> &SignalSpy {
        &self.spy
    }

    /// Stop spying and drop the liveness token
    fn detach(mut self, model: &dyn ObjectModel) -> ObjectId {
        self.spy.unregister(model);
        drop(self.liveness);
        self.object
    }
}

/// Arena of node instances keyed by id
#[derive(Debug, Default)]
pub struct InstanceTable {
    instances: BTreeMap<i32, NodeInstance>,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: NodeInstance) -> Result<(), InstanceError> {
        if self.instances.contains_key(&instance.id) {
            return Err(InstanceError::DuplicateId(instance.id));
        }
        self.instances.insert(instance.id, instance);
        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&NodeInstance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut NodeInstance> {
        self.instances.get_mut(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.instances.contains_key(&id)
    }

    /// Remove an instance, unsubscribe its spy and return its object
    ///
    /// The liveness token is dropped here, so late notifications are ignored.
    pub fn remove(&mut self, id: i32, model: &dyn ObjectModel) -> Option<ObjectId> {
        let instance = self.instances.remove(&id)?;
        Some(instance.detach(model))
    }

    /// Ids in ascending order
    pub fn ids(&self) -> Vec<i32> {
        self.instances.keys().copied().collect()
    }

    /// Direct children of `parent`, ascending
    pub fn children_of(&self, parent: i32) -> Vec<i32> {
        self.instances
            .values()
            .filter(|i| i.parent == Some(parent))
            .map(|i| i.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeInstance> {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Remove every instance, returning their objects
    pub fn clear(&mut self, model: &dyn ObjectModel) -> Vec<ObjectId> {
        std::mem::take(&mut self.instances)
            .into_values()
            .map(|instance| instance.detach(model))
            .collect()
    }
}
