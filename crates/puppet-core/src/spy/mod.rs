//! Instance-signal spy
//!
//! Walks the property graph of a node instance's root object and subscribes
//! every notifiable property to a dispatch closure. Each closure knows the
//! logical path of its property relative to the root and turns a change
//! into a `ValuesChanged` command on the outbound queue.
//!
//! Paths use `.` after read-only object properties (`font.pixelSize`) and
//! `/` after writable object properties and list elements
//! (`anchors/fill`, `data/x`). List elements share the list's prefix unless
//! [`SpyConfig::index_list_elements`] is set, which yields `data/0/x`.
//!
//! Closures hold only a weak reference to the instance's liveness token and
//! check that the outbound receiver still exists, so changes that arrive
//! after teardown are dropped silently.

pub mod memory;
pub mod object_model;

pub use memory::MemoryScene;
pub use object_model::{
    ChangeCallback, ObjectId, ObjectModel, PropertyInfo, PropertyKind, SceneBackend, SceneError,
    SubscriptionId,
};

use crate::config::SpyConfig;
use crate::protocol::{Command, PropertyValue, PropertyValueContainer, ValuesChangedCommand};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// Errors raised while registering an instance
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpyError {
    /// The model reported a notifiable property but refused the subscription
    #[error("subscription rejected for notifiable property '{path}' of {object}")]
    SubscribeRejected { object: ObjectId, path: String },
}

/// Liveness token owned by a node instance; spy closures keep a `Weak` to it
pub type InstanceLiveness = Arc<()>;

/// Registration table for one spied node instance
#[derive(Debug, Default)]
pub struct SignalSpy {
    instance_id: i32,
    paths: BTreeMap<SubscriptionId, String>,
}

/// Where a change notification goes
struct Target {
    instance_id: i32,
    liveness: Weak<()>,
    sender: UnboundedSender<Command>,
    config: SpyConfig,
}

impl SignalSpy {
    /// Subscribe every notifiable property reachable from `root`
    ///
    /// On a rejected subscription everything registered so far is undone.
    pub fn register(
        model: &dyn ObjectModel,
        root: ObjectId,
        instance_id: i32,
        liveness: &InstanceLiveness,
        sender: UnboundedSender<Command>,
        config: SpyConfig,
    ) -> Result<Self, SpyError> {
        let target = Target {
            instance_id,
            liveness: Arc::downgrade(liveness),
            sender,
            config,
        };
        let mut spy = Self {
            instance_id,
            paths: BTreeMap::new(),
        };
        let mut visited = HashSet::new();
        visited.insert(root);

        if let Err(err) = spy.walk(model, &target, root, "", &mut visited) {
            spy.unregister(model);
            return Err(err);
        }

        debug!(
            "Spying {} properties of instance {}",
            spy.paths.len(),
            instance_id
        );
        Ok(spy)
    }

    fn walk(
        &mut self,
        model: &dyn ObjectModel,
        target: &Target,
        object: ObjectId,
        prefix: &str,
        visited: &mut HashSet<ObjectId>,
    ) -> Result<(), SpyError> {
        for property in model.properties(object) {
            let path = format!("{}{}", prefix, property.name);

            if property.notifiable {
                let callback = target.callback(path.clone());
                match model.subscribe(object, &property.name, callback) {
                    Some(token) => {
                        trace!("Registered {:?} -> {}", token, path);
                        self.paths.insert(token, path.clone());
                    }
                    None => {
                        return Err(SpyError::SubscribeRejected { object, path });
                    }
                }
            }

            match property.kind {
                PropertyKind::Value | PropertyKind::Object(None) => {}
                PropertyKind::Object(Some(child)) => {
                    let separator = if property.writable { '/' } else { '.' };
                    if visited.insert(child) {
                        let nested = format!("{}{}", path, separator);
                        self.walk(model, target, child, &nested, visited)?;
                    }
                }
                PropertyKind::List(items) => {
                    for (index, child) in items.into_iter().enumerate() {
                        if !visited.insert(child) {
                            continue;
                        }
                        let nested = if target.config.index_list_elements {
                            format!("{}/{}/", path, index)
                        } else {
                            format!("{}/", path)
                        };
                        self.walk(model, target, child, &nested, visited)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    /// Logical path registered for `token`
    pub fn path(&self, token: SubscriptionId) -> Option<&str> {
        self.paths.get(&token).map(String::as_str)
    }

    /// All registered paths in registration-token order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Drop every subscription held by this spy
    pub fn unregister(&mut self, model: &dyn ObjectModel) {
        for token in std::mem::take(&mut self.paths).into_keys() {
            model.unsubscribe(token);
        }
    }
}

impl Target {
    fn callback(&self, path: String) -> ChangeCallback {
        let instance_id = self.instance_id;
        let liveness = self.liveness.clone();
        let sender = self.sender.clone();
        Arc::new(move |value: &PropertyValue| {
            if liveness.strong_count() == 0 || sender.is_closed() {
                return;
            }
            let change = PropertyValueContainer::new(instance_id, path.clone(), value.clone());
            let _ = sender.send(ValuesChangedCommand::new(vec![change]).into());
        })
    }
}
