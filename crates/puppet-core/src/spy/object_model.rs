//! Reflection seam between the spy and whatever hosts the live objects

use crate::protocol::{InputEventCommand, PropertyValue, View3DActionCommand};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle of a live object inside the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque registration token returned by [`ObjectModel::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// What a property holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// A plain value
    Value,
    /// A nested object, possibly unset
    Object(Option<ObjectId>),
    /// An ordered list of objects
    List(Vec<ObjectId>),
}

/// One reflected property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    /// Has a change notification the spy can subscribe to
    pub notifiable: bool,
    pub writable: bool,
    pub kind: PropertyKind,
}

impl PropertyInfo {
    pub fn value(name: impl Into<String>, notifiable: bool, writable: bool) -> Self {
        Self {
            name: name.into(),
            notifiable,
            writable,
            kind: PropertyKind::Value,
        }
    }

    pub fn object(name: impl Into<String>, target: Option<ObjectId>, writable: bool) -> Self {
        Self {
            name: name.into(),
            notifiable: false,
            writable,
            kind: PropertyKind::Object(target),
        }
    }

    pub fn list(name: impl Into<String>, items: Vec<ObjectId>) -> Self {
        Self {
            name: name.into(),
            notifiable: false,
            writable: false,
            kind: PropertyKind::List(items),
        }
    }
}

/// Invoked synchronously with the new value whenever a subscribed property changes
pub type ChangeCallback = Arc<dyn Fn(&PropertyValue) + Send + Sync>;

/// Property reflection and change subscription
#[cfg_attr(test, mockall::automock)]
pub trait ObjectModel: Send + Sync {
    /// Properties of `object` in declaration order; empty for unknown objects
    fn properties(&self, object: ObjectId) -> Vec<PropertyInfo>;

    /// Subscribe to changes of `property`; `None` if the model refuses
    fn subscribe(
        &self,
        object: ObjectId,
        property: &str,
        callback: ChangeCallback,
    ) -> Option<SubscriptionId>;

    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Errors raised by a scene backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("object {object} has no property '{path}'")]
    UnknownProperty { object: ObjectId, path: String },

    #[error("property '{path}' is read-only")]
    ReadOnly { path: String },

    #[error("property '{path}' holds an object, not a value")]
    NotAValue { path: String },
}

/// Object creation and mutation on top of reflection
pub trait SceneBackend: ObjectModel {
    /// Create an object of `type_name`; unknown types produce a bare object
    fn create_object(&self, type_name: &str) -> ObjectId;

    /// Destroy `object` and every sub-object it owns
    fn destroy_object(&self, object: ObjectId);

    fn type_name(&self, object: ObjectId) -> Option<String>;

    fn set_parent(&self, object: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError>;

    /// Write a value at a `.`/`/` separated path relative to `object`
    fn write_property(
        &self,
        object: ObjectId,
        path: &str,
        value: PropertyValue,
    ) -> Result<(), SceneError>;

    /// Restore the default value at `path`
    fn reset_property(&self, object: ObjectId, path: &str) -> Result<(), SceneError>;

    fn render_preview(&self, object: ObjectId) -> Option<Bytes>;

    fn handle_input(&self, event: &InputEventCommand);

    fn handle_view_action(&self, action: &View3DActionCommand);
}
