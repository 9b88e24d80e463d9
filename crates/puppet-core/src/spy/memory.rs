//! In-process scene backend
//!
//! `MemoryScene` keeps a small object graph with a fixed catalogue of item
//! types. It backs the worker binary, the self-test, stream replay and the
//! tests, and behaves like a reflective object system: values change only
//! through [`SceneBackend::write_property`], and every effective change
//! invokes the subscribed callbacks synchronously, outside the scene lock.

use super::object_model::{
    ChangeCallback, ObjectId, ObjectModel, PropertyInfo, PropertyKind, SceneBackend, SceneError,
    SubscriptionId,
};
use crate::config::RenderConfig;
use crate::protocol::{InputEventCommand, PropertyValue, View3DActionCommand};
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const OPAQUE_BLACK: u32 = 0xff00_0000;
const OPAQUE_WHITE: u32 = 0xffff_ffff;
const PREVIEW_GRAY: u32 = 0xffc0_c0c0;

#[derive(Debug, Clone)]
enum Slot {
    Value {
        current: PropertyValue,
        default: PropertyValue,
    },
    Object(Option<ObjectId>),
    List(Vec<ObjectId>),
}

#[derive(Debug, Clone)]
struct MemoryProperty {
    name: String,
    notifiable: bool,
    writable: bool,
    slot: Slot,
}

#[derive(Debug, Default)]
struct MemoryObject {
    type_name: String,
    parent: Option<ObjectId>,
    properties: Vec<MemoryProperty>,
    /// Sub-objects destroyed together with this one
    owned: Vec<ObjectId>,
}

impl MemoryObject {
    fn property(&self, name: &str) -> Option<&MemoryProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn property_mut(&mut self, name: &str) -> Option<&mut MemoryProperty> {
        self.properties.iter_mut().find(|p| p.name == name)
    }
}

struct Subscription {
    object: ObjectId,
    property: String,
    callback: ChangeCallback,
}

#[derive(Default)]
struct SceneState {
    next_object: u64,
    next_subscription: u64,
    objects: HashMap<ObjectId, MemoryObject>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl SceneState {
    fn allocate(&mut self, type_name: &str) -> ObjectId {
        self.next_object += 1;
        let id = ObjectId(self.next_object);
        self.objects.insert(
            id,
            MemoryObject {
                type_name: type_name.to_string(),
                ..Default::default()
            },
        );
        id
    }

    fn push_property(&mut self, object: ObjectId, property: MemoryProperty) {
        if let Some(target) = self.objects.get_mut(&object) {
            target.properties.retain(|p| p.name != property.name);
            target.properties.push(property);
        }
    }

    fn value(&mut self, object: ObjectId, name: &str, initial: PropertyValue) {
        self.push_property(
            object,
            MemoryProperty {
                name: name.to_string(),
                notifiable: true,
                writable: true,
                slot: Slot::Value {
                    current: initial.clone(),
                    default: initial,
                },
            },
        );
    }

    /// Allocate a sub-object owned by `owner` and expose it read-only as `name`
    fn grouped(&mut self, owner: ObjectId, name: &str, type_name: &str) -> ObjectId {
        let child = self.allocate(type_name);
        if let Some(target) = self.objects.get_mut(&owner) {
            target.owned.push(child);
        }
        self.push_property(
            owner,
            MemoryProperty {
                name: name.to_string(),
                notifiable: false,
                writable: false,
                slot: Slot::Object(Some(child)),
            },
        );
        child
    }

    /// Walk `path` from `object` to the object holding the final segment
    fn resolve<'p>(
        &self,
        object: ObjectId,
        path: &'p str,
    ) -> Result<(ObjectId, &'p str), SceneError> {
        let mut current = object;
        let mut segments = path.split(['.', '/']).filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                return Ok((current, segment));
            }
            let holder = self
                .objects
                .get(&current)
                .ok_or(SceneError::UnknownObject(current))?;
            let unknown = || SceneError::UnknownProperty {
                object,
                path: path.to_string(),
            };
            let property = holder.property(segment).ok_or_else(unknown)?;
            current = match &property.slot {
                Slot::Object(Some(target)) => *target,
                Slot::List(items) => {
                    let index = segments
                        .next()
                        .and_then(|s| s.parse::<usize>().ok())
                        .ok_or_else(unknown)?;
                    if segments.peek().is_none() {
                        return Err(SceneError::NotAValue {
                            path: path.to_string(),
                        });
                    }
                    *items.get(index).ok_or_else(unknown)?
                }
                _ => return Err(unknown()),
            };
        }
        Err(SceneError::UnknownProperty {
            object,
            path: path.to_string(),
        })
    }

    fn callbacks_for(&self, object: ObjectId, property: &str) -> Vec<ChangeCallback> {
        self.subscriptions
            .values()
            .filter(|s| s.object == object && s.property == property)
            .map(|s| s.callback.clone())
            .collect()
    }

    fn destroy(&mut self, object: ObjectId) {
        let Some(removed) = self.objects.remove(&object) else {
            return;
        };
        for child in removed.owned {
            self.destroy(child);
        }
        self.subscriptions.retain(|_, s| s.object != object);
    }
}

/// Reflective in-memory object graph
pub struct MemoryScene {
    state: Mutex<SceneState>,
    render: RenderConfig,
    input: Mutex<Vec<InputEventCommand>>,
    view_actions: Mutex<Vec<View3DActionCommand>>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl MemoryScene {
    pub fn new(render: RenderConfig) -> Self {
        Self {
            state: Mutex::new(SceneState::default()),
            render,
            input: Mutex::new(Vec::new()),
            view_actions: Mutex::new(Vec::new()),
        }
    }

    /// Insert an object with no properties
    pub fn insert_object(&self, type_name: &str) -> ObjectId {
        self.state.lock().allocate(type_name)
    }

    /// Add or replace a value property
    pub fn define_value(
        &self,
        object: ObjectId,
        name: &str,
        initial: PropertyValue,
        notifiable: bool,
        writable: bool,
    ) {
        self.state.lock().push_property(
            object,
            MemoryProperty {
                name: name.to_string(),
                notifiable,
                writable,
                slot: Slot::Value {
                    current: initial.clone(),
                    default: initial,
                },
            },
        );
    }

    /// Add or replace an object-valued property; the target is not owned
    pub fn define_object(
        &self,
        object: ObjectId,
        name: &str,
        target: Option<ObjectId>,
        writable: bool,
    ) {
        self.state.lock().push_property(
            object,
            MemoryProperty {
                name: name.to_string(),
                notifiable: false,
                writable,
                slot: Slot::Object(target),
            },
        );
    }

    /// Add or replace a list property
    pub fn define_list(&self, object: ObjectId, name: &str, items: Vec<ObjectId>) {
        self.state.lock().push_property(
            object,
            MemoryProperty {
                name: name.to_string(),
                notifiable: false,
                writable: false,
                slot: Slot::List(items),
            },
        );
    }

    /// Current value at `path`, if it names a value property
    pub fn value(&self, object: ObjectId, path: &str) -> Option<PropertyValue> {
        let state = self.state.lock();
        let (holder, name) = state.resolve(object, path).ok()?;
        match &state.objects.get(&holder)?.property(name)?.slot {
            Slot::Value { current, .. } => Some(current.clone()),
            _ => None,
        }
    }

    pub fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.state.lock().objects.get(&object)?.parent
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.state.lock().objects.contains_key(&object)
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Input events forwarded so far
    pub fn received_input(&self) -> Vec<InputEventCommand> {
        self.input.lock().clone()
    }

    /// 3D view actions forwarded so far
    pub fn received_view_actions(&self) -> Vec<View3DActionCommand> {
        self.view_actions.lock().clone()
    }

    fn assign(
        &self,
        object: ObjectId,
        path: &str,
        value: Option<PropertyValue>,
    ) -> Result<(), SceneError> {
        let (callbacks, new_value) = {
            let mut state = self.state.lock();
            let (holder, name) = state.resolve(object, path)?;
            let target = state
                .objects
                .get_mut(&holder)
                .ok_or(SceneError::UnknownObject(holder))?;
            let property = target
                .property_mut(name)
                .ok_or_else(|| SceneError::UnknownProperty {
                    object,
                    path: path.to_string(),
                })?;
            if !property.writable {
                return Err(SceneError::ReadOnly {
                    path: path.to_string(),
                });
            }
            let notifiable = property.notifiable;
            let Slot::Value { current, default } = &mut property.slot else {
                return Err(SceneError::NotAValue {
                    path: path.to_string(),
                });
            };
            let new_value = value.unwrap_or_else(|| default.clone());
            if *current == new_value {
                return Ok(());
            }
            *current = new_value.clone();
            let callbacks = if notifiable {
                state.callbacks_for(holder, name)
            } else {
                Vec::new()
            };
            (callbacks, new_value)
        };

        for callback in callbacks {
            callback(&new_value);
        }
        Ok(())
    }

    fn populate(state: &mut SceneState, object: ObjectId, type_name: &str) {
        state.value(object, "objectName", PropertyValue::from(""));
        let short = type_name.rsplit('.').next().unwrap_or(type_name);
        if !matches!(short, "Item" | "Rectangle" | "Text" | "Image") {
            return;
        }

        for name in ["x", "y", "z", "width", "height"] {
            state.value(object, name, PropertyValue::Double(0.0));
        }
        state.value(object, "opacity", PropertyValue::Double(1.0));
        state.value(object, "visible", PropertyValue::Bool(true));

        match short {
            "Rectangle" => {
                state.value(object, "color", PropertyValue::Color(OPAQUE_WHITE));
                state.value(object, "radius", PropertyValue::Double(0.0));
                let border = state.grouped(object, "border", "QQuickPen");
                state.value(border, "width", PropertyValue::Double(1.0));
                state.value(border, "color", PropertyValue::Color(OPAQUE_BLACK));
            }
            "Text" => {
                state.value(object, "text", PropertyValue::from(""));
                state.value(object, "color", PropertyValue::Color(OPAQUE_BLACK));
                let font = state.grouped(object, "font", "QFont");
                state.value(font, "family", PropertyValue::from("Sans"));
                state.value(font, "pixelSize", PropertyValue::Int(12));
                state.value(font, "bold", PropertyValue::Bool(false));
            }
            "Image" => {
                state.value(object, "source", PropertyValue::from(""));
                state.value(object, "fillMode", PropertyValue::Int(0));
            }
            _ => {}
        }
    }
}

impl ObjectModel for MemoryScene {
    fn properties(&self, object: ObjectId) -> Vec<PropertyInfo> {
        let state = self.state.lock();
        let Some(target) = state.objects.get(&object) else {
            return Vec::new();
        };
        target
            .properties
            .iter()
            .map(|p| PropertyInfo {
                name: p.name.clone(),
                notifiable: p.notifiable,
                writable: p.writable,
                kind: match &p.slot {
                    Slot::Value { .. } => PropertyKind::Value,
                    Slot::Object(target) => PropertyKind::Object(*target),
                    Slot::List(items) => PropertyKind::List(items.clone()),
                },
            })
            .collect()
    }

    fn subscribe(
        &self,
        object: ObjectId,
        property: &str,
        callback: ChangeCallback,
    ) -> Option<SubscriptionId> {
        let mut state = self.state.lock();
        let notifiable = state
            .objects
            .get(&object)
            .and_then(|o| o.property(property))
            .is_some_and(|p| p.notifiable);
        if !notifiable {
            return None;
        }
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscriptions.insert(
            id,
            Subscription {
                object,
                property: property.to_string(),
                callback,
            },
        );
        Some(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.state.lock().subscriptions.remove(&subscription);
    }
}

impl SceneBackend for MemoryScene {
    fn create_object(&self, type_name: &str) -> ObjectId {
        let mut state = self.state.lock();
        let object = state.allocate(type_name);
        Self::populate(&mut state, object, type_name);
        debug!("Created {} as {}", type_name, object);
        object
    }

    fn destroy_object(&self, object: ObjectId) {
        self.state.lock().destroy(object);
    }

    fn type_name(&self, object: ObjectId) -> Option<String> {
        self.state
            .lock()
            .objects
            .get(&object)
            .map(|o| o.type_name.clone())
    }

    fn set_parent(&self, object: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError> {
        let mut state = self.state.lock();
        if let Some(parent) = parent {
            if !state.objects.contains_key(&parent) {
                return Err(SceneError::UnknownObject(parent));
            }
        }
        let target = state
            .objects
            .get_mut(&object)
            .ok_or(SceneError::UnknownObject(object))?;
        target.parent = parent;
        Ok(())
    }

    fn write_property(
        &self,
        object: ObjectId,
        path: &str,
        value: PropertyValue,
    ) -> Result<(), SceneError> {
        self.assign(object, path, Some(value))
    }

    fn reset_property(&self, object: ObjectId, path: &str) -> Result<(), SceneError> {
        self.assign(object, path, None)
    }

    fn render_preview(&self, object: ObjectId) -> Option<Bytes> {
        if !self.contains(object) {
            return None;
        }
        let fill = match self.value(object, "color") {
            Some(PropertyValue::Color(argb)) => argb,
            _ => PREVIEW_GRAY,
        };
        let (width, height) = (self.render.preview_width, self.render.preview_height);
        let antialiasing = if self.render.distance_field_antialiasing {
            "distance-field"
        } else {
            "gray-scale"
        };
        let header = format!("P6\n# antialiasing: {antialiasing}\n{width} {height}\n255\n");
        let pixels = width as usize * height as usize;
        let mut image = BytesMut::with_capacity(header.len() + pixels * 3);
        image.put_slice(header.as_bytes());
        let [_, r, g, b] = fill.to_be_bytes();
        for _ in 0..pixels {
            image.put_slice(&[r, g, b]);
        }
        Some(image.freeze())
    }

    fn handle_input(&self, event: &InputEventCommand) {
        debug!("Input event: {}", event);
        self.input.lock().push(*event);
    }

    fn handle_view_action(&self, action: &View3DActionCommand) {
        debug!("View action: {}", action);
        self.view_actions.lock().push(action.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_catalogue_types_have_grouped_properties() {
        let scene = MemoryScene::default();
        let text = scene.create_object("QtQuick.Text");
        let props = scene.properties(text);
        let font = props.iter().find(|p| p.name == "font").unwrap();
        assert!(!font.writable);
        let PropertyKind::Object(Some(font_object)) = font.kind else {
            panic!("font is not an object");
        };
        assert_eq!(scene.type_name(font_object).as_deref(), Some("QFont"));
        assert_eq!(
            scene.value(text, "font.pixelSize"),
            Some(PropertyValue::Int(12))
        );
    }

    #[test]
    fn test_unknown_type_is_bare_object() {
        let scene = MemoryScene::default();
        let object = scene.create_object("Custom.Widget");
        let names: Vec<_> = scene.properties(object).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["objectName"]);
    }

    #[test]
    fn test_write_notifies_only_on_change() {
        let scene = MemoryScene::default();
        let item = scene.create_object("QtQuick.Item");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        scene
            .subscribe(
                item,
                "width",
                Arc::new(move |_: &PropertyValue| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        scene
            .write_property(item, "width", PropertyValue::Double(100.0))
            .unwrap();
        scene
            .write_property(item, "width", PropertyValue::Double(100.0))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        scene.reset_property(item, "width").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(scene.value(item, "width"), Some(PropertyValue::Double(0.0)));
    }

    #[test]
    fn test_write_errors() {
        let scene = MemoryScene::default();
        let text = scene.create_object("QtQuick.Text");
        assert!(matches!(
            scene.write_property(text, "missing", PropertyValue::Int(1)),
            Err(SceneError::UnknownProperty { .. })
        ));
        assert!(matches!(
            scene.write_property(text, "font", PropertyValue::Int(1)),
            Err(SceneError::ReadOnly { .. })
        ));
        assert!(matches!(
            scene.write_property(ObjectId(999), "x", PropertyValue::Int(1)),
            Err(SceneError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_list_elements_resolve_by_index() {
        let scene = MemoryScene::default();
        let root = scene.insert_object("Holder");
        let first = scene.create_object("QtQuick.Item");
        let second = scene.create_object("QtQuick.Item");
        scene.define_list(root, "data", vec![first, second]);
        scene
            .write_property(root, "data/1/x", PropertyValue::Double(5.0))
            .unwrap();
        assert_eq!(scene.value(second, "x"), Some(PropertyValue::Double(5.0)));
        assert_eq!(scene.value(first, "x"), Some(PropertyValue::Double(0.0)));
    }

    #[test]
    fn test_destroy_removes_owned_objects_and_subscriptions() {
        let scene = MemoryScene::default();
        let rect = scene.create_object("QtQuick.Rectangle");
        assert_eq!(scene.object_count(), 2);
        scene.subscribe(rect, "color", Arc::new(|_: &PropertyValue| {})).unwrap();
        scene.destroy_object(rect);
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.subscription_count(), 0);
    }

    #[test]
    fn test_subscribe_requires_notifiable_property() {
        let scene = MemoryScene::default();
        let object = scene.insert_object("Plain");
        scene.define_value(object, "constant", PropertyValue::Int(1), false, false);
        assert!(scene.subscribe(object, "constant", Arc::new(|_: &PropertyValue| {})).is_none());
        assert!(scene.subscribe(object, "missing", Arc::new(|_: &PropertyValue| {})).is_none());
    }

    #[test]
    fn test_preview_uses_fill_color() {
        let scene = MemoryScene::new(RenderConfig {
            preview_width: 2,
            preview_height: 1,
            ..Default::default()
        });
        let rect = scene.create_object("QtQuick.Rectangle");
        scene
            .write_property(rect, "color", PropertyValue::Color(0xff10_2030))
            .unwrap();
        let image = scene.render_preview(rect).unwrap();
        assert!(image.starts_with(b"P6\n"));
        assert!(image.ends_with(&[0x10, 0x20, 0x30, 0x10, 0x20, 0x30]));
        assert!(scene.render_preview(ObjectId(12345)).is_none());
    }

    #[test]
    fn test_set_parent_checks_both_objects() {
        let scene = MemoryScene::default();
        let parent = scene.create_object("QtQuick.Item");
        let child = scene.create_object("QtQuick.Item");
        scene.set_parent(child, Some(parent)).unwrap();
        assert_eq!(scene.parent(child), Some(parent));
        assert!(scene.set_parent(child, Some(ObjectId(999))).is_err());
    }
}
