//! Records nested inside commands

use super::error::DecodeError;
use super::stream::{WireFormat, WireReader, WireWriter};
use super::value::PropertyValue;
use bytes::Bytes;
use std::fmt;

/// Sentinel id for "no instance"
pub const NO_INSTANCE: i32 = -1;

/// Names a property of an instance without carrying a value.
///
/// An empty `dynamic_type_name` means the property is declared by the type,
/// not added dynamically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAbstractContainer {
    instance_id: i32,
    name: String,
    dynamic_type_name: String,
}

impl Default for PropertyAbstractContainer {
    fn default() -> Self {
        Self {
            instance_id: NO_INSTANCE,
            name: String::new(),
            dynamic_type_name: String::new(),
        }
    }
}

impl PropertyAbstractContainer {
    pub fn new(
        instance_id: i32,
        name: impl Into<String>,
        dynamic_type_name: impl Into<String>,
    ) -> Self {
        Self {
            instance_id,
            name: name.into(),
            dynamic_type_name: dynamic_type_name.into(),
        }
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dynamic_type_name(&self) -> &str {
        &self.dynamic_type_name
    }

    pub fn is_dynamic(&self) -> bool {
        !self.dynamic_type_name.is_empty()
    }
}

impl WireFormat for PropertyAbstractContainer {
    const NAME: &'static str = "PropertyAbstractContainer";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.instance_id);
        out.put_str(&self.name);
        out.put_str(&self.dynamic_type_name);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            instance_id: input.get_i32("instanceId")?,
            name: input.get_string("name")?,
            dynamic_type_name: input.get_string("dynamicTypeName")?,
        })
    }
}

impl fmt::Display for PropertyAbstractContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PropertyAbstractContainer(instanceId: {}, name: {}",
            self.instance_id, self.name
        )?;
        if self.is_dynamic() {
            write!(f, ", dynamicTypeName: {}", self.dynamic_type_name)?;
        }
        write!(f, ")")
    }
}

/// A property name plus its value for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValueContainer {
    instance_id: i32,
    name: String,
    value: PropertyValue,
    dynamic_type_name: String,
}

impl Default for PropertyValueContainer {
    fn default() -> Self {
        Self {
            instance_id: NO_INSTANCE,
            name: String::new(),
            value: PropertyValue::Invalid,
            dynamic_type_name: String::new(),
        }
    }
}

impl PropertyValueContainer {
    pub fn new(instance_id: i32, name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            instance_id,
            name: name.into(),
            value,
            dynamic_type_name: String::new(),
        }
    }

    pub fn with_dynamic_type(mut self, type_name: impl Into<String>) -> Self {
        self.dynamic_type_name = type_name.into();
        self
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn dynamic_type_name(&self) -> &str {
        &self.dynamic_type_name
    }
}

impl WireFormat for PropertyValueContainer {
    const NAME: &'static str = "PropertyValueContainer";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.instance_id);
        out.put_str(&self.name);
        self.value.write_to(out);
        out.put_str(&self.dynamic_type_name);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            instance_id: input.get_i32("instanceId")?,
            name: input.get_string("name")?,
            value: PropertyValue::read_from(input)?,
            dynamic_type_name: input.get_string("dynamicTypeName")?,
        })
    }
}

impl fmt::Display for PropertyValueContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} = {}", self.instance_id, self.name, self.value)
    }
}

/// Describes an instance the worker should create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceContainer {
    instance_id: i32,
    type_name: String,
    parent_id: i32,
}

impl Default for InstanceContainer {
    fn default() -> Self {
        Self {
            instance_id: NO_INSTANCE,
            type_name: String::new(),
            parent_id: NO_INSTANCE,
        }
    }
}

impl InstanceContainer {
    pub fn new(instance_id: i32, type_name: impl Into<String>, parent_id: Option<i32>) -> Self {
        Self {
            instance_id,
            type_name: type_name.into(),
            parent_id: parent_id.unwrap_or(NO_INSTANCE),
        }
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parent_id(&self) -> Option<i32> {
        (self.parent_id != NO_INSTANCE).then_some(self.parent_id)
    }
}

impl WireFormat for InstanceContainer {
    const NAME: &'static str = "InstanceContainer";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.instance_id);
        out.put_str(&self.type_name);
        out.put_i32(self.parent_id);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            instance_id: input.get_i32("instanceId")?,
            type_name: input.get_string("typeName")?,
            parent_id: input.get_i32("parentId")?,
        })
    }
}

/// A rendered image for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContainer {
    instance_id: i32,
    image: Bytes,
}

impl Default for ImageContainer {
    fn default() -> Self {
        Self {
            instance_id: NO_INSTANCE,
            image: Bytes::new(),
        }
    }
}

impl ImageContainer {
    pub fn new(instance_id: i32, image: impl Into<Bytes>) -> Self {
        Self {
            instance_id,
            image: image.into(),
        }
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    pub fn image(&self) -> &Bytes {
        &self.image
    }
}

impl WireFormat for ImageContainer {
    const NAME: &'static str = "ImageContainer";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.instance_id);
        out.put_blob(&self.image);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            instance_id: input.get_i32("instanceId")?,
            image: input.get_blob("imageBytes")?,
        })
    }
}

/// What an [`InformationContainer`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum InformationName {
    #[default]
    NoName = 0,
    TypeName = 1,
    Parent = 2,
    Size = 3,
    IsMovable = 4,
    IsResizable = 5,
    HasContent = 6,
}

impl InformationName {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::NoName),
            1 => Some(Self::TypeName),
            2 => Some(Self::Parent),
            3 => Some(Self::Size),
            4 => Some(Self::IsMovable),
            5 => Some(Self::IsResizable),
            6 => Some(Self::HasContent),
            _ => None,
        }
    }
}

/// One piece of instance information with up to a few variant values.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationContainer {
    instance_id: i32,
    name: InformationName,
    values: Vec<PropertyValue>,
}

impl Default for InformationContainer {
    fn default() -> Self {
        Self {
            instance_id: NO_INSTANCE,
            name: InformationName::NoName,
            values: Vec::new(),
        }
    }
}

impl InformationContainer {
    pub fn new(instance_id: i32, name: InformationName, values: Vec<PropertyValue>) -> Self {
        Self {
            instance_id,
            name,
            values,
        }
    }

    pub fn instance_id(&self) -> i32 {
        self.instance_id
    }

    pub fn name(&self) -> InformationName {
        self.name
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }
}

impl WireFormat for InformationContainer {
    const NAME: &'static str = "InformationContainer";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_i32(self.instance_id);
        out.put_u32(self.name as u32);
        out.put_seq(&self.values);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        let instance_id = input.get_i32("instanceId")?;
        let raw = input.get_u32("informationName")?;
        let name = InformationName::from_u32(raw).ok_or(DecodeError::InvalidEnum {
            field: "informationName",
            value: raw,
        })?;
        let values = input.get_seq("informationValues")?;
        Ok(Self {
            instance_id,
            name,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_abstract_container_layout() {
        let container = PropertyAbstractContainer::new(4, "width", "");
        let bytes = container.to_bytes();
        assert_eq!(
            &bytes[..],
            &[0, 0, 0, 4, 0, 0, 0, 5, b'w', b'i', b'd', b't', b'h', 0, 0, 0, 0]
        );
        assert!(!container.is_dynamic());
    }

    #[test]
    fn test_dynamic_property_display() {
        let container = PropertyAbstractContainer::new(1, "speed", "real");
        assert!(container.is_dynamic());
        assert_eq!(
            container.to_string(),
            "PropertyAbstractContainer(instanceId: 1, name: speed, dynamicTypeName: real)"
        );
    }

    #[test]
    fn test_instance_container_without_parent() {
        let container = InstanceContainer::new(2, "QtQuick.Rectangle", None);
        let decoded = InstanceContainer::from_bytes(container.to_bytes()).unwrap();
        assert_eq!(decoded.parent_id(), None);
        assert_eq!(decoded, container);
    }

    #[test]
    fn test_defaults_use_sentinel_id() {
        assert_eq!(PropertyValueContainer::default().instance_id(), NO_INSTANCE);
        assert_eq!(ImageContainer::default().instance_id(), NO_INSTANCE);
        assert_eq!(InformationContainer::default().name(), InformationName::NoName);
    }

    #[test]
    fn test_unknown_information_name_is_rejected() {
        let mut writer = WireWriter::new();
        writer.put_i32(1);
        writer.put_u32(99);
        writer.put_u32(0);
        let err = InformationContainer::from_bytes(writer.finish()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEnum { value: 99, .. }));
    }
}
