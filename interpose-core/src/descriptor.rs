//! Event records produced by proxy accesses
//!
//! A [`Descriptor`] describes one observable access: which original object
//! was touched, which member, how, and with which values.

use crate::value::{ObjectRef, Value};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Field names of the object form of a descriptor, in canonical order.
pub mod keys {
    pub const OBJECT: &str = "object";
    pub const PROPERTY: &str = "property";
    pub const FUNCTION: &str = "fn";
    pub const TYPE: &str = "type";
    pub const VALUE: &str = "value";
    pub const NEW_VALUE: &str = "newValue";
    pub const ARGS: &str = "args";
}

/// Kind of access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Get,
    Set,
    Invoke,
    Return,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Get => "get",
            AccessKind::Set => "set",
            AccessKind::Invoke => "invoke",
            AccessKind::Return => "return",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The accessed member: a data property or a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Member {
    Property(String),
    Function(String),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(name) | Member::Function(name) => name,
        }
    }

    /// Key under which the name appears in the object form
    pub fn key(&self) -> &'static str {
        match self {
            Member::Property(_) => keys::PROPERTY,
            Member::Function(_) => keys::FUNCTION,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Member::Function(_))
    }
}

/// Immutable record of one access
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    object: Value,
    member: Member,
    kind: AccessKind,
    value: Option<Value>,
    new_value: Option<Value>,
    args: Option<Vec<Value>>,
}

impl Descriptor {
    /// A property read; `value` is the current value
    pub fn get(object: Value, property: impl Into<String>, value: Value) -> Self {
        Self {
            object,
            member: Member::Property(property.into()),
            kind: AccessKind::Get,
            value: Some(value),
            new_value: None,
            args: None,
        }
    }

    /// A property write; `value` is the prior value
    pub fn set(object: Value, property: impl Into<String>, value: Value, new_value: Value) -> Self {
        Self {
            object,
            member: Member::Property(property.into()),
            kind: AccessKind::Set,
            value: Some(value),
            new_value: Some(new_value),
            args: None,
        }
    }

    /// A method call, before the original runs
    pub fn invoke(object: Value, function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            object,
            member: Member::Function(function.into()),
            kind: AccessKind::Invoke,
            value: None,
            new_value: None,
            args: Some(args),
        }
    }

    /// A method call, after the original returned `value`
    pub fn returned(
        object: Value,
        function: impl Into<String>,
        args: Vec<Value>,
        value: Value,
    ) -> Self {
        Self {
            object,
            member: Member::Function(function.into()),
            kind: AccessKind::Return,
            value: Some(value),
            new_value: None,
            args: Some(args),
        }
    }

    /// The original, un-proxied target
    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Property name, when this is a property access
    pub fn property(&self) -> Option<&str> {
        match &self.member {
            Member::Property(name) => Some(name),
            Member::Function(_) => None,
        }
    }

    /// Method name, when this is an invoke or return event
    pub fn function(&self) -> Option<&str> {
        match &self.member {
            Member::Function(name) => Some(name),
            Member::Property(_) => None,
        }
    }

    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn new_value(&self) -> Option<&Value> {
        self.new_value.as_ref()
    }

    pub fn args(&self) -> Option<&[Value]> {
        self.args.as_deref()
    }

    /// Object form with the populated fields only, in canonical key order
    pub fn to_object(&self) -> ObjectRef {
        let object = ObjectRef::new()
            .with(keys::OBJECT, self.object.clone())
            .with(self.member.key(), self.member.name())
            .with(keys::TYPE, self.kind.as_str());
        if let Some(value) = &self.value {
            object.insert(keys::VALUE, value.clone());
        }
        if let Some(new_value) = &self.new_value {
            object.insert(keys::NEW_VALUE, new_value.clone());
        }
        if let Some(args) = &self.args {
            object.insert(keys::ARGS, args.clone());
        }
        object
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(self.to_object()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_descriptor_fields() {
        let target = Value::from(ObjectRef::from_pairs([("a", "Test")]));
        let descriptor = Descriptor::get(target.clone(), "a", Value::from("Test"));
        assert_eq!(descriptor.object(), &target);
        assert_eq!(descriptor.property(), Some("a"));
        assert_eq!(descriptor.function(), None);
        assert_eq!(descriptor.kind(), AccessKind::Get);
        assert!(descriptor.new_value().is_none());
    }

    #[test]
    fn test_object_form_key_order() {
        let target = Value::from(ObjectRef::new());
        let descriptor = Descriptor::returned(target, "f", vec![Value::from(1)], Value::from(2));
        assert_eq!(
            descriptor.to_object().keys(),
            vec!["object", "fn", "type", "value", "args"]
        );
    }

    #[test]
    fn test_serialize_as_json() {
        let target = Value::from(ObjectRef::from_pairs([("a", "Test")]));
        let descriptor = Descriptor::set(target, "a", Value::from("Test"), Value::from("New"));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "set");
        assert_eq!(json["newValue"], "New");
        assert_eq!(json["object"]["a"], "Test");
    }
}
