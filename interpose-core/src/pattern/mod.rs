//! Partial descriptor patterns and structural matching.
//!
//! This module provides:
//! - Cycle-safe canonical serialization (`canonical`)
//! - [`DescriptorPattern`], a partial descriptor used to gate selective
//!   interceptors

mod canonical;

pub use canonical::{canonical_string, matches_on_keys, structurally_equal, CIRCULAR_MARKER};
pub(crate) use canonical::with_ancestor;

use crate::descriptor::{keys, AccessKind, Descriptor, Member};
use crate::value::{ObjectRef, Value};

/// A partial descriptor. Only the fields that are set take part in matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorPattern {
    pub object: Option<Value>,
    pub member: Option<Member>,
    pub kind: Option<AccessKind>,
    pub value: Option<Value>,
    pub new_value: Option<Value>,
    pub args: Option<Vec<Value>>,
}

impl DescriptorPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: impl Into<Value>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.member = Some(Member::Property(name.into()));
        self
    }

    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.member = Some(Member::Function(name.into()));
        self
    }

    pub fn kind(mut self, kind: AccessKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn new_value(mut self, value: impl Into<Value>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Object form of the pattern, using the descriptor key names and order.
    pub fn to_object(&self) -> ObjectRef {
        let object = ObjectRef::new();
        if let Some(target) = &self.object {
            object.insert(keys::OBJECT, target.clone());
        }
        if let Some(member) = &self.member {
            object.insert(member.key(), member.name());
        }
        if let Some(kind) = self.kind {
            object.insert(keys::TYPE, kind.as_str());
        }
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

    /// Check the pattern against a descriptor.
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        self.matches_object(&descriptor.to_object())
    }

    /// Check the pattern against a descriptor already in object form.
    pub fn matches_object(&self, event: &ObjectRef) -> bool {
        matches_on_keys(&self.to_object(), event)
    }
}
