//! Fluent rule registration
//!
//! ```text
//! env.when("name").of(target).is_set_to("X")?.then(handler)
//! ```
//!
//! `of` inspects the member on the unwrapped target: a function member
//! yields a [`Selection::Method`], anything else a [`Selection::Property`].
//! Each capability builds a [`DescriptorPattern`] that is handed to the
//! environment's registry by [`Rule::then`].

use crate::chain::from_fn;
use crate::descriptor::{AccessKind, Descriptor};
use crate::error::{InterceptError, Result};
use crate::pattern::DescriptorPattern;
use crate::registry::SelectiveInterceptorRegistry;
use crate::types::SelectiveId;
use crate::value::Value;
use std::rc::Rc;

/// First step: the member name
#[derive(Debug, Clone)]
pub struct When {
    registry: Rc<SelectiveInterceptorRegistry>,
    member: String,
}

impl When {
    pub(crate) fn new(registry: Rc<SelectiveInterceptorRegistry>, member: String) -> Self {
        Self { registry, member }
    }

    /// Bind the target. Proxies are unwrapped so that rules always refer to
    /// the original object, which is what descriptors carry.
    pub fn of(self, target: impl Into<Value>) -> Selection {
        let object = target.into().unwrap_proxy();
        let is_method = object
            .member(&self.member)
            .is_some_and(|value| value.is_callable());
        let base = Base {
            registry: self.registry,
            member: self.member,
            object,
        };
        if is_method {
            Selection::Method(MethodSelector(base))
        } else {
            Selection::Property(PropertySelector(base))
        }
    }
}

#[derive(Debug, Clone)]
struct Base {
    registry: Rc<SelectiveInterceptorRegistry>,
    member: String,
    object: Value,
}

impl Base {
    fn rule(self, pattern: DescriptorPattern) -> Rule {
        Rule {
            registry: self.registry,
            pattern: pattern.object(self.object),
        }
    }

    fn mismatch(&self, capability: &'static str) -> InterceptError {
        InterceptError::SelectorMismatch {
            member: self.member.clone(),
            capability,
        }
    }
}

/// Target bound; the member kind decides which capabilities exist
#[derive(Debug, Clone)]
pub enum Selection {
    Method(MethodSelector),
    Property(PropertySelector),
}

impl Selection {
    pub fn method(self) -> Result<MethodSelector> {
        self.as_method("method")
    }

    pub fn property(self) -> Result<PropertySelector> {
        self.as_property("property")
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Selection::Method(_))
    }

    pub fn is_invoked(self) -> Result<Rule> {
        self.as_method("is_invoked").map(MethodSelector::is_invoked)
    }

    pub fn is_invoked_with(self, args: Vec<Value>) -> Result<Rule> {
        Ok(self.as_method("is_invoked_with")?.is_invoked_with(args))
    }

    pub fn returns(self) -> Result<Rule> {
        self.as_method("returns").map(MethodSelector::returns)
    }

    pub fn returns_with(self, value: impl Into<Value>) -> Result<Rule> {
        Ok(self.as_method("returns_with")?.returns_with(value))
    }

    pub fn is_set(self) -> Result<Rule> {
        self.as_property("is_set").map(PropertySelector::is_set)
    }

    pub fn is_set_to(self, value: impl Into<Value>) -> Result<Rule> {
        Ok(self.as_property("is_set_to")?.is_set_to(value))
    }

    pub fn is_accessed(self) -> Result<Rule> {
        self.as_property("is_accessed").map(PropertySelector::is_accessed)
    }

    fn as_method(self, capability: &'static str) -> Result<MethodSelector> {
        match self {
            Selection::Method(selector) => Ok(selector),
            Selection::Property(PropertySelector(base)) => Err(base.mismatch(capability)),
        }
    }

    fn as_property(self, capability: &'static str) -> Result<PropertySelector> {
        match self {
            Selection::Property(selector) => Ok(selector),
            Selection::Method(MethodSelector(base)) => Err(base.mismatch(capability)),
        }
    }
}

/// Capabilities of a function member
#[derive(Debug, Clone)]
pub struct MethodSelector(Base);

impl MethodSelector {
    /// Before the original runs. A concrete result skips the original.
    pub fn is_invoked(self) -> Rule {
        let pattern = self.pattern(AccessKind::Invoke);
        self.0.rule(pattern)
    }

    /// Like [`is_invoked`](Self::is_invoked), for these exact arguments
    pub fn is_invoked_with(self, args: Vec<Value>) -> Rule {
        let pattern = self.pattern(AccessKind::Invoke).args(args);
        self.0.rule(pattern)
    }

    /// After the original returned. A concrete result replaces its value.
    pub fn returns(self) -> Rule {
        let pattern = self.pattern(AccessKind::Return);
        self.0.rule(pattern)
    }

    /// Like [`returns`](Self::returns), only when the original returned `value`
    pub fn returns_with(self, value: impl Into<Value>) -> Rule {
        let pattern = self.pattern(AccessKind::Return).value(value);
        self.0.rule(pattern)
    }

    fn pattern(&self, kind: AccessKind) -> DescriptorPattern {
        DescriptorPattern::new()
            .kind(kind)
            .function(self.0.member.clone())
    }
}

/// Capabilities of a data member
#[derive(Debug, Clone)]
pub struct PropertySelector(Base);

impl PropertySelector {
    pub fn is_set(self) -> Rule {
        let pattern = self.pattern(AccessKind::Set);
        self.0.rule(pattern)
    }

    pub fn is_set_to(self, value: impl Into<Value>) -> Rule {
        let pattern = self.pattern(AccessKind::Set).new_value(value);
        self.0.rule(pattern)
    }

    pub fn is_accessed(self) -> Rule {
        let pattern = self.pattern(AccessKind::Get);
        self.0.rule(pattern)
    }

    fn pattern(&self, kind: AccessKind) -> DescriptorPattern {
        DescriptorPattern::new()
            .kind(kind)
            .property(self.0.member.clone())
    }
}

/// A complete pattern waiting for its handler
#[derive(Debug, Clone)]
#[must_use = "a rule does nothing until `then` is called"]
pub struct Rule {
    registry: Rc<SelectiveInterceptorRegistry>,
    pattern: DescriptorPattern,
}

impl Rule {
    pub fn pattern(&self) -> &DescriptorPattern {
        &self.pattern
    }

    /// Register `handler` for every descriptor matching this rule
    pub fn then<F>(self, handler: F) -> RuleHandle
    where
        F: Fn(&Descriptor) -> Result<Option<Value>> + 'static,
    {
        let id = self
            .registry
            .add_selective_interceptor(self.pattern, from_fn(handler));
        RuleHandle {
            registry: self.registry,
            id,
        }
    }
}

/// Registered rule. Dropping the handle keeps the rule active.
#[derive(Debug, Clone)]
pub struct RuleHandle {
    registry: Rc<SelectiveInterceptorRegistry>,
    id: SelectiveId,
}

impl RuleHandle {
    pub fn id(&self) -> SelectiveId {
        self.id
    }

    /// Stop future dispatch to this rule. Returns false if already removed.
    pub fn remove(&self) -> bool {
        self.registry.remove_selective_interceptor(self.id)
    }
}
