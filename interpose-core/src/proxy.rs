//! Intercepting proxies
//!
//! A proxy is an explicit dispatch table built when the proxy is created:
//! one slot per own member of the wrapped object (or per index of the
//! wrapped array). Every access through a slot builds a [`Descriptor`] and
//! routes it through the environment's [`InterceptorChain`].
//!
//! ## Member set
//!
//! The member set is frozen at construction. Members added to the original
//! afterwards are not visible through the proxy, and accessing a name that
//! was not captured fails with [`InterceptError::UnknownMember`]. For arrays
//! this means only existing slots can be assigned; appending is not
//! possible through a proxy.
//!
//! ## Nested proxies
//!
//! A data member whose current value is an object or array is returned as a
//! nested proxy. The nested proxy is created on first read, cached in the
//! slot, and replaced whenever the member is reassigned or no longer holds
//! the cached proxy's original.

use crate::chain::InterceptorChain;
use crate::descriptor::Descriptor;
use crate::error::{InterceptError, Result};
use crate::value::{ArrayRef, Function, ObjectRef, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The wrapped original
#[derive(Clone)]
enum Target {
    Object(ObjectRef),
    Array(ArrayRef),
}

impl Target {
    fn from_value(value: &Value) -> Result<Self> {
        match value.unwrap_proxy() {
            Value::Object(object) => Ok(Target::Object(object)),
            Value::Array(array) => Ok(Target::Array(array)),
            other => Err(InterceptError::NotAnObject {
                found: other.type_name(),
            }),
        }
    }

    /// Own members at this instant, in order
    fn members(&self) -> Vec<(String, Value)> {
        match self {
            Target::Object(object) => object.entries(),
            Target::Array(array) => array
                .to_vec()
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        }
    }

    fn read(&self, key: &str) -> Value {
        self.as_value().member(key).unwrap_or_default()
    }

    fn write(&self, key: &str, value: Value) {
        match self {
            Target::Object(object) => {
                object.insert(key, value);
            }
            Target::Array(array) => {
                if let Ok(index) = key.parse::<usize>() {
                    array.set(index, value);
                }
            }
        }
    }

    fn as_value(&self) -> Value {
        match self {
            Target::Object(object) => Value::Object(object.clone()),
            Target::Array(array) => Value::Array(array.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Method,
    Data,
}

/// One entry of the dispatch table
struct MemberSlot {
    name: String,
    kind: SlotKind,
    nested: RefCell<Option<Proxy>>,
}

struct ProxyInner {
    target: Target,
    chain: Rc<InterceptorChain>,
    slots: Vec<MemberSlot>,
}

/// Intercepting wrapper around an object or array
///
/// Cloning a proxy clones the handle; both clones share the same dispatch
/// table and nested-proxy cache.
#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

impl Proxy {
    /// Build a proxy routing through `chain`. A proxy target is unwrapped
    /// to its original first.
    pub(crate) fn new(target: &Value, chain: Rc<InterceptorChain>) -> Result<Proxy> {
        let target = Target::from_value(target)?;
        let slots: Vec<_> = target
            .members()
            .into_iter()
            .map(|(name, value)| MemberSlot {
                name,
                kind: if value.is_callable() {
                    SlotKind::Method
                } else {
                    SlotKind::Data
                },
                nested: RefCell::new(None),
            })
            .collect();
        tracing::trace!(members = slots.len(), "created proxy");
        Ok(Proxy {
            inner: Rc::new(ProxyInner {
                target,
                chain,
                slots,
            }),
        })
    }

    /// The wrapped original
    pub fn original(&self) -> Value {
        self.inner.target.as_value()
    }

    /// Member names captured at construction, in order
    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.slot(name).is_ok()
    }

    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn slot(&self, name: &str) -> Result<&MemberSlot> {
        self.inner
            .slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| InterceptError::unknown_member(name))
    }

    /// Read a member.
    ///
    /// Data members dispatch a `get` descriptor; a concrete result replaces
    /// the value. Object values come back as nested proxies. Method members
    /// return a function bound to this proxy, so calling it dispatches
    /// `invoke` and `return` descriptors.
    pub fn get(&self, name: &str) -> Result<Value> {
        let slot = self.slot(name)?;
        if slot.kind == SlotKind::Method {
            let proxy = self.clone();
            let method = slot.name.clone();
            return Ok(Value::Function(Function::new(
                slot.name.clone(),
                move |_this, args| proxy.call(&method, args),
            )));
        }

        let current = self.inner.target.read(name);
        let descriptor = Descriptor::get(self.original(), name, current.clone());
        if let Some(value) = self.inner.chain.evaluate(&descriptor)? {
            return Ok(value);
        }
        if current.is_object_like() {
            return Ok(Value::Proxy(self.nested_for(slot, &current)?));
        }
        Ok(current)
    }

    /// Assign a member.
    ///
    /// Dispatches a `set` descriptor. A concrete result is stored instead of
    /// `value`. Assigning to a method member is accepted and ignored.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = self.slot(name)?;
        if slot.kind == SlotKind::Method {
            tracing::debug!(member = name, "ignoring assignment to method member");
            return Ok(());
        }

        let current = self.inner.target.read(name);
        let descriptor = Descriptor::set(self.original(), name, current, value.clone());
        let stored = self.inner.chain.evaluate(&descriptor)?.unwrap_or(value);
        self.assign(slot, stored)
    }

    /// Invoke a method member.
    ///
    /// An `invoke` descriptor is dispatched first; a concrete result is
    /// returned without calling the original. Otherwise the original runs
    /// with the wrapped object as receiver and a `return` descriptor carrying
    /// its result is dispatched.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let slot = self.slot(name)?;
        if slot.kind != SlotKind::Method {
            return Err(InterceptError::NotCallable {
                member: name.to_string(),
            });
        }

        let original = self.original();
        let invoke = Descriptor::invoke(original.clone(), name, args.to_vec());
        if let Some(value) = self.inner.chain.evaluate(&invoke)? {
            return Ok(value);
        }

        // Looked up at call time, so a replaced original is honoured.
        let function = match self.inner.target.read(name) {
            Value::Function(function) => function,
            _ => {
                return Err(InterceptError::NotCallable {
                    member: name.to_string(),
                })
            }
        };
        let returned = function.call(&original, args)?;

        let ret = Descriptor::returned(original, name, args.to_vec(), returned.clone());
        Ok(self.inner.chain.evaluate(&ret)?.unwrap_or(returned))
    }

    /// Read through nested proxies along a dotted path, e.g. `"a.b.c"`.
    /// Each hop dispatches its own `get`.
    pub fn get_path(&self, path: &str) -> Result<Value> {
        let mut current = Value::Proxy(self.clone());
        for segment in path.split('.') {
            current = match current {
                Value::Proxy(proxy) => proxy.get(segment)?,
                other => {
                    return Err(InterceptError::NotAnObject {
                        found: other.type_name(),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Assign the last segment of a dotted path on the proxy reached by the
    /// preceding segments.
    pub fn set_path(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        match path.rsplit_once('.') {
            None => self.set(path, value),
            Some((parent, leaf)) => match self.get_path(parent)? {
                Value::Proxy(proxy) => proxy.set(leaf, value),
                other => Err(InterceptError::NotAnObject {
                    found: other.type_name(),
                }),
            },
        }
    }

    /// Invoke the method named by the last segment of a dotted path.
    pub fn call_path(&self, path: &str, args: &[Value]) -> Result<Value> {
        match path.rsplit_once('.') {
            None => self.call(path, args),
            Some((parent, leaf)) => match self.get_path(parent)? {
                Value::Proxy(proxy) => proxy.call(leaf, args),
                other => Err(InterceptError::NotAnObject {
                    found: other.type_name(),
                }),
            },
        }
    }

    /// Store a value in a data slot. Proxies are unwrapped so the original
    /// graph never contains proxies; the nested cache follows the new value.
    fn assign(&self, slot: &MemberSlot, value: Value) -> Result<()> {
        let value = value.unwrap_proxy();
        if value.is_object_like() {
            let nested = Proxy::new(&value, self.inner.chain.clone())?;
            self.inner.target.write(&slot.name, value);
            *slot.nested.borrow_mut() = Some(nested);
        } else {
            self.inner.target.write(&slot.name, value);
            *slot.nested.borrow_mut() = None;
        }
        Ok(())
    }

    /// Cached nested proxy for `current`, rebuilt if it wraps something else
    fn nested_for(&self, slot: &MemberSlot, current: &Value) -> Result<Proxy> {
        let original = current.unwrap_proxy();
        if let Some(cached) = slot.nested.borrow().as_ref() {
            if cached.original() == original {
                return Ok(cached.clone());
            }
        }
        let nested = Proxy::new(&original, self.inner.chain.clone())?;
        *slot.nested.borrow_mut() = Some(nested.clone());
        Ok(nested)
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("members", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::from_fn;
    use crate::descriptor::AccessKind;
    use std::cell::Cell;

    fn proxy_of(value: impl Into<Value>) -> (Proxy, Rc<InterceptorChain>) {
        let chain = Rc::new(InterceptorChain::new());
        let proxy = Proxy::new(&value.into(), chain.clone()).unwrap();
        (proxy, chain)
    }

    #[test]
    fn test_reads_pass_through_without_interceptors() {
        let object = ObjectRef::from_pairs([("a", "Test")]);
        let (proxy, _) = proxy_of(object.clone());
        assert_eq!(proxy.get("a").unwrap(), Value::from("Test"));

        object.insert("a", "Changed");
        assert_eq!(proxy.get("a").unwrap(), Value::from("Changed"));
    }

    #[test]
    fn test_unknown_member_is_rejected() {
        let object = ObjectRef::from_pairs([("a", "Test")]);
        let (proxy, _) = proxy_of(object.clone());
        assert!(matches!(
            proxy.set("f", "nope"),
            Err(InterceptError::UnknownMember { ref member }) if member == "f"
        ));
        assert!(!object.contains_key("f"));
    }

    #[test]
    fn test_members_added_later_are_invisible() {
        let object = ObjectRef::from_pairs([("a", 1)]);
        let (proxy, _) = proxy_of(object.clone());
        object.insert("b", 2);
        assert_eq!(proxy.keys(), vec!["a".to_string()]);
        assert!(proxy.get("b").is_err());
    }

    #[test]
    fn test_proxying_a_scalar_fails() {
        let chain = Rc::new(InterceptorChain::new());
        assert!(matches!(
            Proxy::new(&Value::from(3), chain),
            Err(InterceptError::NotAnObject { found: "number" })
        ));
    }

    #[test]
    fn test_nested_proxy_is_cached() {
        let inner = ObjectRef::from_pairs([("c", "Test")]);
        let (proxy, _) = proxy_of(ObjectRef::from_pairs([("b", inner)]));
        let first = proxy.get("b").unwrap();
        let second = proxy.get("b").unwrap();
        assert!(first.as_proxy().is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_proxy_follows_direct_mutation() {
        let object = ObjectRef::from_pairs([("b", ObjectRef::from_pairs([("c", 1)]))]);
        let (proxy, _) = proxy_of(object.clone());
        let before = proxy.get("b").unwrap();

        object.insert("b", ObjectRef::from_pairs([("c", 2)]));
        let after = proxy.get("b").unwrap();
        assert_ne!(before, after);
        assert_eq!(proxy.get_path("b.c").unwrap(), Value::from(2));
    }

    #[test]
    fn test_set_object_replaces_nested_proxy() {
        let object = ObjectRef::from_pairs([("b", ObjectRef::from_pairs([("c", 1)]))]);
        let (proxy, _) = proxy_of(object.clone());
        let replacement = ObjectRef::from_pairs([("d", 2)]);
        proxy.set("b", replacement.clone()).unwrap();

        assert_eq!(object.get("b"), Some(Value::from(replacement)));
        let nested = proxy.get("b").unwrap();
        assert_eq!(nested.as_proxy().unwrap().keys(), vec!["d".to_string()]);
    }

    #[test]
    fn test_set_scalar_over_object_clears_nested_proxy() {
        let object = ObjectRef::from_pairs([("b", ObjectRef::new())]);
        let (proxy, _) = proxy_of(object);
        let _ = proxy.get("b").unwrap();
        proxy.set("b", "flat").unwrap();
        assert_eq!(proxy.get("b").unwrap(), Value::from("flat"));
    }

    #[test]
    fn test_assigning_a_proxy_stores_its_original() {
        let object = ObjectRef::from_pairs([("b", Value::Null)]);
        let (proxy, chain) = proxy_of(object.clone());
        let other = ObjectRef::from_pairs([("x", 1)]);
        let other_proxy = Proxy::new(&Value::from(other.clone()), chain).unwrap();
        proxy.set("b", other_proxy).unwrap();
        assert_eq!(object.get("b"), Some(Value::from(other)));
    }

    #[test]
    fn test_set_uses_interceptor_result() {
        let object = ObjectRef::from_pairs([("a", "Test")]);
        let (proxy, chain) = proxy_of(object.clone());
        chain.register(from_fn(|d| {
            Ok((d.kind() == AccessKind::Set).then(|| Value::from("Modified")))
        }));
        proxy.set("a", "New").unwrap();
        assert_eq!(object.get("a"), Some(Value::from("Modified")));
    }

    #[test]
    fn test_array_index_assignment() {
        let array = ArrayRef::from_values([1, 2, 3]);
        let (proxy, _) = proxy_of(array.clone());
        proxy.set("0", "first").unwrap();
        assert_eq!(array.get(0), Some(Value::from("first")));
        assert!(matches!(
            proxy.set("3", 4),
            Err(InterceptError::UnknownMember { .. })
        ));
        assert!(matches!(
            proxy.call("push", &[Value::from(4)]),
            Err(InterceptError::UnknownMember { .. })
        ));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn test_call_runs_original_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let object = ObjectRef::from_pairs([(
            "sum",
            Function::new("sum", move |_, args| {
                counter.set(counter.get() + 1);
                Ok(Value::from(
                    args.iter().filter_map(Value::as_number).sum::<f64>(),
                ))
            }),
        )]);
        let (proxy, _) = proxy_of(object);
        let out = proxy
            .call("sum", &[Value::from(1), Value::from(2), Value::from(3)])
            .unwrap();
        assert_eq!(out, Value::from(6));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_get_on_method_returns_bound_function() {
        let object = ObjectRef::from_pairs([(
            "hello",
            Function::new("hello", |_, _| Ok(Value::from("hi"))),
        )]);
        let (proxy, chain) = proxy_of(object);
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        chain.register(from_fn(move |_| {
            counter.set(counter.get() + 1);
            Ok(None)
        }));

        let bound = proxy.get("hello").unwrap();
        let out = bound
            .as_function()
            .unwrap()
            .call(&Value::Undefined, &[])
            .unwrap();
        assert_eq!(out, Value::from("hi"));
        // invoke + return
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_call_on_data_member_fails() {
        let (proxy, _) = proxy_of(ObjectRef::from_pairs([("a", 1)]));
        assert!(matches!(
            proxy.call("a", &[]),
            Err(InterceptError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_assignment_to_method_is_ignored() {
        let f = Function::new("f", |_, _| Ok(Value::Null));
        let object = ObjectRef::from_pairs([("f", f.clone())]);
        let (proxy, _) = proxy_of(object.clone());
        proxy.set("f", 5).unwrap();
        assert_eq!(object.get("f"), Some(Value::from(f)));
    }

    #[test]
    fn test_path_helpers() {
        let object = ObjectRef::from_pairs([(
            "a",
            ObjectRef::from_pairs([("b", ObjectRef::from_pairs([("c", "Test")]))]),
        )]);
        let (proxy, _) = proxy_of(object.clone());
        assert_eq!(proxy.get_path("a.b.c").unwrap(), Value::from("Test"));
        proxy.set_path("a.b.c", "New").unwrap();
        assert_eq!(proxy.get_path("a.b.c").unwrap(), Value::from("New"));
        assert!(matches!(
            proxy.get_path("a.b.c.d"),
            Err(InterceptError::NotAnObject { found: "string" })
        ));
    }
}
