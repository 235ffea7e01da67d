//! Dynamic value model
//!
//! Proxies operate over a small dynamic object model. Objects and arrays are
//! shared, mutable handles: cloning an [`ObjectRef`] clones the handle, not
//! the members, and equality on reference types is identity.

use crate::error::Result;
use crate::pattern::{self, CIRCULAR_MARKER};
use crate::proxy::Proxy;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A dynamic value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Function),
    Proxy(Proxy),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Objects, arrays and proxies: the values that get nested proxies
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_) | Value::Proxy(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Proxy(_) => "proxy",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// The wrapped original when this is a proxy, otherwise a clone of self
    pub fn unwrap_proxy(&self) -> Value {
        match self {
            Value::Proxy(proxy) => proxy.original(),
            other => other.clone(),
        }
    }

    /// Read an own member of an object, or an element of an array by index key
    pub fn member(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::Array(array) => key.parse::<usize>().ok().and_then(|i| array.get(i)),
            _ => None,
        }
    }

    /// Identity comparison for reference types, value comparison otherwise
    pub fn same_identity(&self, other: &Value) -> bool {
        self == other
    }

    /// Build a value from JSON. Object members keep their document order.
    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => {
                Value::Array(ArrayRef::from_values(items.into_iter().map(Value::from_json)))
            }
            Json::Object(map) => Value::Object(ObjectRef::from_pairs(
                map.into_iter().map(|(k, v)| (k, Value::from_json(v))),
            )),
        }
    }

    /// Lossy JSON export. Functions and undefined become null, proxies
    /// export their original and cycles become the circular marker.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_inner(&mut Vec::new())
    }

    fn to_json_inner(&self, ancestors: &mut Vec<*const ()>) -> serde_json::Value {
        use serde_json::Value as Json;
        let circular = || Json::String(CIRCULAR_MARKER.to_string());
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Date(d) => Json::String(format_date(d)),
            Value::Proxy(proxy) => proxy.original().to_json_inner(ancestors),
            Value::Array(array) => pattern::with_ancestor(ancestors, array.addr(), |ancestors| {
                Json::Array(
                    array
                        .to_vec()
                        .iter()
                        .map(|item| item.to_json_inner(ancestors))
                        .collect(),
                )
            })
            .unwrap_or_else(circular),
            Value::Object(object) => {
                pattern::with_ancestor(ancestors, object.addr(), |ancestors| {
                    let mut map = serde_json::Map::new();
                    for (key, value) in object.entries() {
                        if !value.is_undefined() {
                            map.insert(key, value.to_json_inner(ancestors));
                        }
                    }
                    Json::Object(map)
                })
                .unwrap_or_else(circular)
            }
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Textual form of a date: RFC 3339, millisecond precision, `Z` suffix
pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Proxy(a), Value::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Function(function) => write!(f, "Function({})", function.name()),
            Value::Proxy(proxy) => {
                write!(f, "Proxy({})", pattern::canonical_string(&proxy.original()))
            }
            other => write!(f, "{}", pattern::canonical_string(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Undefined => write!(f, "undefined"),
            other => write!(f, "{}", pattern::canonical_string(other)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<ArrayRef> for Value {
    fn from(a: ArrayRef) -> Self {
        Value::Array(a)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(ArrayRef::from(items))
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Proxy> for Value {
    fn from(p: Proxy) -> Self {
        Value::Proxy(p)
    }
}

/// Shared, insertion-ordered object
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Vec<(String, Value)>>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an object from key/value pairs; later duplicates replace earlier ones
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let object = Self::new();
        for (key, value) in pairs {
            object.insert(key, value);
        }
        object
    }

    /// Builder-style insert
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a member, keeping the position of an existing key.
    /// Returns the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        let mut members = self.0.borrow_mut();
        match members.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                members.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().iter().any(|(k, _)| k == key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut members = self.0.borrow_mut();
        let index = members.iter().position(|(k, _)| k == key)?;
        Some(members.remove(index).1)
    }

    /// Member names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Snapshot of all members in insertion order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

/// Shared array
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<V, I>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::from(values.into_iter().map(Into::into).collect::<Vec<_>>())
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Assign an element, padding with `Undefined` when writing past the end
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl From<Vec<Value>> for ArrayRef {
    fn from(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Array(self.clone()), f)
    }
}

type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value>;

/// Named callable. The first argument is the receiver (`this`).
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        (self.body)(this, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_object_insert_keeps_position() {
        let object = ObjectRef::from_pairs([("a", 1), ("b", 2)]);
        let previous = object.insert("a", 3);
        assert_eq!(previous, Some(Value::from(1)));
        assert_eq!(object.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(object.get("a"), Some(Value::from(3)));
    }

    #[test]
    fn test_reference_equality_is_identity() {
        let a = ObjectRef::from_pairs([("x", 1)]);
        let b = ObjectRef::from_pairs([("x", 1)]);
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));
    }

    #[test]
    fn test_array_set_pads_with_undefined() {
        let array = ArrayRef::from_values([1, 2]);
        array.set(3, "x");
        assert_eq!(array.len(), 4);
        assert!(array.get(2).is_some_and(|v| v.is_undefined()));
    }

    #[test]
    fn test_member_lookup_on_arrays() {
        let array = Value::from(ArrayRef::from_values(["a", "b"]));
        assert_eq!(array.member("1"), Some(Value::from("b")));
        assert_eq!(array.member("nope"), None);
    }

    #[test]
    fn test_json_roundtrip_preserves_structure() {
        let json = serde_json::json!({"a": [1, 2.5, null], "b": {"c": true}});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_from_json_keeps_member_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let value = Value::from_json(json);
        assert_eq!(value.as_object().unwrap().keys(), vec!["z", "a", "m"]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"z":1,"a":2,"m":3}"#
        );
    }

    #[test]
    fn test_to_json_breaks_cycles() {
        let object = ObjectRef::from_pairs([("name", "root")]);
        object.insert("me", object.clone());
        let json = Value::from(object).to_json();
        assert_eq!(json["me"], serde_json::json!(CIRCULAR_MARKER));
    }

    #[test]
    fn test_date_formatting() {
        let date = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_date(&date), "2020-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_function_call_receives_this() {
        let object = ObjectRef::from_pairs([("n", 41)]);
        let f = Function::new("inc", |this, _args| {
            let n = this.member("n").and_then(|v| v.as_number()).unwrap_or(0.0);
            Ok(Value::from(n + 1.0))
        });
        let out = f.call(&Value::from(object), &[]).unwrap();
        assert_eq!(out, Value::from(42));
    }
}
