//! Cycle-safe canonical serialization used for structural equality.
//!
//! Two values are structurally equal when their canonical strings are
//! identical. Object members are written in insertion order, so equality is
//! sensitive to key order: `{a, b}` and `{b, a}` do not match.

use crate::value::{format_date, ObjectRef, Value};

/// Written in place of an object or array that is its own ancestor.
pub const CIRCULAR_MARKER: &str = "[circular reference]";

/// Serialize a value to its canonical string form.
///
/// `undefined`, `null` and NaN all become `null`. Object members holding
/// `undefined` are skipped. Proxies serialize as their original.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut Vec::new(), &mut out);
    out
}

/// Structural equality through canonical serialization.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    canonical_string(a) == canonical_string(b)
}

/// Compare only the pattern's own keys against the same keys of `candidate`.
///
/// Keys missing from the candidate are dropped from its side, so a pattern
/// key never matches an absent field unless the pattern's value is
/// `undefined` (which is skipped on both sides).
pub fn matches_on_keys(pattern: &ObjectRef, candidate: &ObjectRef) -> bool {
    let restricted = ObjectRef::new();
    for key in pattern.keys() {
        if let Some(value) = candidate.get(&key) {
            restricted.insert(key, value);
        }
    }
    canonical_string(&Value::Object(pattern.clone()))
        == canonical_string(&Value::Object(restricted))
}

/// Run `f` with `addr` pushed on the ancestor path.
///
/// Returns `None` without calling `f` when `addr` is already an ancestor.
/// The path is per branch: siblings sharing a child are not a cycle.
pub(crate) fn with_ancestor<T>(
    ancestors: &mut Vec<*const ()>,
    addr: *const (),
    f: impl FnOnce(&mut Vec<*const ()>) -> T,
) -> Option<T> {
    if ancestors.contains(&addr) {
        return None;
    }
    ancestors.push(addr);
    let out = f(ancestors);
    ancestors.pop();
    Some(out)
}

fn write_canonical(value: &Value, ancestors: &mut Vec<*const ()>, out: &mut String) {
    match value {
        Value::Undefined | Value::Null => out.push_str("null"),
        Value::Number(n) if n.is_nan() => out.push_str("null"),
        Value::Number(n) => write_number(*n, out),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::String(s) => write_quoted(s, out),
        Value::Date(date) => write_quoted(&format_date(date), out),
        Value::Function(function) => {
            write_quoted(&format!("[function {}]", function.name()), out)
        }
        Value::Proxy(proxy) => write_canonical(&proxy.original(), ancestors, out),
        Value::Array(array) => {
            let written = with_ancestor(ancestors, array.addr(), |ancestors| {
                out.push('[');
                for (i, item) in array.to_vec().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_canonical(item, ancestors, out);
                }
                out.push(']');
            });
            if written.is_none() {
                write_quoted(CIRCULAR_MARKER, out);
            }
        }
        Value::Object(object) => {
            let written = with_ancestor(ancestors, object.addr(), |ancestors| {
                out.push('{');
                let mut first = true;
                for (key, member) in object.entries() {
                    if member.is_undefined() {
                        continue;
                    }
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    write_quoted(&key, out);
                    out.push(':');
                    write_canonical(&member, ancestors, out);
                }
                out.push('}');
            });
            if written.is_none() {
                write_quoted(CIRCULAR_MARKER, out);
            }
        }
    }
}

fn write_number(n: f64, out: &mut String) {
    if n.is_infinite() {
        out.push_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    } else if n == 0.0 {
        out.push('0');
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_quoted(s: &str, out: &mut String) {
    out.push_str(&serde_json::Value::from(s).to_string());
}
