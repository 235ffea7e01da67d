//! Pattern-gated interceptors
//!
//! The registry is itself an interceptor and is installed as the first
//! member of every environment's chain. It re-dispatches each descriptor to
//! the handlers whose pattern matches it.

use crate::chain::{concrete, Interceptor};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::pattern::DescriptorPattern;
use crate::types::{IdCounter, SelectiveId};
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A registered handler with its pattern
struct SelectiveEntry {
    id: SelectiveId,
    pattern: DescriptorPattern,
    handler: Rc<dyn Interceptor>,
}

/// Ordered collection of pattern-gated handlers
///
/// Matching handlers all run, in registration order; the last concrete
/// result wins, exactly as in the chain itself.
#[derive(Default)]
pub struct SelectiveInterceptorRegistry {
    entries: RefCell<Vec<Rc<SelectiveEntry>>>,
    ids: IdCounter,
}

impl SelectiveInterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler gated by `pattern`
    pub fn add_selective_interceptor(
        &self,
        pattern: DescriptorPattern,
        handler: Rc<dyn Interceptor>,
    ) -> SelectiveId {
        let id = self.ids.next();
        tracing::debug!(%id, member = ?pattern.member, kind = ?pattern.kind, "added selective interceptor");
        self.entries.borrow_mut().push(Rc::new(SelectiveEntry {
            id,
            pattern,
            handler,
        }));
        id
    }

    /// Remove a handler. Returns false if it was not present.
    pub fn remove_selective_interceptor(&self, id: SelectiveId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        // The handler may own proxies; drop it after the borrow ends
        let removed = entries.remove(index);
        drop(entries);
        drop(removed);
        tracing::debug!(%id, "removed selective interceptor");
        true
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Patterns of all active entries, in registration order (for debugging)
    pub fn patterns(&self) -> Vec<(SelectiveId, DescriptorPattern)> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| (entry.id, entry.pattern.clone()))
            .collect()
    }
}

impl Interceptor for SelectiveInterceptorRegistry {
    fn intercept(&self, descriptor: &Descriptor) -> Result<Option<Value>> {
        let event = descriptor.to_object();
        // Select first, then dispatch: handlers may add or remove entries.
        let matching: Vec<_> = self
            .entries
            .borrow()
            .iter()
            .filter(|entry| entry.pattern.matches_object(&event))
            .cloned()
            .collect();

        let mut verdict = None;
        for entry in matching {
            tracing::trace!(id = %entry.id, "dispatching to selective interceptor");
            if let Some(value) = concrete(entry.handler.intercept(descriptor)?) {
                verdict = Some(value);
            }
        }
        Ok(verdict)
    }
}

impl fmt::Debug for SelectiveInterceptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectiveInterceptorRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::from_fn;
    use crate::descriptor::AccessKind;
    use crate::value::ObjectRef;
    use std::cell::Cell;

    fn set_event(new_value: &str) -> Descriptor {
        Descriptor::set(
            Value::from(ObjectRef::from_pairs([("a", "old")])),
            "a",
            Value::from("old"),
            Value::from(new_value),
        )
    }

    #[test]
    fn test_only_matching_handlers_fire() {
        let registry = SelectiveInterceptorRegistry::new();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        registry.add_selective_interceptor(
            DescriptorPattern::new()
                .kind(AccessKind::Set)
                .property("a")
                .new_value("X"),
            from_fn(move |_| {
                counter.set(counter.get() + 1);
                Ok(None)
            }),
        );

        registry.intercept(&set_event("Y")).unwrap();
        assert_eq!(fired.get(), 0);
        registry.intercept(&set_event("X")).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_later_matching_entry_wins() {
        let registry = SelectiveInterceptorRegistry::new();
        let pattern = DescriptorPattern::new().kind(AccessKind::Set);
        registry.add_selective_interceptor(pattern.clone(), from_fn(|_| Ok(Some("one".into()))));
        registry.add_selective_interceptor(pattern.clone(), from_fn(|_| Ok(Some("two".into()))));
        registry.add_selective_interceptor(pattern, from_fn(|_| Ok(None)));

        let verdict = registry.intercept(&set_event("X")).unwrap();
        assert_eq!(verdict, Some(Value::from("two")));
    }

    #[test]
    fn test_remove() {
        let registry = SelectiveInterceptorRegistry::new();
        let id = registry.add_selective_interceptor(
            DescriptorPattern::new(),
            from_fn(|_| Ok(Some(Value::from(1)))),
        );
        assert_eq!(registry.len(), 1);

        assert!(registry.remove_selective_interceptor(id));
        assert!(registry.is_empty());
        assert_eq!(registry.intercept(&set_event("X")).unwrap(), None);

        // Double removal is a no-op
        assert!(!registry.remove_selective_interceptor(id));
    }

    #[test]
    fn test_handler_may_remove_itself() {
        let registry = Rc::new(SelectiveInterceptorRegistry::new());
        let slot: Rc<Cell<Option<SelectiveId>>> = Rc::new(Cell::new(None));
        let (reg, own) = (registry.clone(), slot.clone());
        let id = registry.add_selective_interceptor(
            DescriptorPattern::new(),
            from_fn(move |_| {
                if let Some(id) = own.get() {
                    reg.remove_selective_interceptor(id);
                }
                Ok(Some(Value::from("once")))
            }),
        );
        slot.set(Some(id));

        assert_eq!(
            registry.intercept(&set_event("X")).unwrap(),
            Some(Value::from("once"))
        );
        assert_eq!(registry.intercept(&set_event("X")).unwrap(), None);
    }
}
