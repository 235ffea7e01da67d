//! Ordered interceptor chain
//!
//! Every interceptor sees every descriptor, in registration order, even
//! after an earlier one produced a result. The last concrete result wins.

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Trait for observing or overriding accesses
///
/// Return `Ok(None)` (or `Ok(Some(Value::Undefined))`) to decline. Any other
/// value, including `Null` and `false`, is a decision. An error aborts the
/// evaluation of the current descriptor.
pub trait Interceptor {
    fn intercept(&self, descriptor: &Descriptor) -> Result<Option<Value>>;
}

impl<F> Interceptor for F
where
    F: Fn(&Descriptor) -> Result<Option<Value>>,
{
    fn intercept(&self, descriptor: &Descriptor) -> Result<Option<Value>> {
        self(descriptor)
    }
}

/// Wrap a closure as a shared interceptor
pub fn from_fn<F>(f: F) -> Rc<dyn Interceptor>
where
    F: Fn(&Descriptor) -> Result<Option<Value>> + 'static,
{
    Rc::new(f)
}

/// Normalize an interceptor outcome: `undefined` counts as declined.
pub(crate) fn concrete(outcome: Option<Value>) -> Option<Value> {
    outcome.filter(|value| !value.is_undefined())
}

/// Ordered, append-only list of interceptors
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: RefCell<Vec<Rc<dyn Interceptor>>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. There is no removal.
    pub fn register(&self, interceptor: Rc<dyn Interceptor>) {
        self.interceptors.borrow_mut().push(interceptor);
        tracing::debug!(count = self.len(), "registered interceptor");
    }

    pub fn len(&self) -> usize {
        self.interceptors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.borrow().is_empty()
    }

    /// Run every interceptor and return the last concrete result.
    ///
    /// Iterates over a snapshot, so interceptors may register further
    /// interceptors or access proxies while being evaluated; additions apply
    /// from the next descriptor on.
    pub fn evaluate(&self, descriptor: &Descriptor) -> Result<Option<Value>> {
        let snapshot: Vec<_> = self.interceptors.borrow().clone();
        let mut verdict = None;
        for interceptor in snapshot {
            if let Some(value) = concrete(interceptor.intercept(descriptor)?) {
                verdict = Some(value);
            }
        }
        tracing::trace!(
            kind = %descriptor.kind(),
            member = descriptor.member().name(),
            intercepted = verdict.is_some(),
            "evaluated interceptor chain"
        );
        Ok(verdict)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.len())
            .finish()
    }
}
