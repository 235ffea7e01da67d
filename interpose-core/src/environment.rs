//! Isolated interception environment
//!
//! An environment owns one [`InterceptorChain`] and one
//! [`SelectiveInterceptorRegistry`]. The registry is installed as the first
//! chain entry, so selective rules run before any global interceptor and a
//! global interceptor can still override them.

use crate::chain::{from_fn, Interceptor, InterceptorChain};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::fluent::When;
use crate::proxy::Proxy;
use crate::registry::SelectiveInterceptorRegistry;
use crate::value::Value;
use std::rc::Rc;

/// Proxies hold the environment's chain, and the chain holds every handler.
/// A handler that captures one of those proxies therefore keeps the proxy,
/// the chain and itself alive until its rule is removed with
/// [`RuleHandle::remove`](crate::fluent::RuleHandle::remove). Capture the
/// original object instead when the handler only needs to read it.
#[derive(Debug)]
pub struct Environment {
    chain: Rc<InterceptorChain>,
    registry: Rc<SelectiveInterceptorRegistry>,
}

impl Environment {
    pub fn new() -> Self {
        let chain = Rc::new(InterceptorChain::new());
        let registry = Rc::new(SelectiveInterceptorRegistry::new());
        let entry: Rc<dyn Interceptor> = registry.clone();
        chain.register(entry);
        tracing::debug!("created interception environment");
        Self { chain, registry }
    }

    /// Wrap an object or array. Wrapping a proxy wraps its original.
    pub fn proxy(&self, target: impl Into<Value>) -> Result<Proxy> {
        Proxy::new(&target.into(), self.chain.clone())
    }

    /// Register a global interceptor. It sees every descriptor of every
    /// proxy in this environment, including proxies created earlier.
    pub fn intercept<F>(&self, interceptor: F)
    where
        F: Fn(&Descriptor) -> Result<Option<Value>> + 'static,
    {
        self.chain.register(from_fn(interceptor));
    }

    /// Start a fluent rule for `member`
    pub fn when(&self, member: impl Into<String>) -> When {
        When::new(self.registry.clone(), member.into())
    }

    pub fn registry(&self) -> &Rc<SelectiveInterceptorRegistry> {
        &self.registry
    }

    pub fn chain(&self) -> &Rc<InterceptorChain> {
        &self.chain
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;
    use std::cell::Cell;

    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_registry_is_first_chain_entry() {
        let env = Environment::new();
        assert_eq!(env.chain().len(), 1);
        env.intercept(|_| Ok(None));
        assert_eq!(env.chain().len(), 2);
        assert!(env.registry().is_empty());
    }

    #[test]
    fn test_global_interceptor_overrides_rule() {
        let env = Environment::new();
        let object = ObjectRef::from_pairs([("a", "Test")]);
        let proxy = env.proxy(object.clone()).unwrap();

        env.when("a")
            .of(object)
            .is_accessed()
            .unwrap()
            .then(|_| Ok(Some(Value::from("rule"))));
        assert_eq!(proxy.get("a").unwrap(), Value::from("rule"));

        env.intercept(|_| Ok(Some(Value::from("global"))));
        assert_eq!(proxy.get("a").unwrap(), Value::from("global"));
    }

    #[test]
    fn test_environments_are_isolated() {
        let object = ObjectRef::from_pairs([("a", "Test")]);
        let first = Environment::new();
        let second = Environment::new();
        let p1 = first.proxy(object.clone()).unwrap();
        let p2 = second.proxy(object).unwrap();

        first.intercept(|_| Ok(Some(Value::from("X"))));
        assert_eq!(p1.get("a").unwrap(), Value::from("X"));
        assert_eq!(p2.get("a").unwrap(), Value::from("Test"));
    }

    #[test]
    fn test_removing_rule_releases_captured_proxy() {
        let released = Rc::new(Cell::new(false));
        let env = Environment::new();
        let object = ObjectRef::from_pairs([("a", 1)]);
        let proxy = env.proxy(object.clone()).unwrap();

        let flag = DropFlag(released.clone());
        let captured = proxy.clone();
        let handle = env.when("a").of(object).is_accessed().unwrap().then(move |_| {
            let _ = (&flag, &captured);
            Ok(None)
        });
        assert_eq!(proxy.get("a").unwrap(), Value::from(1));

        drop(proxy);
        drop(env);
        assert!(!released.get());

        assert!(handle.remove());
        assert!(released.get());
    }

    #[test]
    fn test_proxy_of_proxy_wraps_original() {
        let env = Environment::new();
        let object = ObjectRef::from_pairs([("a", 1)]);
        let outer = env.proxy(env.proxy(object.clone()).unwrap()).unwrap();
        assert_eq!(outer.original(), Value::from(object));
    }
}
