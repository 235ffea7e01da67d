//! Interpose - runtime interception for dynamic object graphs
//!
//! This crate wraps objects in proxies that route every property read,
//! property write and method invocation through an ordered chain of
//! interceptors. Interceptors can observe an access, or override it by
//! returning a concrete value.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Environment                           │
//! │                                                              │
//! │   when(..).of(..).is_accessed().then(..)   intercept(..)     │
//! │                  │                              │            │
//! │                  ▼                              │            │
//! │   ┌──────────────────────────────┐              │            │
//! │   │ SelectiveInterceptorRegistry │  (entry #0)  │            │
//! │   └──────────────┬───────────────┘              │            │
//! │                  ▼                              ▼            │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │                  InterceptorChain                    │   │
//! │   └──────────────────────────▲───────────────────────────┘   │
//! │                              │ Descriptor (get/set/...)      │
//! │   ┌──────────────────────────┴───────────────────────────┐   │
//! │   │   Proxy ──► nested Proxy ──► nested Proxy ...        │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Descriptors
//!
//! Every access through a proxy produces a [`Descriptor`]: the original
//! object, the member name, the access kind (`get`, `set`, `invoke`,
//! `return`) and the values involved.
//!
//! ## Evaluate-all, last wins
//!
//! Every interceptor in the chain sees every descriptor, in registration
//! order. The last concrete result wins; earlier interceptors still run, so
//! observers and overrides can be freely mixed.
//!
//! ## Selective interceptors
//!
//! The registry holds handlers gated by a [`DescriptorPattern`]. Matching is
//! structural: the pattern's fields are compared against the same fields of
//! the descriptor through a cycle-safe canonical serialization.
//!
//! # Example
//!
//! ```rust
//! use interpose_core::{Environment, ObjectRef, Value};
//!
//! let env = Environment::new();
//! let obj = ObjectRef::from_pairs([("a", "Test")]);
//! let proxy = env.proxy(obj.clone()).unwrap();
//!
//! env.when("a")
//!     .of(obj)
//!     .is_accessed()
//!     .unwrap()
//!     .then(|_| Ok(Some(Value::from("X"))));
//!
//! assert_eq!(proxy.get("a").unwrap(), Value::from("X"));
//! ```

pub mod chain;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod fluent;
pub mod pattern;
pub mod proxy;
pub mod registry;
pub mod types;
pub mod value;

// Re-exports for convenience
pub use chain::{Interceptor, InterceptorChain};
pub use descriptor::{AccessKind, Descriptor, Member};
pub use environment::Environment;
pub use error::{InterceptError, Result};
pub use fluent::{MethodSelector, PropertySelector, Rule, RuleHandle, Selection, When};
pub use pattern::{canonical_string, structurally_equal, DescriptorPattern, CIRCULAR_MARKER};
pub use proxy::Proxy;
pub use registry::SelectiveInterceptorRegistry;
pub use types::SelectiveId;
pub use value::{ArrayRef, Function, ObjectRef, Value};
