//! Scenario files.
//!
//! ```yaml
//! object:
//!   user:
//!     name: Ada
//!     greet: null
//! methods:
//!   - path: user.greet
//!     returns: hello
//! rules:
//!   - when: name
//!     of: user
//!     on: accessed
//!     result: Grace
//! steps:
//!   - op: get
//!     path: user.name
//!   - op: call
//!     path: user.greet
//! ```
//!
//! Mapping order in the file is kept in the object tree, so structural
//! matching sees members in the order they were written.

use interpose_core::{Environment, Function, InterceptError, ObjectRef, Rule, RuleHandle, Value};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Path `{path}` does not resolve: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Rule {index}: {source}")]
    Rule {
        index: usize,
        #[source]
        source: Box<ScenarioError>,
    },

    #[error(transparent)]
    Intercept(#[from] InterceptError),
}

/// A scenario: object tree, stubs, rules and the accesses to perform
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub object: serde_yaml::Value,

    #[serde(default)]
    pub methods: Vec<MethodStub>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A method with a canned return value, installed at a dotted path
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodStub {
    pub path: String,

    #[serde(default)]
    pub returns: serde_yaml::Value,
}

/// Which fluent capability a rule uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Accessed,
    Set,
    Invoked,
    Returns,
}

/// A fluent rule: `when(member).of(target).<on>.then(|_| result)`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub when: String,

    /// Dotted path of the target object; empty for the root
    #[serde(default)]
    pub of: String,

    pub on: Trigger,

    /// `newValue` filter for `set`, returned-value filter for `returns`.
    /// An explicit `null` is a filter, not an absent one.
    #[serde(default, deserialize_with = "present")]
    pub value: Option<serde_yaml::Value>,

    /// Argument filter for `invoked`
    #[serde(default)]
    pub args: Option<Vec<serde_yaml::Value>>,

    /// Value the handler returns; absent means observe only, `null` is a
    /// concrete result
    #[serde(default, deserialize_with = "present")]
    pub result: Option<serde_yaml::Value>,
}

/// `Some` whenever the key is present, including `key: null`
fn present<'de, D>(deserializer: D) -> Result<Option<serde_yaml::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_yaml::Value::deserialize(deserializer).map(Some)
}

/// One access performed through the root proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase", deny_unknown_fields)]
pub enum Step {
    Get {
        path: String,
    },
    Set {
        path: String,
        value: serde_yaml::Value,
    },
    Call {
        path: String,
        #[serde(default)]
        args: Vec<serde_yaml::Value>,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::Get { .. } => "get",
            Step::Set { .. } => "set",
            Step::Call { .. } => "call",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Step::Get { path } | Step::Set { path, .. } | Step::Call { path, .. } => path,
        }
    }
}

/// Counts reported by a successful validation
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub members: Vec<String>,
    pub methods: usize,
    pub rules: usize,
    pub steps: usize,
}

impl Scenario {
    /// Load a scenario from a YAML (or JSON) file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build the object tree and install the method stubs
    pub fn build_object(&self) -> Result<Value, ScenarioError> {
        let root = to_value(&self.object)?;
        if !root.is_object_like() {
            return Err(ScenarioError::UnsupportedValue(format!(
                "scenario object must be a mapping or sequence, found {}",
                root.type_name()
            )));
        }
        for stub in &self.methods {
            install_stub(&root, stub)?;
        }
        Ok(root)
    }

    /// Register every rule in `env`, targeting members of `root`
    pub fn register_rules(
        &self,
        env: &Environment,
        root: &Value,
    ) -> Result<Vec<RuleHandle>, ScenarioError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                spec.register(env, root)
                    .map_err(|source| ScenarioError::Rule {
                        index: index + 1,
                        source: Box::new(source),
                    })
            })
            .collect()
    }

    /// Check the scenario against its initial object tree without running it
    pub fn validate(&self) -> Result<ScenarioSummary, ScenarioError> {
        let root = self.build_object()?;

        let scratch = Environment::new();
        for (index, spec) in self.rules.iter().enumerate() {
            if let Err(source) = spec.rule(&scratch, &root) {
                return Err(ScenarioError::Rule {
                    index: index + 1,
                    source: Box::new(source),
                });
            }
        }

        for step in &self.steps {
            let member = resolve(&root, step.path())?;
            if matches!(step, Step::Call { .. }) && !member.is_callable() {
                return Err(ScenarioError::InvalidPath {
                    path: step.path().to_string(),
                    reason: format!("{} is not a method", member.type_name()),
                });
            }
        }

        let members = match &root {
            Value::Object(object) => object.keys(),
            Value::Array(array) => (0..array.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        Ok(ScenarioSummary {
            members,
            methods: self.methods.len(),
            rules: self.rules.len(),
            steps: self.steps.len(),
        })
    }
}

impl RuleSpec {
    /// Build the fluent rule without registering a handler
    pub fn rule(&self, env: &Environment, root: &Value) -> Result<Rule, ScenarioError> {
        if self.args.is_some() && self.on != Trigger::Invoked {
            return Err(ScenarioError::InvalidRule(
                "`args` only applies to `on: invoked`".to_string(),
            ));
        }
        if self.value.is_some() && !matches!(self.on, Trigger::Set | Trigger::Returns) {
            return Err(ScenarioError::InvalidRule(
                "`value` only applies to `on: set` and `on: returns`".to_string(),
            ));
        }

        let target = resolve(root, &self.of)?;
        if target.member(&self.when).is_none() {
            return Err(ScenarioError::InvalidRule(format!(
                "target has no member `{}`",
                self.when
            )));
        }

        let selection = env.when(self.when.clone()).of(target);
        let rule = match (self.on, &self.value, &self.args) {
            (Trigger::Accessed, _, _) => selection.is_accessed()?,
            (Trigger::Set, Some(value), _) => selection.is_set_to(to_value(value)?)?,
            (Trigger::Set, None, _) => selection.is_set()?,
            (Trigger::Invoked, _, Some(args)) => selection.is_invoked_with(to_values(args)?)?,
            (Trigger::Invoked, _, None) => selection.is_invoked()?,
            (Trigger::Returns, Some(value), _) => selection.returns_with(to_value(value)?)?,
            (Trigger::Returns, None, _) => selection.returns()?,
        };
        Ok(rule)
    }

    /// Build the rule and register a handler returning `result`
    pub fn register(&self, env: &Environment, root: &Value) -> Result<RuleHandle, ScenarioError> {
        let rule = self.rule(env, root)?;
        let result = self.result.as_ref().map(to_value).transpose()?;
        let member = self.when.clone();
        Ok(rule.then(move |descriptor| {
            tracing::debug!(member = %member, kind = %descriptor.kind(), "scenario rule fired");
            Ok(result.clone())
        }))
    }
}

/// Follow a dotted path through the raw tree; the empty path is the root
pub fn resolve(root: &Value, path: &str) -> Result<Value, ScenarioError> {
    if path.is_empty() {
        return Ok(root.clone());
    }
    path.split('.').try_fold(root.clone(), |current, segment| {
        current
            .member(segment)
            .ok_or_else(|| ScenarioError::InvalidPath {
                path: path.to_string(),
                reason: format!("no member `{}`", segment),
            })
    })
}

fn install_stub(root: &Value, stub: &MethodStub) -> Result<(), ScenarioError> {
    let (parent, name) = stub.path.rsplit_once('.').unwrap_or(("", stub.path.as_str()));
    let object = match resolve(root, parent)? {
        Value::Object(object) => object,
        other => {
            return Err(ScenarioError::InvalidPath {
                path: stub.path.clone(),
                reason: format!("cannot add a method to {}", other.type_name()),
            })
        }
    };
    let returns = to_value(&stub.returns)?;
    object.insert(
        name,
        Function::new(name, move |_, _| Ok(returns.clone())),
    );
    Ok(())
}

/// Convert YAML into an engine value, keeping mapping order
pub fn to_value(yaml: &serde_yaml::Value) -> Result<Value, ScenarioError> {
    use serde_yaml::Value as Yaml;
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| ScenarioError::UnsupportedValue(n.to_string()))?,
        Yaml::String(s) => Value::from(s.as_str()),
        Yaml::Sequence(items) => Value::from(to_values(items)?),
        Yaml::Mapping(mapping) => {
            let object = ObjectRef::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => {
                        return Err(ScenarioError::UnsupportedValue(format!(
                            "mapping key {:?}",
                            other
                        )))
                    }
                };
                object.insert(key, to_value(value)?);
            }
            Value::from(object)
        }
        Yaml::Tagged(tagged) => {
            return Err(ScenarioError::UnsupportedValue(format!(
                "tagged value {}",
                tagged.tag
            )))
        }
    })
}

pub fn to_values(items: &[serde_yaml::Value]) -> Result<Vec<Value>, ScenarioError> {
    items.iter().map(to_value).collect()
}
