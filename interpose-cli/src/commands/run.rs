//! Execute a scenario through a proxy and report what happened.

use crate::scenario::{self, Scenario, ScenarioError, Step};
use anyhow::{Context, Result};
use interpose_core::{canonical_string, AccessKind, Descriptor, Environment, Proxy, Value};
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// One access seen by the recording interceptor
#[derive(Debug, Serialize)]
struct EventRecord {
    #[serde(rename = "type")]
    kind: AccessKind,
    member: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(rename = "newValue", skip_serializing_if = "Option::is_none")]
    new_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<serde_json::Value>>,
    #[serde(skip)]
    text: String,
}

impl From<&Descriptor> for EventRecord {
    fn from(descriptor: &Descriptor) -> Self {
        let mut text = format!("{} {}", descriptor.kind(), descriptor.member().name());
        if let Some(args) = descriptor.args() {
            text.push_str(&format!(" args={}", canonical_string(&Value::from(args.to_vec()))));
        }
        if let Some(value) = descriptor.value() {
            text.push_str(&format!(" value={}", canonical_string(value)));
        }
        if let Some(new_value) = descriptor.new_value() {
            text.push_str(&format!(" newValue={}", canonical_string(new_value)));
        }

        Self {
            kind: descriptor.kind(),
            member: descriptor.member().name().to_string(),
            value: descriptor.value().map(Value::to_json),
            new_value: descriptor.new_value().map(Value::to_json),
            args: descriptor
                .args()
                .map(|args| args.iter().map(Value::to_json).collect()),
            text,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    op: &'static str,
    path: String,
    result: serde_json::Value,
    #[serde(skip)]
    text: String,
}

#[derive(Serialize)]
struct RunReport<'a> {
    steps: &'a [StepReport],
    events: &'a [EventRecord],
}

/// Run every step of a scenario and print step results plus the event trace.
pub fn run_scenario(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path).context("Failed to load scenario")?;
    let root = scenario
        .build_object()
        .context("Failed to build object tree")?;

    let env = Environment::new();
    let proxy = env.proxy(root.clone()).context("Failed to proxy object tree")?;

    let events: Rc<RefCell<Vec<EventRecord>>> = Rc::default();
    let recorder = events.clone();
    env.intercept(move |descriptor| {
        recorder.borrow_mut().push(EventRecord::from(descriptor));
        Ok(None)
    });

    let handles = scenario
        .register_rules(&env, &root)
        .context("Failed to register rules")?;
    tracing::info!(rules = handles.len(), steps = scenario.steps.len(), "running scenario");

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = execute(&proxy, &root, step)
            .with_context(|| format!("Step {} ({} {}) failed", index + 1, step.op(), step.path()))?;
        reports.push(StepReport {
            step: index + 1,
            op: step.op(),
            path: step.path().to_string(),
            result: result.to_json(),
            text: canonical_string(&result),
        });
    }

    let events = events.borrow();
    if json {
        let report = RunReport {
            steps: &reports,
            events: &events,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for report in &reports {
            println!(
                "{}. {} {} -> {}",
                report.step, report.op, report.path, report.text
            );
        }
        println!();
        println!("Events ({}):", events.len());
        for event in events.iter() {
            println!("  {}", event.text);
        }
    }

    Ok(())
}

/// Perform one step. A `set` reports the value that ended up stored.
fn execute(proxy: &Proxy, root: &Value, step: &Step) -> Result<Value, ScenarioError> {
    match step {
        Step::Get { path } => Ok(proxy.get_path(path)?),
        Step::Set { path, value } => {
            proxy.set_path(path, scenario::to_value(value)?)?;
            scenario::resolve(root, path)
        }
        Step::Call { path, args } => Ok(proxy.call_path(path, &scenario::to_values(args)?)?),
    }
}
