//! Step observation hooks.
//!
//! Modeled directly on `ouros::tracer::VmTracer`: an all-default-no-op
//! trait so most implementors only override what they care about, fired by
//! the evaluator at the same points the distilled design's literal
//! `before_statement`/`after_statement`/`before_expression`/
//! `after_expression` marker calls would have fired. `NoopHooks` plays the
//! same role `ouros::tracer::NoopTracer` plays for callers that don't want
//! recording overhead — here, for evaluating the excluded f-string
//! placeholder sub-expressions (§4.B).

use indexmap::IndexMap;

use step_trace_core::{NodeId, ObjectId};

use crate::value::Value;

pub struct StepEvent<'a> {
    pub node_id: NodeId,
    pub line: u32,
    pub focus: &'a str,
    pub locals: &'a IndexMap<String, Value>,
    pub test: Option<bool>,
}

pub trait StepHooks {
    fn before_statement(&mut self, _event: &StepEvent<'_>) {}
    fn after_statement(&mut self, _event: &StepEvent<'_>) {}
    fn before_expression(&mut self, _event: &StepEvent<'_>) {}
    fn after_expression(&mut self, _event: &StepEvent<'_>, _value: &Value) {}
    fn note_stdout(&mut self, _text: &str) {}
    fn note_step_count(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn var_table_for(&self, _locals: &IndexMap<String, Value>) -> IndexMap<String, ObjectId> {
        IndexMap::new()
    }
}

#[derive(Default)]
pub struct NoopHooks;

impl StepHooks for NoopHooks {}

/// A value produced directly from the step-count ceiling, surfaced through
/// `step_trace_core::ResourceError` by the caller.
pub const DEFAULT_STEP_LIMIT: u64 = 200_000;
pub const DEFAULT_DEPTH_LIMIT: u32 = 500;
