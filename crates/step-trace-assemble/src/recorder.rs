//! Step Recorder (§3 "Step", §4.C).
//!
//! A `StepHooks` implementation that turns each callback the evaluator
//! fires into a `RawStep`. Grounded on the distilled design's tracer entry
//! points: "reads the calling frame's local variables, filters out names
//! beginning with `_` and any binding whose value is callable, serializes
//! the remainder, constructs the object table... and records a Step."

use indexmap::IndexMap;

use step_trace_core::{Event, RawStep, Serialized};
use step_trace_interp::format::serialize;
use step_trace_interp::object_table::{build_object_table, build_var_table};
use step_trace_interp::{StepEvent, StepHooks, Value};

fn is_callable(value: &Value) -> bool {
    matches!(value, Value::Function(_) | Value::Builtin(_) | Value::Class(_) | Value::BoundMethod(_) | Value::NativeMethod(_))
}

fn visible_locals(locals: &IndexMap<String, Value>) -> IndexMap<String, Value> {
    locals.iter().filter(|(name, value)| !name.starts_with('_') && !is_callable(value)).map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Accumulates one `RawStep` per callback, ready to hand to the assembler.
#[derive(Default)]
pub struct Recorder {
    pub steps: Vec<RawStep>,
    next_step: u64,
    pending_stdout: String,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_stdout(&mut self) -> Option<String> {
        if self.pending_stdout.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending_stdout))
        }
    }

    fn record(&mut self, event: Event, step_event: &StepEvent<'_>, value: Option<Serialized>) {
        let locals = visible_locals(step_event.locals);
        let var_table = build_var_table(&locals);
        let object_table = build_object_table(&locals);
        let stdout = self.take_stdout();
        let step = RawStep {
            step: self.next_step,
            event,
            node_id: step_event.node_id,
            line: step_event.line,
            focus: step_event.focus.to_string(),
            locals: locals.iter().map(|(k, v)| (k.clone(), serialize(v))).collect(),
            var_table,
            object_table,
            value,
            test: step_event.test,
            stdout,
        };
        self.next_step += 1;
        self.steps.push(step);
    }
}

impl StepHooks for Recorder {
    fn before_statement(&mut self, event: &StepEvent<'_>) {
        self.record(Event::BeforeStatement, event, None);
    }

    fn after_statement(&mut self, event: &StepEvent<'_>) {
        self.record(Event::AfterStatement, event, None);
    }

    fn before_expression(&mut self, event: &StepEvent<'_>) {
        self.record(Event::BeforeExpression, event, None);
    }

    fn after_expression(&mut self, event: &StepEvent<'_>, value: &Value) {
        // A call's own after-expression step is about invoking the callee,
        // not observing it as a value (§4.B, §9): drop the step entirely
        // when the produced value is itself callable.
        if is_callable(value) {
            return;
        }
        let serialized = serialize(value);
        self.record(Event::AfterExpression, event, Some(serialized));
    }

    fn note_stdout(&mut self, text: &str) {
        self.pending_stdout.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use step_trace_core::NodeId;

    fn event(locals: &IndexMap<String, Value>) -> StepEvent<'_> {
        StepEvent { node_id: NodeId::new(0), line: 1, focus: "x", locals, test: None }
    }

    #[test]
    fn underscore_prefixed_and_callable_bindings_are_hidden() {
        let mut locals = IndexMap::new();
        locals.insert("x".to_string(), Value::Int(1));
        locals.insert("_hidden".to_string(), Value::Int(2));
        locals.insert("helper".to_string(), Value::Builtin(std::rc::Rc::new(step_trace_interp::value::BuiltinFunction { name: "len" })));
        let visible = visible_locals(&locals);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains_key("x"));
    }

    #[test]
    fn stdout_from_a_print_call_attaches_to_the_next_recorded_step() {
        let mut recorder = Recorder::new();
        let locals = IndexMap::new();
        recorder.note_stdout("hi\n");
        recorder.after_expression(&event(&locals), &Value::None);
        assert_eq!(recorder.steps[0].stdout.as_deref(), Some("hi\n"));
        recorder.after_statement(&event(&locals));
        assert_eq!(recorder.steps[1].stdout, None);
    }

    #[test]
    fn after_expression_drops_the_step_when_the_value_is_callable() {
        let mut recorder = Recorder::new();
        let locals = IndexMap::new();
        let callable = Value::Builtin(std::rc::Rc::new(step_trace_interp::value::BuiltinFunction { name: "len" }));
        recorder.after_expression(&event(&locals), &callable);
        assert!(recorder.steps.is_empty());
    }

    #[test]
    fn steps_are_numbered_sequentially() {
        let mut recorder = Recorder::new();
        let locals = IndexMap::new();
        recorder.before_statement(&event(&locals));
        recorder.after_statement(&event(&locals));
        assert_eq!(recorder.steps[0].step, 0);
        assert_eq!(recorder.steps[1].step, 1);
    }
}
