//! Trace assembly (§4.E): group raw steps by source line, compute per-group
//! deltas, compress each step against its group, and append a trailing
//! synthetic entry if the run's final locals outlived the last group.
//!
//! Grounded on `python_tracer.py::get_trace_data`. Three details are easy to
//! get backwards and are pinned down here exactly as the original does
//! them:
//!
//! - A group's representative `locals`/`var_table`/`object_table` are taken
//!   from the *first* step of that group, not the last.
//! - The delta baseline is the *previous group's* representative locals,
//!   not the previous individual step's locals.
//! - Step compression drops `locals`/`var_table`/`object_table`
//!   independently per field, whichever equal the group's value.

use indexmap::IndexMap;

use step_trace_core::{delta, Event, ObjectId, ObjectTableEntry, RawStep, Serialized, Step, TraceLineEntry};

/// Groups `steps` by source line (a new group starts whenever the line
/// changes or the event is `before-statement`), producing one
/// `TraceLineEntry` per group plus, if needed, a trailing synthetic entry.
/// Returns the assembled trace and the final locals snapshot (for
/// `metadata.finalLocals`).
#[must_use]
pub fn assemble_trace(steps: &[RawStep]) -> (Vec<TraceLineEntry>, IndexMap<String, Serialized>) {
    let mut trace: Vec<TraceLineEntry> = Vec::new();
    let mut current_line: Option<u32> = None;
    let mut current_steps: Vec<RawStep> = Vec::new();
    let mut group_locals: IndexMap<String, Serialized> = IndexMap::new();
    let mut prev_group_locals: IndexMap<String, Serialized> = IndexMap::new();
    let mut group_object_table: IndexMap<ObjectId, ObjectTableEntry> = IndexMap::new();
    let mut group_var_table: IndexMap<String, ObjectId> = IndexMap::new();

    for step in steps {
        let should_start_new_group = current_line != Some(step.line) || step.event == Event::BeforeStatement;
        if should_start_new_group {
            if !current_steps.is_empty() {
                trace.push(finish_group(
                    current_line.unwrap(),
                    &group_locals,
                    &prev_group_locals,
                    &group_object_table,
                    &group_var_table,
                    std::mem::take(&mut current_steps),
                ));
            }
            current_line = Some(step.line);
            prev_group_locals = group_locals.clone();
            group_locals = step.locals.clone();
            group_object_table = step.object_table.clone();
            group_var_table = step.var_table.clone();
        }
        current_steps.push(step.clone());
    }
    if !current_steps.is_empty() {
        trace.push(finish_group(current_line.unwrap(), &group_locals, &prev_group_locals, &group_object_table, &group_var_table, current_steps));
    }

    let final_locals = steps.last().map(|s| s.locals.clone()).unwrap_or_default();
    if let Some(last_entry) = trace.last() {
        if !final_locals.is_empty() && last_entry.locals != final_locals {
            let group_delta = delta(Some(&Serialized::Map(last_entry.locals.clone())), &Serialized::Map(final_locals.clone()));
            trace.push(TraceLineEntry {
                line_number: last_entry.line_number,
                locals: final_locals.clone(),
                var_table: last_entry.var_table.clone(),
                object_table: last_entry.object_table.clone(),
                delta: group_delta,
                steps: vec![last_entry.steps[0].clone()],
            });
        }
    }

    (trace, final_locals)
}

fn finish_group(
    line: u32,
    group_locals: &IndexMap<String, Serialized>,
    prev_group_locals: &IndexMap<String, Serialized>,
    group_object_table: &IndexMap<ObjectId, ObjectTableEntry>,
    group_var_table: &IndexMap<String, ObjectId>,
    raw_steps: Vec<RawStep>,
) -> TraceLineEntry {
    let group_delta = delta(Some(&Serialized::Map(prev_group_locals.clone())), &Serialized::Map(group_locals.clone()));
    let steps = raw_steps.into_iter().map(|raw| compress_step(raw, group_locals, group_object_table, group_var_table)).collect();
    TraceLineEntry { line_number: line, locals: group_locals.clone(), var_table: group_var_table.clone(), object_table: group_object_table.clone(), delta: group_delta, steps }
}

fn compress_step(
    raw: RawStep,
    group_locals: &IndexMap<String, Serialized>,
    group_object_table: &IndexMap<ObjectId, ObjectTableEntry>,
    group_var_table: &IndexMap<String, ObjectId>,
) -> Step {
    let locals = if raw.locals == *group_locals { None } else { Some(raw.locals) };
    let object_table = if raw.object_table == *group_object_table { None } else { Some(raw.object_table) };
    let var_table = if raw.var_table == *group_var_table { None } else { Some(raw.var_table) };
    Step {
        step: raw.step,
        event: raw.event,
        node_id: raw.node_id,
        focus: raw.focus,
        locals,
        var_table,
        object_table,
        value: raw.value,
        test: raw.test,
        stdout: raw.stdout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(step: u64, event: Event, line: u32, locals: &[(&str, i64)]) -> RawStep {
        RawStep {
            step,
            event,
            node_id: step_trace_core::NodeId::new(u32::try_from(step).unwrap()),
            line,
            focus: "x".to_string(),
            locals: locals.iter().map(|(k, v)| ((*k).to_string(), Serialized::Int(*v))).collect(),
            var_table: IndexMap::new(),
            object_table: IndexMap::new(),
            value: None,
            test: None,
            stdout: None,
        }
    }

    #[test]
    fn consecutive_executions_of_the_same_line_form_distinct_groups() {
        let steps = vec![
            raw(0, Event::BeforeStatement, 2, &[("i", 0)]),
            raw(1, Event::AfterStatement, 2, &[("i", 0)]),
            raw(2, Event::BeforeStatement, 2, &[("i", 1)]),
            raw(3, Event::AfterStatement, 2, &[("i", 1)]),
        ];
        let (trace, final_locals) = assemble_trace(&steps);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].locals.get("i"), Some(&Serialized::Int(0)));
        assert_eq!(trace[1].locals.get("i"), Some(&Serialized::Int(1)));
        assert_eq!(final_locals.get("i"), Some(&Serialized::Int(1)));
    }

    #[test]
    fn a_step_whose_locals_match_the_group_is_compressed() {
        let steps = vec![raw(0, Event::BeforeStatement, 1, &[("x", 1)]), raw(1, Event::AfterStatement, 1, &[("x", 1)])];
        let (trace, _) = assemble_trace(&steps);
        assert_eq!(trace.len(), 1);
        assert!(trace[0].steps[0].locals.is_none());
        assert!(trace[0].steps[1].locals.is_none());
    }

    #[test]
    fn delta_compares_against_the_previous_groups_locals_not_the_previous_step() {
        let steps = vec![
            raw(0, Event::BeforeStatement, 1, &[("x", 1)]),
            raw(1, Event::AfterStatement, 1, &[("x", 2)]),
            raw(2, Event::BeforeStatement, 2, &[("x", 2)]),
        ];
        let (trace, _) = assemble_trace(&steps);
        assert_eq!(trace.len(), 2);
        // Group 1's representative locals are from its first step (x=1);
        // group 2's delta must be computed against that, not against the
        // in-group step that changed x to 2.
        let Some(Serialized::Map(changed)) = &trace[1].delta else { panic!("expected a delta") };
        assert_eq!(changed.get("x"), Some(&Serialized::Int(2)));
    }

    #[test]
    fn trailing_entry_is_appended_when_the_final_step_outlives_its_group() {
        let steps = vec![raw(0, Event::BeforeStatement, 1, &[]), raw(1, Event::AfterStatement, 1, &[("result", 42)])];
        let (trace, final_locals) = assemble_trace(&steps);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].locals.get("result"), Some(&Serialized::Int(42)));
        assert_eq!(final_locals.get("result"), Some(&Serialized::Int(42)));
    }

    #[test]
    fn no_trailing_entry_when_the_last_step_matches_its_group() {
        let steps = vec![raw(0, Event::BeforeStatement, 1, &[("x", 1)]), raw(1, Event::AfterStatement, 1, &[("x", 1)])];
        let (trace, _) = assemble_trace(&steps);
        assert_eq!(trace.len(), 1);
    }
}
