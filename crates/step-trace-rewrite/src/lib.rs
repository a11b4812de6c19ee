//! Node-id assignment and instrumentation planning over the parsed tree.

pub mod node_table;
pub mod walk;
pub mod wrap_plan;

pub use node_table::{assign_ids_and_build_table, Entry, NodeTable};
pub use walk::AnyNode;
pub use wrap_plan::{compute_wrap_plan, WrapPlan};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assigns_ids_breadth_first() {
        let module = step_trace_parse::parse("x = 1\nif x:\n    y = 2\n").unwrap();
        let table = assign_ids_and_build_table(&module, "x = 1\nif x:\n    y = 2\n");
        // Root statements (ids 0, 1) come before either root's children.
        let first = module.body[0].id.get();
        let second = module.body[1].id.get();
        assert!(first.index() < second.index());
        assert!(table.entries.contains_key(&first));
        assert!(table.entries.contains_key(&second));
    }

    #[test]
    fn assignment_target_is_unwrapped_but_value_is_wrapped() {
        let module = step_trace_parse::parse("x = 1\n").unwrap();
        assign_ids_and_build_table(&module, "x = 1\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::Assign { targets, value } = &module.body[0].kind else {
            panic!("expected assign")
        };
        assert!(!plan.is_wrapped(targets[0].id.get()));
        assert!(plan.is_wrapped(value.id.get()));
    }

    #[test]
    fn subscript_target_value_and_index_stay_wrapped() {
        let module = step_trace_parse::parse("arr[i] = 1\n").unwrap();
        assign_ids_and_build_table(&module, "arr[i] = 1\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::Assign { targets, .. } = &module.body[0].kind else {
            panic!("expected assign")
        };
        let step_trace_parse::ast::ExprKind::Subscript { value, index } = &targets[0].kind else {
            panic!("expected subscript target")
        };
        assert!(!plan.is_wrapped(targets[0].id.get()));
        assert!(plan.is_wrapped(value.id.get()));
        assert!(plan.is_wrapped(index.id.get()));
    }

    #[test]
    fn plain_call_name_is_unwrapped_but_args_are_wrapped() {
        let module = step_trace_parse::parse("foo(x)\n").unwrap();
        assign_ids_and_build_table(&module, "foo(x)\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::ExprStmt(call) = &module.body[0].kind else {
            panic!("expected expr stmt")
        };
        let step_trace_parse::ast::ExprKind::Call { func, args, .. } = &call.kind else {
            panic!("expected call")
        };
        assert!(!plan.is_wrapped(func.id.get()));
        assert!(plan.is_wrapped(args[0].id.get()));
    }

    #[test]
    fn method_call_attribute_and_receiver_are_unwrapped() {
        let module = step_trace_parse::parse("stack.push(x)\n").unwrap();
        assign_ids_and_build_table(&module, "stack.push(x)\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::ExprStmt(call) = &module.body[0].kind else {
            panic!("expected expr stmt")
        };
        let step_trace_parse::ast::ExprKind::Call { func, args, .. } = &call.kind else {
            panic!("expected call")
        };
        let step_trace_parse::ast::ExprKind::Attribute { value, .. } = &func.kind else {
            panic!("expected method attribute")
        };
        assert!(!plan.is_wrapped(func.id.get()));
        assert!(!plan.is_wrapped(value.id.get()));
        assert!(plan.is_wrapped(args[0].id.get()));
    }

    #[test]
    fn chained_attribute_receiver_still_wraps_its_own_subexpressions() {
        let module = step_trace_parse::parse("a.b.c(x)\n").unwrap();
        assign_ids_and_build_table(&module, "a.b.c(x)\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::ExprStmt(call) = &module.body[0].kind else {
            panic!("expected expr stmt")
        };
        let step_trace_parse::ast::ExprKind::Call { func, .. } = &call.kind else {
            panic!("expected call")
        };
        let step_trace_parse::ast::ExprKind::Attribute { value: receiver, .. } = &func.kind else {
            panic!("expected method attribute")
        };
        let step_trace_parse::ast::ExprKind::Attribute { value: innermost, .. } = &receiver.kind else {
            panic!("expected a.b attribute")
        };
        // `a.b.c` (func) and `a.b` (its immediate receiver) are excluded,
        // but the innermost `a` is not part of that call-func chain and
        // still wraps normally.
        assert!(!plan.is_wrapped(func.id.get()));
        assert!(!plan.is_wrapped(receiver.id.get()));
        assert!(plan.is_wrapped(innermost.id.get()));
    }

    #[test]
    fn if_test_is_marked_as_test_position() {
        let module = step_trace_parse::parse("if x:\n    pass\n").unwrap();
        assign_ids_and_build_table(&module, "if x:\n    pass\n");
        let plan = compute_wrap_plan(&module);
        let step_trace_parse::ast::StmtKind::If { test, .. } = &module.body[0].kind else {
            panic!("expected if")
        };
        assert!(plan.is_test(test.id.get()));
    }
}
