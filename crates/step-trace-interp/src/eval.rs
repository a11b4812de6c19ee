//! The tree-walking evaluator.
//!
//! Statement/expression dispatch plays the role `ouros`'s bytecode
//! dispatch loop plays for `VmTracer`: every node the `WrapPlan` marks as
//! wrapped fires `before_expression`/`after_expression` around its
//! evaluation, and every statement fires `before_statement`/
//! `after_statement`, exactly where the distilled design's literal marker
//! calls would have been inserted.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use step_trace_core::NodeId;
use step_trace_parse::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, FStringSegment, Stmt, StmtKind, UnaryOp};
use step_trace_rewrite::WrapPlan;

use crate::builtins::call_builtin;
use crate::env::Scope;
use crate::format::repr;
use crate::hooks::{NoopHooks, StepEvent, StepHooks, DEFAULT_DEPTH_LIMIT, DEFAULT_STEP_LIMIT};
use crate::value::{is_truthy, type_name, BoundMethod, ClassValue, DictKey, FunctionValue, RangeValue, Value};

pub struct RuntimeErr {
    pub kind: String,
    pub message: String,
}

impl RuntimeErr {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self { kind: kind.to_string(), message: message.into() }
    }
}

pub enum Signal {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub type EResult<T> = Result<T, RuntimeErr>;

pub struct Interp<'a> {
    pub plan: &'a WrapPlan,
    pub source: &'a str,
    pub hooks: Box<dyn StepHooks + 'a>,
    pub stdout: String,
    pub step_count: u64,
    pub step_limit: u64,
    pub depth: u32,
    pub depth_limit: u32,
    frames: Vec<Scope>,
}

impl<'a> Interp<'a> {
    #[must_use]
    pub fn new(plan: &'a WrapPlan, source: &'a str, hooks: Box<dyn StepHooks + 'a>) -> Self {
        let mut interp = Self {
            plan,
            source,
            hooks,
            stdout: String::new(),
            step_count: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            frames: vec![Scope::new()],
        };
        crate::builtins::install_builtins(&mut interp);
        crate::prelude::install_prelude(&mut interp);
        interp
    }

    fn frame(&self) -> &Scope {
        self.frames.last().unwrap()
    }

    fn frame_mut(&mut self) -> &mut Scope {
        self.frames.last_mut().unwrap()
    }

    pub fn globals(&self) -> &Scope {
        &self.frames[0]
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.frames[0].set(name, value);
    }

    fn snapshot_locals(&self) -> IndexMap<String, Value> {
        self.frame().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn count_step(&mut self) -> EResult<()> {
        self.step_count += 1;
        if self.step_count > self.step_limit {
            return Err(RuntimeErr::new("ResourceError", "step limit exceeded"));
        }
        Ok(())
    }

    fn fire_before_stmt(&mut self, node_id: NodeId, line: u32, focus: &str) -> EResult<()> {
        self.count_step()?;
        let locals = self.snapshot_locals();
        let event = StepEvent { node_id, line, focus, locals: &locals, test: None };
        self.hooks.before_statement(&event);
        Ok(())
    }

    fn fire_after_stmt(&mut self, node_id: NodeId, line: u32, focus: &str) -> EResult<()> {
        self.count_step()?;
        let locals = self.snapshot_locals();
        let event = StepEvent { node_id, line, focus, locals: &locals, test: None };
        self.hooks.after_statement(&event);
        Ok(())
    }

    fn fire_before_expr(&mut self, node_id: NodeId, line: u32, focus: &str, test: Option<bool>) -> EResult<()> {
        self.count_step()?;
        let locals = self.snapshot_locals();
        let event = StepEvent { node_id, line, focus, locals: &locals, test };
        self.hooks.before_expression(&event);
        Ok(())
    }

    fn fire_after_expr(&mut self, node_id: NodeId, line: u32, focus: &str, test: Option<bool>, value: &Value) -> EResult<()> {
        self.count_step()?;
        let locals = self.snapshot_locals();
        let event = StepEvent { node_id, line, focus, locals: &locals, test };
        self.hooks.after_expression(&event, value);
        Ok(())
    }

    pub fn exec_block(&mut self, body: &[Stmt]) -> EResult<Signal> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Signal::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EResult<Signal> {
        let id = stmt.id.get();
        let line = stmt.span.start_line;
        let focus = focus_of_span(self.source, stmt.span);
        self.fire_before_stmt(id, line, &focus)?;
        let signal = self.exec_stmt_kind(stmt)?;
        self.fire_after_stmt(id, line, &focus)?;
        Ok(signal)
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> EResult<Signal> {
        match &stmt.kind {
            StmtKind::ExprStmt(e) => {
                self.eval(e)?;
                Ok(Signal::Normal)
            }
            StmtKind::Assign { targets, value } => {
                let v = self.eval(value)?;
                for target in targets {
                    self.assign(target, v.clone())?;
                }
                Ok(Signal::Normal)
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = self.eval(target)?;
                let rhs = self.eval(value)?;
                let updated = self.apply_binop(*op, &current, &rhs)?;
                self.assign(target, updated)?;
                Ok(Signal::Normal)
            }
            StmtKind::If { test, body, orelse } => {
                if is_truthy(&self.eval(test)?) {
                    self.exec_block(body)
                } else {
                    self.exec_block(orelse)
                }
            }
            StmtKind::While { test, body } => {
                while is_truthy(&self.eval(test)?) {
                    match self.exec_block(body)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                let items = self.materialize_iterable(&iterable)?;
                for item in items {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::Return(value) => {
                let v = match value {
                    Some(e) => self.eval(e)?,
                    None => Value::None,
                };
                Ok(Signal::Return(v))
            }
            StmtKind::Pass => Ok(Signal::Normal),
            StmtKind::Break => Ok(Signal::Break),
            StmtKind::Continue => Ok(Signal::Continue),
            StmtKind::FunctionDef { name, params, body } => {
                let func = Value::Function(Rc::new(FunctionValue {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(clone_block(body)),
                    closure_class: None,
                }));
                self.frame_mut().set(name.clone(), func);
                Ok(Signal::Normal)
            }
            StmtKind::ClassDef { name, bases, body } => {
                let mut base_classes = Vec::new();
                for b in bases {
                    if let Value::Class(c) = self.eval(b)? {
                        base_classes.push(c);
                    }
                }
                let mut methods = IndexMap::new();
                for inner in body {
                    if let StmtKind::FunctionDef { name: mname, params, body: mbody } = &inner.kind {
                        methods.insert(
                            mname.clone(),
                            Rc::new(FunctionValue {
                                name: mname.clone(),
                                params: params.clone(),
                                body: Rc::new(clone_block(mbody)),
                                closure_class: None,
                            }),
                        );
                    }
                }
                let class = Value::Class(Rc::new(ClassValue { name: name.clone(), bases: base_classes, methods }));
                self.frame_mut().set(name.clone(), class);
                Ok(Signal::Normal)
            }
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) -> EResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.frame_mut().set(name.clone(), value);
                Ok(())
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let values = self.materialize_iterable(&value)?;
                if values.len() != items.len() {
                    return Err(RuntimeErr::new(
                        "ValueError",
                        format!("expected {} values to unpack, got {}", items.len(), values.len()),
                    ));
                }
                for (item, v) in items.iter().zip(values) {
                    self.assign(item, v)?;
                }
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let index_value = self.eval(index)?;
                let container_value = self.eval(container)?;
                self.set_subscript(&container_value, &index_value, value)
            }
            ExprKind::Attribute { value: obj, attr } => {
                let obj_value = self.eval(obj)?;
                match obj_value {
                    Value::Instance(inst) => {
                        inst.borrow_mut().attrs.insert(attr.clone(), value);
                        Ok(())
                    }
                    other => Err(RuntimeErr::new(
                        "AttributeError",
                        format!("'{}' object has no settable attribute '{attr}'", type_name(&other)),
                    )),
                }
            }
            _ => Err(RuntimeErr::new("SyntaxError", "invalid assignment target")),
        }
    }

    fn set_subscript(&mut self, container: &Value, index: &Value, value: Value) -> EResult<()> {
        match container {
            Value::List(items) => {
                let i = as_index(index)?;
                let mut items = items.borrow_mut();
                let len = items.len() as i64;
                let idx = if i < 0 { i + len } else { i };
                if idx < 0 || idx >= len {
                    return Err(RuntimeErr::new("IndexError", "list assignment index out of range"));
                }
                items[idx as usize] = value;
                Ok(())
            }
            Value::Dict(entries) => {
                let key = DictKey::try_from_value(index).map_err(|m| RuntimeErr::new("TypeError", m))?;
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(RuntimeErr::new("TypeError", format!("'{}' object does not support item assignment", type_name(other)))),
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> EResult<Value> {
        let id = expr.id.get();
        let line = expr.span.start_line;
        let focus = focus_of_span(self.source, expr.span);
        let wrapped = self.plan.is_wrapped(id);
        let is_test = self.plan.is_test(id);
        if wrapped {
            self.fire_before_expr(id, line, &focus, None)?;
        }
        let value = self.eval_kind(expr)?;
        if wrapped {
            let test_result = is_test.then(|| is_truthy(&value));
            self.fire_after_expr(id, line, &focus, test_result, &value)?;
        }
        Ok(value)
    }

    fn eval_kind(&mut self, expr: &Expr) -> EResult<Value> {
        match &expr.kind {
            ExprKind::Name(name) => self.lookup(name),
            ExprKind::IntLit(i) => Ok(Value::Int(*i)),
            ExprKind::FloatLit(f) => Ok(Value::Float(*f)),
            ExprKind::StrLit(s) => Ok(Value::Str(Rc::new(s.clone()))),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLit => Ok(Value::None),
            ExprKind::JoinedStr(parts) => self.eval_joined_str(parts),
            ExprKind::List(items) => {
                let values = items.iter().map(|e| self.eval(e)).collect::<EResult<Vec<_>>>()?;
                Ok(Value::List(Rc::new(RefCell::new(values))))
            }
            ExprKind::Tuple(items) => {
                let values = items.iter().map(|e| self.eval(e)).collect::<EResult<Vec<_>>>()?;
                Ok(Value::Tuple(Rc::new(values)))
            }
            ExprKind::Set(items) => {
                let mut set = IndexSet::new();
                for e in items {
                    let v = self.eval(e)?;
                    set.insert(DictKey::try_from_value(&v).map_err(|m| RuntimeErr::new("TypeError", m))?);
                }
                Ok(Value::Set(Rc::new(RefCell::new(set))))
            }
            ExprKind::Dict(entries) => {
                let mut map = IndexMap::new();
                for (k, v) in entries {
                    let kv = self.eval(k)?;
                    let vv = self.eval(v)?;
                    map.insert(DictKey::try_from_value(&kv).map_err(|m| RuntimeErr::new("TypeError", m))?, vv);
                }
                Ok(Value::Dict(Rc::new(RefCell::new(map))))
            }
            ExprKind::Subscript { value, index } => {
                let container = self.eval(value)?;
                let idx = self.eval(index)?;
                self.get_subscript(&container, &idx)
            }
            ExprKind::Attribute { value, attr } => {
                let obj = self.eval(value)?;
                self.get_attribute(&obj, attr)
            }
            ExprKind::Call { func, args, kwargs } => self.eval_call(func, args, kwargs),
            ExprKind::Unary { op, operand } => {
                let v = self.eval(operand)?;
                self.apply_unary(*op, &v)
            }
            ExprKind::BinOp { left, op, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.apply_binop(*op, &l, &r)
            }
            ExprKind::BoolOp { op, values } => {
                let mut last = Value::Bool(*op == BoolOp::And);
                for (i, e) in values.iter().enumerate() {
                    last = self.eval(e)?;
                    let truthy = is_truthy(&last);
                    match op {
                        BoolOp::And if !truthy => return Ok(last),
                        BoolOp::Or if truthy => return Ok(last),
                        _ => {}
                    }
                    let _ = i;
                }
                Ok(last)
            }
            ExprKind::Compare { left, ops, comparators } => self.eval_compare(left, ops, comparators),
            ExprKind::IfExp { test, body, orelse } => {
                if is_truthy(&self.eval(test)?) {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
        }
    }

    fn eval_joined_str(&mut self, parts: &[FStringSegment]) -> EResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringSegment::Literal(s) => out.push_str(s),
                FStringSegment::Expr(e) => {
                    // Excluded from callback instrumentation (§4.B): swap
                    // in a no-op hook sink for the duration of this nested
                    // evaluation rather than consulting the wrap plan,
                    // since the plan never marks these nodes wrapped.
                    let saved = std::mem::replace(&mut self.hooks, Box::new(NoopHooks));
                    let result = self.eval(e);
                    self.hooks = saved;
                    out.push_str(&repr(&result?));
                }
            }
        }
        Ok(Value::Str(Rc::new(out)))
    }

    fn lookup(&self, name: &str) -> EResult<Value> {
        for scope in self.frames.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Ok(v.clone());
            }
        }
        Err(RuntimeErr::new("NameError", format!("name '{name}' is not defined")))
    }

    fn get_subscript(&self, container: &Value, index: &Value) -> EResult<Value> {
        match container {
            Value::List(items) => {
                let i = as_index(index)?;
                let items = items.borrow();
                let len = items.len() as i64;
                let idx = if i < 0 { i + len } else { i };
                items.get(idx as usize).cloned().ok_or_else(|| RuntimeErr::new("IndexError", "list index out of range"))
            }
            Value::Tuple(items) => {
                let i = as_index(index)?;
                let len = items.len() as i64;
                let idx = if i < 0 { i + len } else { i };
                items.get(idx as usize).cloned().ok_or_else(|| RuntimeErr::new("IndexError", "tuple index out of range"))
            }
            Value::Str(s) => {
                let i = as_index(index)?;
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let idx = if i < 0 { i + len } else { i };
                chars
                    .get(idx as usize)
                    .map(|c| Value::Str(Rc::new(c.to_string())))
                    .ok_or_else(|| RuntimeErr::new("IndexError", "string index out of range"))
            }
            Value::Dict(entries) => {
                let key = DictKey::try_from_value(index).map_err(|m| RuntimeErr::new("TypeError", m))?;
                entries.borrow().get(&key).cloned().ok_or_else(|| RuntimeErr::new("KeyError", repr(index)))
            }
            other => Err(RuntimeErr::new("TypeError", format!("'{}' object is not subscriptable", type_name(other)))),
        }
    }

    fn get_attribute(&self, obj: &Value, attr: &str) -> EResult<Value> {
        match obj {
            Value::Instance(inst) => {
                if let Some(v) = inst.borrow().attrs.get(attr) {
                    return Ok(v.clone());
                }
                if let Some(method) = inst.borrow().class.find_method(attr) {
                    return Ok(Value::BoundMethod(Rc::new(BoundMethod { receiver: obj.clone(), func: method })));
                }
                Err(RuntimeErr::new("AttributeError", format!("'{}' object has no attribute '{attr}'", type_name(obj))))
            }
            Value::Class(class) => {
                if let Some(method) = class.find_method(attr) {
                    return Ok(Value::Function(method));
                }
                Err(RuntimeErr::new("AttributeError", format!("type object '{}' has no attribute '{attr}'", class.name)))
            }
            _ => {
                if crate::builtins::is_known_method(obj, attr) {
                    Ok(Value::NativeMethod(Rc::new(crate::value::NativeMethodValue {
                        receiver: obj.clone(),
                        name: attr.to_string(),
                    })))
                } else {
                    Err(RuntimeErr::new("AttributeError", format!("'{}' object has no attribute '{attr}'", type_name(obj))))
                }
            }
        }
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr], kwargs: &[(String, Expr)]) -> EResult<Value> {
        let callee = self.eval(func)?;
        let arg_values = args.iter().map(|a| self.eval(a)).collect::<EResult<Vec<_>>>()?;
        let mut kwarg_values = IndexMap::new();
        for (name, e) in kwargs {
            kwarg_values.insert(name.clone(), self.eval(e)?);
        }
        self.call_value(&callee, arg_values, kwarg_values)
    }

    pub fn call_value(&mut self, callee: &Value, mut args: Vec<Value>, kwargs: IndexMap<String, Value>) -> EResult<Value> {
        match callee {
            Value::Builtin(b) => call_builtin(self, b.name, args, kwargs),
            Value::Class(class) => {
                if class.find_method("__init__").is_none() && crate::prelude::is_prelude_class(&class.name) {
                    let attrs = crate::prelude::default_attrs(&class.name, &args, &kwargs);
                    return Ok(Value::Instance(Rc::new(RefCell::new(crate::value::Instance { class: class.clone(), attrs }))));
                }
                let instance = Rc::new(RefCell::new(crate::value::Instance { class: class.clone(), attrs: IndexMap::new() }));
                if let Some(init) = class.find_method("__init__") {
                    let receiver = Value::Instance(instance.clone());
                    self.invoke_function(&init, Some(receiver), args, kwargs)?;
                }
                Ok(Value::Instance(instance))
            }
            Value::BoundMethod(m) => {
                args.insert(0, m.receiver.clone());
                self.invoke_function(&m.func, None, args, kwargs)
            }
            Value::Function(f) => self.invoke_function(f, None, args, kwargs),
            Value::NativeMethod(m) => crate::builtins::call_collection_method(&m.receiver, &m.name, args),
            other => Err(RuntimeErr::new("TypeError", format!("'{}' object is not callable", type_name(other)))),
        }
    }

    fn invoke_function(
        &mut self,
        func: &Rc<FunctionValue>,
        receiver: Option<Value>,
        args: Vec<Value>,
        mut kwargs: IndexMap<String, Value>,
    ) -> EResult<Value> {
        self.depth += 1;
        if self.depth > self.depth_limit {
            self.depth -= 1;
            return Err(RuntimeErr::new("RecursionError", "maximum recursion depth exceeded"));
        }
        let mut scope = Scope::new();
        let mut positional = args.into_iter();
        if let Some(recv) = receiver {
            if let Some(first) = func.params.first() {
                scope.set(first.clone(), recv);
            }
        }
        let skip = usize::from(scope.contains(func.params.first().map_or("", String::as_str)));
        for name in func.params.iter().skip(skip) {
            if let Some(v) = kwargs.swap_remove(name) {
                scope.set(name.clone(), v);
            } else if let Some(v) = positional.next() {
                scope.set(name.clone(), v);
            }
        }
        self.frames.push(scope);
        let result = self.exec_block(&func.body);
        self.frames.pop();
        self.depth -= 1;
        match result? {
            Signal::Return(v) => Ok(v),
            _ => Ok(Value::None),
        }
    }

    pub fn materialize_iterable(&mut self, value: &Value) -> EResult<Vec<Value>> {
        match value {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Tuple(items) => Ok(items.as_ref().clone()),
            Value::Set(items) => Ok(items.borrow().iter().map(DictKey::to_value).collect()),
            Value::Dict(entries) => Ok(entries.borrow().keys().map(DictKey::to_value).collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(Rc::new(c.to_string()))).collect()),
            Value::Range(r) => Ok(r.iter().map(Value::Int).collect()),
            Value::Enumerate(e) => Ok(e
                .items
                .iter()
                .enumerate()
                .map(|(i, v)| Value::Tuple(Rc::new(vec![Value::Int(e.start + i as i64), v.clone()])))
                .collect()),
            other => Err(RuntimeErr::new("TypeError", format!("'{}' object is not iterable", type_name(other)))),
        }
    }

    fn apply_unary(&self, op: UnaryOp, v: &Value) -> EResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!is_truthy(v))),
            UnaryOp::Neg => match v {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Bool(b) => Ok(Value::Int(-i64::from(*b))),
                other => Err(RuntimeErr::new("TypeError", format!("bad operand type for unary -: '{}'", type_name(other)))),
            },
        }
    }

    fn apply_binop(&self, op: BinOp, l: &Value, r: &Value) -> EResult<Value> {
        use Value::{Float, Int, Str};
        match (op, l, r) {
            (BinOp::Add, Str(a), Str(b)) => Ok(Str(Rc::new(format!("{a}{b}")))),
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                let mut out = a.borrow().clone();
                out.extend(b.borrow().iter().cloned());
                Ok(Value::List(Rc::new(RefCell::new(out))))
            }
            (BinOp::Mul, Str(a), Int(n)) | (BinOp::Mul, Int(n), Str(a)) => Ok(Str(Rc::new(a.repeat((*n).max(0) as usize)))),
            (_, Int(a), Int(b)) => self.int_binop(op, *a, *b),
            (_, Float(a), Float(b)) => self.float_binop(op, *a, *b),
            (_, Int(a), Float(b)) => self.float_binop(op, *a as f64, *b),
            (_, Float(a), Int(b)) => self.float_binop(op, *a, *b as f64),
            (_, Value::Bool(a), Value::Bool(b)) => self.int_binop(op, i64::from(*a), i64::from(*b)),
            _ => Err(RuntimeErr::new(
                "TypeError",
                format!("unsupported operand type(s) for {op:?}: '{}' and '{}'", type_name(l), type_name(r)),
            )),
        }
    }

    fn int_binop(&self, op: BinOp, a: i64, b: i64) -> EResult<Value> {
        match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Mul => Ok(Value::Int(a * b)),
            BinOp::Div => {
                if b == 0 {
                    Err(RuntimeErr::new("ZeroDivisionError", "division by zero"))
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    Err(RuntimeErr::new("ZeroDivisionError", "integer division or modulo by zero"))
                } else {
                    Ok(Value::Int(a.div_euclid(b)))
                }
            }
            BinOp::Mod => {
                if b == 0 {
                    Err(RuntimeErr::new("ZeroDivisionError", "integer division or modulo by zero"))
                } else {
                    Ok(Value::Int(a.rem_euclid(b)))
                }
            }
            BinOp::Pow => Ok(Value::Int(a.pow(u32::try_from(b.max(0)).unwrap_or(0)))),
        }
    }

    fn float_binop(&self, op: BinOp, a: f64, b: f64) -> EResult<Value> {
        match op {
            BinOp::Add => Ok(Value::Float(a + b)),
            BinOp::Sub => Ok(Value::Float(a - b)),
            BinOp::Mul => Ok(Value::Float(a * b)),
            BinOp::Div => Ok(Value::Float(a / b)),
            BinOp::FloorDiv => Ok(Value::Float((a / b).floor())),
            BinOp::Mod => Ok(Value::Float(a.rem_euclid(b))),
            BinOp::Pow => Ok(Value::Float(a.powf(b))),
        }
    }

    fn eval_compare(&mut self, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> EResult<Value> {
        let mut current = self.eval(left)?;
        for (op, comparator) in ops.iter().zip(comparators) {
            let next = self.eval(comparator)?;
            let holds = self.apply_cmp(*op, &current, &next)?;
            if !holds {
                return Ok(Value::Bool(false));
            }
            current = next;
        }
        Ok(Value::Bool(true))
    }

    fn apply_cmp(&mut self, op: CmpOp, l: &Value, r: &Value) -> EResult<bool> {
        match op {
            CmpOp::In | CmpOp::NotIn => {
                let contains = self.materialize_iterable(r)?.iter().any(|v| values_equal(v, l));
                Ok(if op == CmpOp::In { contains } else { !contains })
            }
            CmpOp::Is => Ok(identity_equal(l, r)),
            CmpOp::IsNot => Ok(!identity_equal(l, r)),
            CmpOp::Eq => Ok(values_equal(l, r)),
            CmpOp::NotEq => Ok(!values_equal(l, r)),
            CmpOp::Lt | CmpOp::LtEq | CmpOp::Gt | CmpOp::GtEq => {
                let ordering = numeric_cmp(l, r).ok_or_else(|| {
                    RuntimeErr::new("TypeError", format!("'{op:?}' not supported between instances of '{}' and '{}'", type_name(l), type_name(r)))
                })?;
                Ok(match op {
                    CmpOp::Lt => ordering.is_lt(),
                    CmpOp::LtEq => ordering.is_le(),
                    CmpOp::Gt => ordering.is_gt(),
                    CmpOp::GtEq => ordering.is_ge(),
                    _ => unreachable!(),
                })
            }
        }
    }
}

fn numeric_cmp(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => None,
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Tuple(a), Value::Tuple(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y)),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

fn identity_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::None, Value::None) => true,
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        _ => values_equal(l, r),
    }
}

fn as_index(value: &Value) -> EResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(RuntimeErr::new("TypeError", format!("indices must be integers, not '{}'", type_name(other)))),
    }
}

/// The exact source text a node covers, used as the `focus` field on every
/// step (§3). Mirrors `node_table.rs`'s `source_segment`, which performs
/// the same line/column slicing for the emitted structural tree.
fn focus_of_span(source: &str, span: step_trace_parse::ast::Span) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start_line = span.start_line.saturating_sub(1) as usize;
    let end_line = span.end_line.saturating_sub(1) as usize;
    if start_line >= lines.len() {
        return String::new();
    }
    if start_line == end_line {
        let line = lines[start_line];
        let start = (span.start_col as usize).min(line.len());
        let end = (span.end_col as usize).min(line.len()).max(start);
        return line[start..end].to_string();
    }
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate().take(end_line + 1).skip(start_line) {
        if i == start_line {
            let start = (span.start_col as usize).min(line.len());
            out.push_str(&line[start..]);
        } else if i == end_line {
            let end = (span.end_col as usize).min(line.len());
            out.push_str(&line[..end]);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn clone_block(body: &[Stmt]) -> Vec<Stmt> {
    body.iter().map(|s| Stmt { id: Cell::new(s.id.get()), span: s.span, kind: clone_stmt_kind(&s.kind) }).collect()
}

fn clone_stmt_kind(kind: &StmtKind) -> StmtKind {
    match kind {
        StmtKind::ExprStmt(e) => StmtKind::ExprStmt(Box::new(clone_expr(e))),
        StmtKind::Assign { targets, value } => {
            StmtKind::Assign { targets: targets.iter().map(clone_expr).collect(), value: Box::new(clone_expr(value)) }
        }
        StmtKind::AugAssign { target, op, value } => {
            StmtKind::AugAssign { target: Box::new(clone_expr(target)), op: *op, value: Box::new(clone_expr(value)) }
        }
        StmtKind::If { test, body, orelse } => {
            StmtKind::If { test: Box::new(clone_expr(test)), body: clone_block(body), orelse: clone_block(orelse) }
        }
        StmtKind::While { test, body } => StmtKind::While { test: Box::new(clone_expr(test)), body: clone_block(body) },
        StmtKind::For { target, iter, body } => {
            StmtKind::For { target: Box::new(clone_expr(target)), iter: Box::new(clone_expr(iter)), body: clone_block(body) }
        }
        StmtKind::Return(v) => StmtKind::Return(v.as_ref().map(|e| Box::new(clone_expr(e)))),
        StmtKind::Pass => StmtKind::Pass,
        StmtKind::Break => StmtKind::Break,
        StmtKind::Continue => StmtKind::Continue,
        StmtKind::FunctionDef { name, params, body } => {
            StmtKind::FunctionDef { name: name.clone(), params: params.clone(), body: clone_block(body) }
        }
        StmtKind::ClassDef { name, bases, body } => {
            StmtKind::ClassDef { name: name.clone(), bases: bases.iter().map(clone_expr).collect(), body: clone_block(body) }
        }
    }
}

fn clone_expr(e: &Expr) -> Expr {
    Expr { id: Cell::new(e.id.get()), span: e.span, kind: clone_expr_kind(&e.kind) }
}

fn clone_expr_kind(kind: &ExprKind) -> ExprKind {
    match kind {
        ExprKind::Name(n) => ExprKind::Name(n.clone()),
        ExprKind::IntLit(i) => ExprKind::IntLit(*i),
        ExprKind::FloatLit(f) => ExprKind::FloatLit(*f),
        ExprKind::StrLit(s) => ExprKind::StrLit(s.clone()),
        ExprKind::BoolLit(b) => ExprKind::BoolLit(*b),
        ExprKind::NoneLit => ExprKind::NoneLit,
        ExprKind::JoinedStr(parts) => ExprKind::JoinedStr(
            parts
                .iter()
                .map(|p| match p {
                    FStringSegment::Literal(s) => FStringSegment::Literal(s.clone()),
                    FStringSegment::Expr(e) => FStringSegment::Expr(Box::new(clone_expr(e))),
                })
                .collect(),
        ),
        ExprKind::List(items) => ExprKind::List(items.iter().map(clone_expr).collect()),
        ExprKind::Tuple(items) => ExprKind::Tuple(items.iter().map(clone_expr).collect()),
        ExprKind::Dict(entries) => ExprKind::Dict(entries.iter().map(|(k, v)| (clone_expr(k), clone_expr(v))).collect()),
        ExprKind::Set(items) => ExprKind::Set(items.iter().map(clone_expr).collect()),
        ExprKind::Subscript { value, index } => {
            ExprKind::Subscript { value: Box::new(clone_expr(value)), index: Box::new(clone_expr(index)) }
        }
        ExprKind::Attribute { value, attr } => ExprKind::Attribute { value: Box::new(clone_expr(value)), attr: attr.clone() },
        ExprKind::Call { func, args, kwargs } => ExprKind::Call {
            func: Box::new(clone_expr(func)),
            args: args.iter().map(clone_expr).collect(),
            kwargs: kwargs.iter().map(|(k, v)| (k.clone(), clone_expr(v))).collect(),
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary { op: *op, operand: Box::new(clone_expr(operand)) },
        ExprKind::BinOp { left, op, right } => {
            ExprKind::BinOp { left: Box::new(clone_expr(left)), op: *op, right: Box::new(clone_expr(right)) }
        }
        ExprKind::BoolOp { op, values } => ExprKind::BoolOp { op: *op, values: values.iter().map(clone_expr).collect() },
        ExprKind::Compare { left, ops, comparators } => {
            ExprKind::Compare { left: Box::new(clone_expr(left)), ops: ops.clone(), comparators: comparators.iter().map(clone_expr).collect() }
        }
        ExprKind::IfExp { test, body, orelse } => ExprKind::IfExp {
            test: Box::new(clone_expr(test)),
            body: Box::new(clone_expr(body)),
            orelse: Box::new(clone_expr(orelse)),
        },
    }
}

pub fn make_range(start: i64, stop: i64, step: i64) -> Value {
    Value::Range(RangeValue { start, stop, step })
}
