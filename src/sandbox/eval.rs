//! Tree-walking evaluator over [`crate::python::ast`].
//!
//! Name resolution follows Python's static scoping: the set of local names
//! of every function body is computed before the body runs, so reading a
//! local before assignment raises `UnboundLocalError` instead of falling
//! through to an enclosing scope. Closures capture the defining frame by
//! reference, which gives late binding. Comprehensions get their own frame;
//! an assignment expression inside one binds in the enclosing function.

use crate::python::ast::*;
use crate::python::visit::{walk_body, walk_expr, walk_stmt, Visitor};
use crate::sandbox::budget::{Budget, SandboxLimits};
use crate::sandbox::builtins::{self, Args};
use crate::sandbox::fault::Fault;
use crate::sandbox::format::format_value;
use crate::sandbox::ops;
use crate::sandbox::value::{
    key_error, raise, type_error, unhashable, value_error, BoundMethod, EvalResult, ExceptionValue,
    IterState, Signal, SliceValue, Table, TypeKind, Value,
};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

/// Names a code block binds, split by declaration.
#[derive(Debug, Default)]
pub struct ScopeInfo {
    locals: HashSet<String>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

impl ScopeInfo {
    fn function(params: &[Parameter], body: FunctionBody<'_>) -> Self {
        let mut info = ScopeInfo::default();
        for param in params {
            info.locals.insert(param.name.clone());
        }
        let mut collector = LocalNames { info: &mut info };
        match body {
            FunctionBody::Block(stmts) => walk_body(&mut collector, stmts),
            FunctionBody::Expr(expr) => collector.visit_expr(expr),
        }
        let declared: Vec<String> = info
            .globals
            .iter()
            .chain(info.nonlocals.iter())
            .cloned()
            .collect();
        for name in declared {
            info.locals.remove(&name);
        }
        info
    }

    fn comprehension(clauses: &[ComprehensionClause]) -> Self {
        let mut info = ScopeInfo::default();
        let mut collector = LocalNames { info: &mut info };
        for clause in clauses {
            if let ComprehensionClause::For { target, .. } = clause {
                collector.bind(target);
            }
        }
        info
    }
}

/// Collects the names a function body binds without entering nested
/// function or lambda bodies.
struct LocalNames<'s> {
    info: &'s mut ScopeInfo,
}

impl LocalNames<'_> {
    fn bind(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.info.locals.insert(name.clone());
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.bind(elt);
                }
            }
            ExprKind::Starred(inner) => self.bind(inner),
            _ => {}
        }
    }
}

impl<'a> Visitor<'a> for LocalNames<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    self.bind(target);
                }
            }
            StmtKind::AnnAssign { target, .. }
            | StmtKind::AugAssign { target, .. }
            | StmtKind::For { target, .. } => self.bind(target),
            StmtKind::Try { handlers, .. } => {
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        self.info.locals.insert(name.clone());
                    }
                }
            }
            StmtKind::Global(names) => self.info.globals.extend(names.iter().cloned()),
            StmtKind::Nonlocal(names) => self.info.nonlocals.extend(names.iter().cloned()),
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_function_def(&mut self, def: &'a FunctionDef) {
        self.info.locals.insert(def.name.clone());
        for decorator in &def.decorators {
            self.visit_expr(decorator);
        }
        for param in &def.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::NamedExpr { target, .. } => {
                self.info.locals.insert(target.clone());
                walk_expr(self, expr);
            }
            ExprKind::Lambda { params, .. } => {
                for param in params {
                    if let Some(default) = &param.default {
                        self.visit_expr(default);
                    }
                }
            }
            _ => walk_expr(self, expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvKind {
    Module,
    Function,
    Comprehension,
}

/// One activation frame.
pub struct Env<'a> {
    kind: EnvKind,
    scope: Rc<ScopeInfo>,
    vars: RefCell<HashMap<String, Value<'a>>>,
    parent: Option<Rc<Env<'a>>>,
}

impl<'a> Env<'a> {
    fn new(kind: EnvKind, scope: Rc<ScopeInfo>, parent: Option<Rc<Env<'a>>>) -> Self {
        Self {
            kind,
            scope,
            vars: RefCell::new(HashMap::new()),
            parent,
        }
    }
}

#[derive(Clone, Copy)]
enum FunctionBody<'a> {
    Block(&'a [Stmt]),
    Expr(&'a Expr),
}

/// A user-defined function or lambda.
pub struct Closure<'a> {
    pub name: String,
    params: &'a [Parameter],
    body: FunctionBody<'a>,
    defaults: Vec<Option<Value<'a>>>,
    scope: Rc<ScopeInfo>,
    env: Rc<Env<'a>>,
}

/// An iteration in progress, either private to a loop or shared with an
/// iterator object.
pub enum IterHandle<'a> {
    Owned(IterState<'a>),
    Shared(Rc<RefCell<IterState<'a>>>),
}

impl<'a> IterHandle<'a> {
    pub fn next_value(&mut self) -> Option<Value<'a>> {
        match self {
            IterHandle::Owned(state) => state.next_value(),
            IterHandle::Shared(state) => state.borrow_mut().next_value(),
        }
    }
}

enum Flow<'a> {
    Normal,
    Return(Value<'a>),
    Break,
    Continue,
}

enum Gather<'a> {
    Items(Vec<Value<'a>>),
    Pairs(Table<'a>),
}

pub struct Interpreter<'a> {
    budget: Budget,
    globals: Rc<Env<'a>>,
    scopes: HashMap<(usize, usize), Rc<ScopeInfo>>,
    handling: Vec<Value<'a>>,
    closure_envs: Vec<Weak<Env<'a>>>,
}

fn unsupported<'a>(what: &str) -> Signal<'a> {
    let first_line = what.lines().next().unwrap_or("").trim();
    let mut summary: String = first_line.chars().take(60).collect();
    if first_line.chars().count() > 60 {
        summary.push_str("...");
    }
    Signal::Abort(Fault::Unsupported(summary))
}

fn constant_value<'a>(constant: &Constant) -> EvalResult<'a, Value<'a>> {
    Ok(match constant {
        Constant::None => Value::None,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(n) => Value::Int(n.clone()),
        Constant::Float(f) => Value::Float(*f),
        Constant::Str(s) => Value::str(s.as_str()),
        Constant::Bytes(b) => Value::Bytes(b.clone().into()),
        Constant::Ellipsis => Value::Ellipsis,
        Constant::Imaginary(_) => return Err(unsupported("complex numbers")),
    })
}

/// Convert an escaped Python exception into a probe fault.
pub fn exception_fault(exc: &Value<'_>) -> Fault {
    match exc {
        Value::Exception(e) => Fault::exception(e.kind, e.message()),
        other => Fault::exception(other.type_name(), other.to_str()),
    }
}

impl<'a> Interpreter<'a> {
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            budget: Budget::start(limits),
            globals: Rc::new(Env::new(EnvKind::Module, Rc::default(), None)),
            scopes: HashMap::new(),
            handling: Vec::new(),
            closure_envs: Vec::new(),
        }
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn tick(&mut self) -> EvalResult<'a, ()> {
        self.budget.tick().map_err(Signal::Abort)
    }

    /// Bind `def` at module level. Decorators are not applied.
    pub fn define_function(&mut self, def: &'a FunctionDef) -> EvalResult<'a, Value<'a>> {
        if def.is_async {
            return Err(unsupported("async def"));
        }
        let globals = Rc::clone(&self.globals);
        let function = self.make_closure(
            def.name.clone(),
            &def.params,
            FunctionBody::Block(&def.body),
            &globals,
        )?;
        self.store(&globals, &def.name, function.clone());
        Ok(function)
    }

    fn make_closure(
        &mut self,
        name: String,
        params: &'a [Parameter],
        body: FunctionBody<'a>,
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, Value<'a>> {
        let mut defaults = Vec::with_capacity(params.len());
        for param in params {
            defaults.push(match &param.default {
                Some(default) => Some(self.eval(default, env)?),
                None => None,
            });
        }
        let body_key = match body {
            FunctionBody::Block(stmts) => stmts.as_ptr() as usize,
            FunctionBody::Expr(expr) => expr as *const Expr as usize,
        };
        let scope = Rc::clone(
            self.scopes
                .entry((body_key, params.as_ptr() as usize))
                .or_insert_with(|| Rc::new(ScopeInfo::function(params, body))),
        );
        if env.kind != EnvKind::Module {
            self.closure_envs.push(Rc::downgrade(env));
        }
        Ok(Value::Function(Rc::new(Closure {
            name,
            params,
            body,
            defaults,
            scope,
            env: Rc::clone(env),
        })))
    }

    fn load(&self, env: &Rc<Env<'a>>, name: &str) -> EvalResult<'a, Value<'a>> {
        let mut current = Some(Rc::clone(env));
        let mut innermost = true;
        while let Some(frame) = current {
            if frame.kind == EnvKind::Module || frame.scope.globals.contains(name) {
                break;
            }
            if frame.scope.locals.contains(name) {
                if let Some(value) = frame.vars.borrow().get(name) {
                    return Ok(value.clone());
                }
                return if innermost && frame.kind == EnvKind::Function {
                    raise(
                        "UnboundLocalError",
                        format!(
                            "cannot access local variable '{}' where it is not associated with a value",
                            name
                        ),
                    )
                } else {
                    raise(
                        "NameError",
                        format!(
                            "cannot access free variable '{}' where it is not associated with a value in enclosing scope",
                            name
                        ),
                    )
                };
            }
            innermost = false;
            current = frame.parent.clone();
        }
        if let Some(value) = self.globals.vars.borrow().get(name) {
            return Ok(value.clone());
        }
        match builtins::lookup(name) {
            Some(Ok(value)) => Ok(value),
            Some(Err(fault)) => Err(Signal::Abort(fault)),
            None => raise("NameError", format!("name '{}' is not defined", name)),
        }
    }

    fn binding_env(&self, env: &Rc<Env<'a>>, name: &str) -> Rc<Env<'a>> {
        match env.kind {
            EnvKind::Module => Rc::clone(env),
            _ if env.scope.globals.contains(name) => Rc::clone(&self.globals),
            _ if env.scope.nonlocals.contains(name) => {
                let mut current = env.parent.clone();
                while let Some(frame) = current {
                    if frame.kind == EnvKind::Function && frame.scope.locals.contains(name) {
                        return frame;
                    }
                    current = frame.parent.clone();
                }
                Rc::clone(&self.globals)
            }
            EnvKind::Comprehension if !env.scope.locals.contains(name) => match &env.parent {
                Some(parent) => self.binding_env(parent, name),
                None => Rc::clone(&self.globals),
            },
            _ => Rc::clone(env),
        }
    }

    fn store(&self, env: &Rc<Env<'a>>, name: &str, value: Value<'a>) {
        let target = self.binding_env(env, name);
        target.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn call(
        &mut self,
        callee: &Value<'a>,
        args: Vec<Value<'a>>,
        kwargs: Vec<(String, Value<'a>)>,
    ) -> EvalResult<'a, Value<'a>> {
        self.tick()?;
        match callee {
            Value::Function(closure) => self.call_closure(closure, args, kwargs),
            Value::Builtin(builtin) => {
                builtins::call_builtin(self, *builtin, Args::new(builtin.name(), args, kwargs))
            }
            Value::Method(method) => builtins::call_method(
                self,
                &method.receiver,
                &method.name,
                Args::new(method.name.clone(), args, kwargs),
            ),
            Value::Type(kind) => builtins::construct(self, *kind, Args::new(kind.name(), args, kwargs)),
            other => type_error(format!("'{}' object is not callable", other.type_name())),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Rc<Closure<'a>>,
        args: Vec<Value<'a>>,
        kwargs: Vec<(String, Value<'a>)>,
    ) -> EvalResult<'a, Value<'a>> {
        let frame = Rc::new(Env::new(
            EnvKind::Function,
            Rc::clone(&closure.scope),
            Some(Rc::clone(&closure.env)),
        ));
        bind_arguments(closure, &frame, args, kwargs)?;
        self.budget.enter_call()?;
        let result = match closure.body {
            FunctionBody::Block(body) => self.exec_block(body, &frame).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::None,
            }),
            FunctionBody::Expr(expr) => self.eval(expr, &frame),
        };
        self.budget.exit_call();
        result
    }

    pub fn iter_handle(&mut self, value: &Value<'a>) -> EvalResult<'a, IterHandle<'a>> {
        Ok(IterHandle::Owned(match value {
            Value::List(items) => IterState::List {
                list: Rc::clone(items),
                pos: 0,
            },
            Value::Tuple(items) => IterState::items(items.as_ref().clone()),
            Value::Str(s) => IterState::items(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Bytes(b) => IterState::items(b.iter().map(|&byte| Value::int(byte)).collect()),
            Value::ByteArray(b) => {
                IterState::items(b.borrow().iter().map(|&byte| Value::int(byte)).collect())
            }
            Value::Dict(table) | Value::Set(table) | Value::FrozenSet(table) => {
                IterState::items(table.borrow().keys().cloned().collect())
            }
            Value::Range(r) => IterState::Range {
                next: r.start.clone(),
                stop: r.stop.clone(),
                step: r.step.clone(),
            },
            Value::Iterator(state) => return Ok(IterHandle::Shared(Rc::clone(state))),
            other => {
                return type_error(format!("'{}' object is not iterable", other.type_name()))
            }
        }))
    }

    /// Drain an iterable into a vector, charging one step per element.
    pub fn collect(&mut self, value: &Value<'a>) -> EvalResult<'a, Vec<Value<'a>>> {
        let mut handle = self.iter_handle(value)?;
        let mut out = Vec::new();
        while let Some(item) = handle.next_value() {
            self.tick()?;
            out.push(item);
            self.budget.check_len(out.len())?;
        }
        Ok(out)
    }

    fn exec_block(&mut self, body: &'a [Stmt], env: &Rc<Env<'a>>) -> EvalResult<'a, Flow<'a>> {
        for stmt in body {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &'a Stmt, env: &Rc<Env<'a>>) -> EvalResult<'a, Flow<'a>> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr, env)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value, env)?;
                for target in targets {
                    self.assign(target, value.clone(), env)?;
                }
            }
            StmtKind::AnnAssign { target, value, .. } => {
                if let Some(value) = value {
                    let value = self.eval(value, env)?;
                    self.assign(target, value, env)?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value, env)?,
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { test, body, orelse } => {
                let branch = if self.eval(test, env)?.truthy() { body } else { orelse };
                return self.exec_block(branch, env);
            }
            StmtKind::While { test, body, orelse } => loop {
                if !self.eval(test, env)?.truthy() {
                    return self.exec_block(orelse, env);
                }
                match self.exec_block(body, env)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.eval(iter, env)?;
                let mut handle = self.iter_handle(&iterable)?;
                while let Some(item) = handle.next_value() {
                    self.tick()?;
                    self.assign(target, item, env)?;
                    match self.exec_block(body, env)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                return self.exec_block(orelse, env);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => return self.exec_try(body, handlers, orelse, finalbody, env),
            StmtKind::FunctionDef(def) => {
                if def.is_async {
                    return Err(unsupported("async def"));
                }
                let mut decorators = Vec::with_capacity(def.decorators.len());
                for decorator in &def.decorators {
                    decorators.push(self.eval(decorator, env)?);
                }
                let mut function = self.make_closure(
                    def.name.clone(),
                    &def.params,
                    FunctionBody::Block(&def.body),
                    env,
                )?;
                for decorator in decorators.iter().rev() {
                    function = self.call(decorator, vec![function], Vec::new())?;
                }
                self.store(env, &def.name, function);
            }
            StmtKind::Raise { exc, cause } => {
                let exception = match exc {
                    Some(expr) => {
                        let value = self.eval(expr, env)?;
                        self.to_exception(value)?
                    }
                    None => match self.handling.last() {
                        Some(active) => active.clone(),
                        None => return raise("RuntimeError", "No active exception to reraise"),
                    },
                };
                if let Some(cause) = cause {
                    self.eval(cause, env)?;
                }
                return Err(Signal::Raise(exception));
            }
            StmtKind::Assert { test, msg } => {
                if !self.eval(test, env)?.truthy() {
                    let args = match msg {
                        Some(msg) => vec![self.eval(msg, env)?],
                        None => Vec::new(),
                    };
                    return Err(Signal::Raise(Value::Exception(Rc::new(ExceptionValue {
                        kind: "AssertionError",
                        args,
                    }))));
                }
            }
            StmtKind::Global(_) | StmtKind::Nonlocal(_) | StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Opaque(opaque) => return Err(unsupported(&opaque.source)),
        }
        Ok(Flow::Normal)
    }

    fn to_exception(&mut self, value: Value<'a>) -> EvalResult<'a, Value<'a>> {
        match value {
            Value::Type(TypeKind::Exception(kind)) => Ok(Value::Exception(Rc::new(ExceptionValue {
                kind,
                args: Vec::new(),
            }))),
            exc @ Value::Exception(_) => Ok(exc),
            _ => type_error("exceptions must derive from BaseException"),
        }
    }

    fn exec_try(
        &mut self,
        body: &'a [Stmt],
        handlers: &'a [ExceptHandler],
        orelse: &'a [Stmt],
        finalbody: &'a [Stmt],
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, Flow<'a>> {
        let mut outcome = self.exec_block(body, env);
        match outcome {
            Err(Signal::Raise(exc)) => outcome = self.handle_exception(handlers, exc, env),
            Ok(Flow::Normal) => outcome = self.exec_block(orelse, env),
            _ => {}
        }
        if finalbody.is_empty() || matches!(outcome, Err(Signal::Abort(_))) {
            return outcome;
        }
        match self.exec_block(finalbody, env)? {
            Flow::Normal => outcome,
            flow => Ok(flow),
        }
    }

    fn handle_exception(
        &mut self,
        handlers: &'a [ExceptHandler],
        exc: Value<'a>,
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, Flow<'a>> {
        for handler in handlers {
            let caught = match &handler.kind {
                None => true,
                Some(kind) => {
                    let class = self.eval(kind, env)?;
                    exception_matches(&exc, &class)?
                }
            };
            if caught {
                if let Some(name) = &handler.name {
                    self.store(env, name, exc.clone());
                }
                self.handling.push(exc);
                let result = self.exec_block(&handler.body, env);
                self.handling.pop();
                return result;
            }
        }
        Err(Signal::Raise(exc))
    }

    fn assign(&mut self, target: &'a Expr, value: Value<'a>, env: &Rc<Env<'a>>) -> EvalResult<'a, ()> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.store(env, name, value);
                Ok(())
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => self.unpack(elts, value, env),
            ExprKind::Subscript { value: object, index } => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                self.set_item(&object, index, value)
            }
            ExprKind::Attribute { value: object, attr } => {
                let object = self.eval(object, env)?;
                raise(
                    "AttributeError",
                    format!(
                        "'{}' object attribute '{}' is read-only",
                        object.type_name(),
                        attr
                    ),
                )
            }
            _ => Err(unsupported("assignment target")),
        }
    }

    fn unpack(&mut self, targets: &'a [Expr], value: Value<'a>, env: &Rc<Env<'a>>) -> EvalResult<'a, ()> {
        let mut items = match &value {
            Value::List(_)
            | Value::Tuple(_)
            | Value::Str(_)
            | Value::Bytes(_)
            | Value::ByteArray(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::FrozenSet(_)
            | Value::Range(_)
            | Value::Iterator(_) => self.collect(&value)?,
            other => {
                return type_error(format!(
                    "cannot unpack non-iterable {} object",
                    other.type_name()
                ))
            }
        };
        let star = targets
            .iter()
            .position(|t| matches!(t.kind, ExprKind::Starred(_)));
        match star {
            None => {
                if items.len() > targets.len() {
                    return value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    ));
                }
                if items.len() < targets.len() {
                    return value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    ));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item, env)?;
                }
            }
            Some(star) => {
                let fixed = targets.len() - 1;
                if items.len() < fixed {
                    return value_error(format!(
                        "not enough values to unpack (expected at least {}, got {})",
                        fixed,
                        items.len()
                    ));
                }
                let after = targets.len() - star - 1;
                let tail = items.split_off(items.len() - after);
                let middle = items.split_off(star);
                for (target, item) in targets[..star].iter().zip(items) {
                    self.assign(target, item, env)?;
                }
                if let ExprKind::Starred(inner) = &targets[star].kind {
                    self.assign(inner, Value::list(middle), env)?;
                }
                for (target, item) in targets[star + 1..].iter().zip(tail) {
                    self.assign(target, item, env)?;
                }
            }
        }
        Ok(())
    }

    fn aug_assign(
        &mut self,
        target: &'a Expr,
        op: BinOp,
        value: &'a Expr,
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, ()> {
        match &target.kind {
            ExprKind::Name(name) => {
                let current = self.load(env, name)?;
                let rhs = self.eval(value, env)?;
                let result = self.inplace(op, current, rhs)?;
                self.store(env, name, result);
                Ok(())
            }
            ExprKind::Subscript { value: object, index } => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                let current = self.get_item(&object, &index)?;
                let rhs = self.eval(value, env)?;
                let result = self.inplace(op, current, rhs)?;
                self.set_item(&object, index, result)
            }
            ExprKind::Attribute { .. } => self.assign(target, Value::None, env),
            _ => Err(unsupported("augmented assignment target")),
        }
    }

    fn inplace(&mut self, op: BinOp, current: Value<'a>, rhs: Value<'a>) -> EvalResult<'a, Value<'a>> {
        match (&current, op) {
            (Value::List(items), BinOp::Add) => {
                let extra = self.collect(&rhs)?;
                let len = items.borrow().len() + extra.len();
                self.budget.check_len(len)?;
                items.borrow_mut().extend(extra);
                Ok(current)
            }
            (Value::Set(table), BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor) => {
                let Some(other) = rhs.set_table() else {
                    return ops::binary(&self.budget, op, &current, &rhs);
                };
                let combined = ops::set_combine(op, &table.borrow(), &other.borrow());
                match combined {
                    Ok(combined) => {
                        *table.borrow_mut() = combined;
                        Ok(current)
                    }
                    Err(type_name) => unhashable(type_name),
                }
            }
            (Value::Dict(table), BinOp::BitOr) => {
                let Value::Dict(other) = &rhs else {
                    return ops::binary(&self.budget, op, &current, &rhs);
                };
                let pairs: Vec<(Value<'a>, Value<'a>)> = other
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (k, v) in pairs {
                    if let Err(type_name) = table.borrow_mut().insert(k, v) {
                        return unhashable(type_name);
                    }
                }
                Ok(current)
            }
            _ => ops::binary(&self.budget, op, &current, &rhs),
        }
    }

    pub fn get_item(&mut self, object: &Value<'a>, index: &Value<'a>) -> EvalResult<'a, Value<'a>> {
        if let Value::Dict(table) = object {
            let found = table.borrow().get(index).map(|v| v.cloned());
            return match found {
                Ok(Some(value)) => Ok(value),
                Ok(None) => key_error(index.clone()),
                Err(type_name) => unhashable(type_name),
            };
        }
        if let Value::Slice(slice) = index {
            return self.get_slice(object, slice);
        }
        let type_name = match object {
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::ByteArray(_) => "bytearray",
            Value::Range(_) => "range object",
            other => {
                return type_error(format!(
                    "'{}' object is not subscriptable",
                    other.type_name()
                ))
            }
        };
        let Some(position) = index.as_int() else {
            return type_error(format!(
                "{} indices must be integers or slices, not {}",
                object.type_name(),
                index.type_name()
            ));
        };
        let out_of_range = || raise("IndexError", format!("{} index out of range", type_name));
        match object {
            Value::List(items) => {
                let items = items.borrow();
                match ops::normalize_index(&position, items.len()) {
                    Some(i) => Ok(items[i].clone()),
                    None => out_of_range(),
                }
            }
            Value::Tuple(items) => match ops::normalize_index(&position, items.len()) {
                Some(i) => Ok(items[i].clone()),
                None => out_of_range(),
            },
            Value::Str(s) => {
                let len = s.chars().count();
                match ops::normalize_index(&position, len) {
                    Some(i) => Ok(Value::str(
                        s.chars().nth(i).map(String::from).unwrap_or_default(),
                    )),
                    None => out_of_range(),
                }
            }
            Value::Bytes(b) => match ops::normalize_index(&position, b.len()) {
                Some(i) => Ok(Value::int(b[i])),
                None => out_of_range(),
            },
            Value::ByteArray(b) => {
                let b = b.borrow();
                match ops::normalize_index(&position, b.len()) {
                    Some(i) => Ok(Value::int(b[i])),
                    None => out_of_range(),
                }
            }
            Value::Range(r) => {
                let len = r.len();
                let adjusted = if position < BigInt::from(0) {
                    position + &len
                } else {
                    position
                };
                if adjusted < BigInt::from(0) || adjusted >= len {
                    return out_of_range();
                }
                Ok(Value::Int(r.get(&adjusted)))
            }
            _ => out_of_range(),
        }
    }

    fn get_slice(&mut self, object: &Value<'a>, slice: &SliceValue<'a>) -> EvalResult<'a, Value<'a>> {
        let pick = |len: usize| ops::slice_indices(&slice.lower, &slice.upper, &slice.step, len);
        match object {
            Value::List(items) => {
                let items = items.borrow();
                Ok(Value::list(pick(items.len())?.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::Tuple(items) => Ok(Value::tuple(
                pick(items.len())?.into_iter().map(|i| items[i].clone()).collect(),
            )),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::str(
                    pick(chars.len())?.into_iter().map(|i| chars[i]).collect::<String>(),
                ))
            }
            Value::Bytes(b) => Ok(Value::Bytes(
                pick(b.len())?.into_iter().map(|i| b[i]).collect::<Vec<u8>>().into(),
            )),
            Value::ByteArray(b) => {
                let b = b.borrow();
                Ok(Value::bytearray(pick(b.len())?.into_iter().map(|i| b[i]).collect()))
            }
            Value::Range(r) => {
                let Some(len) = r.len().to_usize() else {
                    return raise("OverflowError", "Python int too large to convert to C ssize_t");
                };
                let (start, stop, step) = ops::slice_bounds(&slice.lower, &slice.upper, &slice.step, len)?;
                let count = ops::slice_len(start, stop, step);
                let new_start = &r.start + &r.step * BigInt::from(start);
                let new_step = &r.step * BigInt::from(step);
                let new_stop = &new_start + &new_step * BigInt::from(count);
                Ok(Value::Range(Rc::new(crate::sandbox::value::RangeValue {
                    start: new_start,
                    stop: new_stop,
                    step: new_step,
                })))
            }
            other => type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )),
        }
    }

    fn set_item(&mut self, object: &Value<'a>, index: Value<'a>, value: Value<'a>) -> EvalResult<'a, ()> {
        match object {
            Value::Dict(table) => {
                if let Err(type_name) = table.borrow_mut().insert(index, value) {
                    return unhashable(type_name);
                }
                let len = table.borrow().len();
                self.budget.check_len(len)?;
                Ok(())
            }
            Value::List(items) => {
                if let Value::Slice(slice) = &index {
                    return self.set_slice(items, slice, value);
                }
                let Some(position) = index.as_int() else {
                    return type_error(format!(
                        "list indices must be integers or slices, not {}",
                        index.type_name()
                    ));
                };
                let mut items = items.borrow_mut();
                match ops::normalize_index(&position, items.len()) {
                    Some(i) => {
                        items[i] = value;
                        Ok(())
                    }
                    None => raise("IndexError", "list assignment index out of range"),
                }
            }
            other => type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            )),
        }
    }

    fn set_slice(
        &mut self,
        items: &Rc<RefCell<Vec<Value<'a>>>>,
        slice: &SliceValue<'a>,
        value: Value<'a>,
    ) -> EvalResult<'a, ()> {
        let replacement = self.collect(&value)?;
        let len = items.borrow().len();
        let (start, stop, step) = ops::slice_bounds(&slice.lower, &slice.upper, &slice.step, len)?;
        if step == 1 {
            let start = start as usize;
            let stop = (stop as usize).max(start);
            self.budget.check_len(len - (stop - start) + replacement.len())?;
            items.borrow_mut().splice(start..stop, replacement);
            return Ok(());
        }
        let indices = ops::slice_indices(&slice.lower, &slice.upper, &slice.step, len)?;
        if indices.len() != replacement.len() {
            return value_error(format!(
                "attempt to assign sequence of size {} to extended slice of size {}",
                replacement.len(),
                indices.len()
            ));
        }
        let mut items = items.borrow_mut();
        for (i, item) in indices.into_iter().zip(replacement) {
            items[i] = item;
        }
        Ok(())
    }

    fn get_attribute(&mut self, object: Value<'a>, attr: &str) -> EvalResult<'a, Value<'a>> {
        match (&object, attr) {
            (Value::Int(_) | Value::Bool(_), "real" | "numerator") => {
                return Ok(Value::Int(object.as_int().unwrap_or_default()))
            }
            (Value::Int(_) | Value::Bool(_), "imag") => return Ok(Value::int(0)),
            (Value::Int(_) | Value::Bool(_), "denominator") => return Ok(Value::int(1)),
            (Value::Float(f), "real") => return Ok(Value::Float(*f)),
            (Value::Float(_), "imag") => return Ok(Value::Float(0.0)),
            (Value::Exception(exc), "args") => return Ok(Value::tuple(exc.args.clone())),
            (Value::Range(r), "start") => return Ok(Value::Int(r.start.clone())),
            (Value::Range(r), "stop") => return Ok(Value::Int(r.stop.clone())),
            (Value::Range(r), "step") => return Ok(Value::Int(r.step.clone())),
            (Value::Slice(s), "start") => return Ok(s.lower.clone()),
            (Value::Slice(s), "stop") => return Ok(s.upper.clone()),
            (Value::Slice(s), "step") => return Ok(s.step.clone()),
            (Value::Function(f), "__name__") => return Ok(Value::str(f.name.as_str())),
            (Value::Type(kind), "__name__") => return Ok(Value::str(kind.name())),
            _ => {}
        }
        if builtins::has_method(&object, attr) {
            return Ok(Value::Method(Rc::new(BoundMethod {
                receiver: object,
                name: attr.to_string(),
            })));
        }
        raise(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", object.type_name(), attr),
        )
    }

    pub fn eval(&mut self, expr: &'a Expr, env: &Rc<Env<'a>>) -> EvalResult<'a, Value<'a>> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Name(name) => self.load(env, name),
            ExprKind::Constant(constant) => constant_value(constant),
            ExprKind::FString(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => out.push_str(text),
                        FStringPart::Formatted {
                            value,
                            conversion,
                            spec,
                        } => {
                            let value = self.eval(value, env)?;
                            let value = match conversion {
                                Some('r') | Some('a') => Value::str(value.repr()),
                                Some('s') => Value::str(value.to_str()),
                                _ => value,
                            };
                            out.push_str(&format_value(&self.budget, &value, spec.as_deref().unwrap_or(""))?);
                        }
                    }
                    self.budget.check_len(out.len())?;
                }
                Ok(Value::str(out))
            }
            ExprKind::List(elts) => Ok(Value::list(self.eval_elements(elts, env)?)),
            ExprKind::Tuple(elts) => Ok(Value::tuple(self.eval_elements(elts, env)?)),
            ExprKind::Set(elts) => {
                let items = self.eval_elements(elts, env)?;
                builtins::set_from(items)
            }
            ExprKind::Dict(items) => {
                let mut table = Table::new();
                for item in items {
                    let pairs = match item {
                        DictItem::Pair(key, value) => {
                            vec![(self.eval(key, env)?, self.eval(value, env)?)]
                        }
                        DictItem::Splat(mapping) => match self.eval(mapping, env)? {
                            Value::Dict(source) => source
                                .borrow()
                                .iter()
                                .map(|(k, v)| (k.clone(), v.clone()))
                                .collect(),
                            other => {
                                return type_error(format!(
                                    "'{}' object is not a mapping",
                                    other.type_name()
                                ))
                            }
                        },
                    };
                    for (key, value) in pairs {
                        if let Err(type_name) = table.insert(key, value) {
                            return unhashable(type_name);
                        }
                    }
                }
                self.budget.check_len(table.len())?;
                Ok(Value::dict(table))
            }
            ExprKind::Attribute { value, attr } => {
                let object = self.eval(value, env)?;
                self.get_attribute(object, attr)
            }
            ExprKind::Subscript { value, index } => {
                let object = self.eval(value, env)?;
                let index = self.eval(index, env)?;
                self.get_item(&object, &index)
            }
            ExprKind::Slice { lower, upper, step } => {
                let mut part = |e: &'a Option<Box<Expr>>| -> EvalResult<'a, Value<'a>> {
                    match e {
                        Some(e) => self.eval(e, env),
                        None => Ok(Value::None),
                    }
                };
                let lower = part(lower)?;
                let upper = part(upper)?;
                let step = part(step)?;
                Ok(Value::Slice(Rc::new(SliceValue { lower, upper, step })))
            }
            ExprKind::Call { func, args } => {
                let callee = self.eval(func, env)?;
                let (positional, keywords) = self.eval_arguments(args, env)?;
                self.call(&callee, positional, keywords)
            }
            ExprKind::BinOp { left, op, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                ops::binary(&self.budget, *op, &left, &right)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.eval(operand, env)?;
                ops::unary(*op, &operand)
            }
            ExprKind::BoolOp { op, left, right } => {
                let left = self.eval(left, env)?;
                match (op, left.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right, env),
                }
            }
            ExprKind::Compare { left, comparisons } => {
                let mut left = self.eval(left, env)?;
                for (op, right) in comparisons {
                    let right = self.eval(right, env)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::IfExp { test, body, orelse } => {
                if self.eval(test, env)?.truthy() {
                    self.eval(body, env)
                } else {
                    self.eval(orelse, env)
                }
            }
            ExprKind::Lambda { params, body } => {
                self.make_closure("<lambda>".to_string(), params, FunctionBody::Expr(&**body), env)
            }
            ExprKind::Comprehension {
                kind,
                element,
                value,
                clauses,
            } => self.eval_comprehension(*kind, element, value.as_deref(), clauses, env),
            ExprKind::NamedExpr { target, value } => {
                let value = self.eval(value, env)?;
                self.store(env, target, value.clone());
                Ok(value)
            }
            ExprKind::Starred(_) => Err(unsupported("starred expression")),
            ExprKind::Opaque(opaque) => Err(unsupported(&opaque.source)),
        }
    }

    fn eval_elements(&mut self, elts: &'a [Expr], env: &Rc<Env<'a>>) -> EvalResult<'a, Vec<Value<'a>>> {
        let mut out = Vec::with_capacity(elts.len());
        for elt in elts {
            match &elt.kind {
                ExprKind::Starred(inner) => {
                    let iterable = self.eval(inner, env)?;
                    out.extend(self.collect(&iterable)?);
                }
                _ => out.push(self.eval(elt, env)?),
            }
        }
        self.budget.check_len(out.len())?;
        Ok(out)
    }

    #[allow(clippy::type_complexity)]
    fn eval_arguments(
        &mut self,
        args: &'a [Argument],
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, (Vec<Value<'a>>, Vec<(String, Value<'a>)>)> {
        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Value<'a>)> = Vec::new();
        for arg in args {
            match arg {
                Argument::Positional(expr) => positional.push(self.eval(expr, env)?),
                Argument::Starred(expr) => {
                    let iterable = self.eval(expr, env)?;
                    positional.extend(self.collect(&iterable)?);
                }
                Argument::Keyword { name, value } => {
                    let value = self.eval(value, env)?;
                    push_keyword(&mut keywords, name.clone(), value)?;
                }
                Argument::DoubleStarred(expr) => match self.eval(expr, env)? {
                    Value::Dict(table) => {
                        let pairs: Vec<(Value<'a>, Value<'a>)> = table
                            .borrow()
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect();
                        for (key, value) in pairs {
                            match key {
                                Value::Str(name) => push_keyword(&mut keywords, name.to_string(), value)?,
                                _ => return type_error("keywords must be strings"),
                            }
                        }
                    }
                    other => {
                        return type_error(format!(
                            "argument after ** must be a mapping, not {}",
                            other.type_name()
                        ))
                    }
                },
            }
        }
        Ok((positional, keywords))
    }

    fn eval_comprehension(
        &mut self,
        kind: ComprehensionKind,
        element: &'a Expr,
        value: Option<&'a Expr>,
        clauses: &'a [ComprehensionClause],
        env: &Rc<Env<'a>>,
    ) -> EvalResult<'a, Value<'a>> {
        let scope = Rc::clone(
            self.scopes
                .entry((clauses.as_ptr() as usize, 0))
                .or_insert_with(|| Rc::new(ScopeInfo::comprehension(clauses))),
        );
        let frame = Rc::new(Env::new(EnvKind::Comprehension, scope, Some(Rc::clone(env))));
        let mut gather = match kind {
            ComprehensionKind::Dict => Gather::Pairs(Table::new()),
            _ => Gather::Items(Vec::new()),
        };
        self.comprehension_level(clauses, element, value, &frame, Some(env), &mut gather)?;
        match (kind, gather) {
            (ComprehensionKind::List, Gather::Items(items)) => Ok(Value::list(items)),
            (ComprehensionKind::Set, Gather::Items(items)) => builtins::set_from(items),
            (ComprehensionKind::Generator, Gather::Items(items)) => {
                Ok(Value::iterator(IterState::items(items)))
            }
            (_, Gather::Pairs(table)) => Ok(Value::dict(table)),
            (_, Gather::Items(items)) => Ok(Value::list(items)),
        }
    }

    /// Run one clause of a comprehension and recurse into the rest. `outer`
    /// is set only for the first clause, whose iterable is evaluated in the
    /// enclosing scope.
    fn comprehension_level(
        &mut self,
        clauses: &'a [ComprehensionClause],
        element: &'a Expr,
        value: Option<&'a Expr>,
        frame: &Rc<Env<'a>>,
        outer: Option<&Rc<Env<'a>>>,
        gather: &mut Gather<'a>,
    ) -> EvalResult<'a, ()> {
        let Some((clause, rest)) = clauses.split_first() else {
            let key = self.eval(element, frame)?;
            match (gather, value) {
                (Gather::Pairs(table), Some(value)) => {
                    let value = self.eval(value, frame)?;
                    if let Err(type_name) = table.insert(key, value) {
                        return unhashable(type_name);
                    }
                    self.budget.check_len(table.len())?;
                }
                (Gather::Items(items), _) => {
                    items.push(key);
                    self.budget.check_len(items.len())?;
                }
                (Gather::Pairs(_), None) => return Err(unsupported("dict comprehension")),
            }
            return Ok(());
        };
        match clause {
            ComprehensionClause::For { target, iter } => {
                let iterable = self.eval(iter, outer.unwrap_or(frame))?;
                let mut handle = self.iter_handle(&iterable)?;
                while let Some(item) = handle.next_value() {
                    self.tick()?;
                    self.assign(target, item, frame)?;
                    self.comprehension_level(rest, element, value, frame, None, gather)?;
                }
            }
            ComprehensionClause::If(test) => {
                let scope = outer.unwrap_or(frame);
                if self.eval(test, scope)?.truthy() {
                    self.comprehension_level(rest, element, value, frame, None, gather)?;
                }
            }
        }
        Ok(())
    }
}

fn push_keyword<'a>(
    keywords: &mut Vec<(String, Value<'a>)>,
    name: String,
    value: Value<'a>,
) -> EvalResult<'a, ()> {
    if keywords.iter().any(|(k, _)| *k == name) {
        return type_error(format!("got multiple values for keyword argument '{}'", name));
    }
    keywords.push((name, value));
    Ok(())
}

fn exception_matches<'a>(exc: &Value<'a>, class: &Value<'a>) -> EvalResult<'a, bool> {
    match class {
        Value::Type(kind @ TypeKind::Exception(_)) => Ok(exc.type_of().is_subtype_of(*kind)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if exception_matches(exc, option)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => type_error("catching classes that do not inherit from BaseException is not allowed"),
    }
}

fn bind_arguments<'a>(
    closure: &Closure<'a>,
    frame: &Rc<Env<'a>>,
    args: Vec<Value<'a>>,
    kwargs: Vec<(String, Value<'a>)>,
) -> EvalResult<'a, ()> {
    let mut vars = frame.vars.borrow_mut();
    let mut positional = args.into_iter();
    let mut varargs = None;
    let mut varkw = None;
    let mut accepts_positional = 0;
    for param in closure.params {
        match param.kind {
            ParamKind::PositionalOnly | ParamKind::Positional => {
                accepts_positional += 1;
                if let Some(value) = positional.next() {
                    vars.insert(param.name.clone(), value);
                }
            }
            ParamKind::VarArgs => varargs = Some(param.name.as_str()),
            ParamKind::KwArgs => varkw = Some(param.name.as_str()),
            ParamKind::KeywordOnly => {}
        }
    }
    let extra: Vec<Value<'a>> = positional.collect();
    match varargs {
        Some(name) => {
            vars.insert(name.to_string(), Value::tuple(extra));
        }
        None if !extra.is_empty() => {
            return type_error(format!(
                "{}() takes {} positional argument{} but {} were given",
                closure.name,
                accepts_positional,
                if accepts_positional == 1 { "" } else { "s" },
                accepts_positional + extra.len()
            ));
        }
        None => {}
    }
    let mut extra_keywords = Table::new();
    for (key, value) in kwargs {
        let param = closure.params.iter().find(|p| {
            p.name == key && matches!(p.kind, ParamKind::Positional | ParamKind::KeywordOnly)
        });
        match (param, varkw) {
            (Some(_), _) if vars.contains_key(&key) => {
                return type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    closure.name, key
                ));
            }
            (Some(_), _) => {
                vars.insert(key, value);
            }
            (None, Some(_)) => {
                if let Err(type_name) = extra_keywords.insert(Value::str(key), value) {
                    return unhashable(type_name);
                }
            }
            (None, None) => {
                return type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    closure.name, key
                ));
            }
        }
    }
    if let Some(name) = varkw {
        vars.insert(name.to_string(), Value::dict(extra_keywords));
    }
    let mut missing = Vec::new();
    for (param, default) in closure.params.iter().zip(&closure.defaults) {
        if matches!(param.kind, ParamKind::VarArgs | ParamKind::KwArgs) || vars.contains_key(&param.name) {
            continue;
        }
        match default {
            Some(value) => {
                vars.insert(param.name.clone(), value.clone());
            }
            None => missing.push(format!("'{}'", param.name)),
        }
    }
    if !missing.is_empty() {
        return type_error(format!(
            "{}() missing {} required argument{}: {}",
            closure.name,
            missing.len(),
            if missing.len() == 1 { "" } else { "s" },
            missing.join(", ")
        ));
    }
    Ok(())
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        // Closures and the frames they capture form reference cycles.
        for env in self.closure_envs.drain(..) {
            if let Some(env) = env.upgrade() {
                env.vars.borrow_mut().clear();
            }
        }
        self.globals.vars.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::parser::parse_module;
    use indoc::indoc;
    use std::path::Path;

    /// Define every top-level function of `source`, then call `entry` with
    /// integer arguments and render the outcome.
    fn run(source: &str, entry: &str, args: &[i64]) -> String {
        run_with(source, entry, args, SandboxLimits::default())
    }

    fn run_with(source: &str, entry: &str, args: &[i64], limits: SandboxLimits) -> String {
        let module = parse_module(source, Path::new("probe.py")).unwrap();
        let mut interp = Interpreter::new(limits);
        let mut target = None;
        for stmt in &module.body {
            if let StmtKind::FunctionDef(def) = &stmt.kind {
                let function = interp.define_function(def).unwrap();
                if def.name == entry {
                    target = Some(function);
                }
            }
        }
        let target = target.unwrap();
        let args = args.iter().map(|&n| Value::int(n)).collect();
        match interp.call(&target, args, Vec::new()) {
            Ok(value) => value.repr(),
            Err(Signal::Raise(exc)) => format!("raise {}", exception_fault(&exc)),
            Err(Signal::Abort(fault)) => format!("abort {}", fault),
        }
    }

    #[test]
    fn test_arithmetic_and_control_flow() {
        let source = indoc! {"
            def collatz(n):
                steps = 0
                while n != 1:
                    if n % 2 == 0:
                        n //= 2
                    else:
                        n = 3 * n + 1
                    steps += 1
                return steps
        "};
        assert_eq!(run(source, "collatz", &[27]), "111");
    }

    #[test]
    fn test_big_integers_do_not_overflow() {
        let source = indoc! {"
            def fact(n):
                out = 1
                for i in range(2, n + 1):
                    out *= i
                return out
        "};
        assert_eq!(
            run(source, "fact", &[25]),
            "15511210043330985984000000"
        );
    }

    #[test]
    fn test_recursion_and_depth_limit() {
        let source = indoc! {"
            def fib(n):
                return n if n < 2 else fib(n - 1) + fib(n - 2)

            def forever(n):
                return forever(n + 1)
        "};
        assert_eq!(run(source, "fib", &[15]), "610");
        assert_eq!(
            run(source, "forever", &[0]),
            "abort maximum call depth of 64 exceeded"
        );
    }

    #[test]
    fn test_step_limit_stops_infinite_loop() {
        let source = "def spin(n):\n    while True:\n        n += 1\n";
        let limits = SandboxLimits {
            max_steps: 10_000,
            ..SandboxLimits::default()
        };
        assert_eq!(
            run_with(source, "spin", &[0], limits),
            "abort probe exceeded 10000 evaluation steps"
        );
    }

    #[test]
    fn test_unbound_local_is_reported() {
        let source = indoc! {"
            x = 1
            def f(n):
                if n:
                    x = 2
                return x
        "};
        assert_eq!(
            run(source, "f", &[0]),
            "raise UnboundLocalError: cannot access local variable 'x' where it is not associated with a value"
        );
        assert_eq!(run(source, "f", &[1]), "2");
    }

    #[test]
    fn test_closures_bind_late_and_nonlocal_writes_through() {
        let source = indoc! {"
            def counter(n):
                total = 0
                def bump(k):
                    nonlocal total
                    total += k
                for i in range(n):
                    bump(i)
                fs = [lambda: i for i in range(3)]
                return total, [f() for f in fs]
        "};
        assert_eq!(run(source, "counter", &[5]), "(10, [2, 2, 2])");
    }

    #[test]
    fn test_comprehension_scoping() {
        let source = indoc! {"
            def f(n):
                xs = [y for y in range(n) if y % 2]
                total = sum(z * z for z in xs)
                squares = [(found := v) * v for v in xs]
                return xs, total, found, {k: k * k for k in xs}
        "};
        assert_eq!(
            run(source, "f", &[6]),
            "([1, 3, 5], 35, 5, {1: 1, 3: 9, 5: 25})"
        );
    }

    #[test]
    fn test_try_except_finally() {
        let source = indoc! {"
            def f(n):
                log = []
                try:
                    try:
                        log.append(10 // n)
                    except ZeroDivisionError as exc:
                        log.append(str(exc))
                        raise ValueError('bad')
                    finally:
                        log.append('inner')
                except (TypeError, ValueError) as exc:
                    log.append(exc.args[0])
                else:
                    log.append('ok')
                return log
        "};
        assert_eq!(
            run(source, "f", &[0]),
            "['integer division or modulo by zero', 'inner', 'bad']"
        );
        assert_eq!(run(source, "f", &[5]), "[2, 'inner', 'ok']");
    }

    #[test]
    fn test_escaping_exception_becomes_fault() {
        let source = "def f(n):\n    return {'a': 1}['b']\n";
        assert_eq!(run(source, "f", &[0]), "raise KeyError: 'b'");
        let source = "def g(n):\n    assert n > 0, 'positive'\n    return n\n";
        assert_eq!(run(source, "g", &[0]), "raise AssertionError: positive");
    }

    #[test]
    fn test_unpacking_and_slicing() {
        let source = indoc! {"
            def f(n):
                first, *middle, last = range(n)
                s = 'abcdefgh'
                data = list(range(10))
                data[2:5] = ['x']
                return first, middle, last, s[::-2], s[1:-1:3], data, range(n)[1:]
        "};
        assert_eq!(
            run(source, "f", &[5]),
            "(0, [1, 2, 3], 4, 'hfdb', 'be', [0, 1, 'x', 5, 6, 7, 8, 9], range(1, 5))"
        );
        let source = "def g(n):\n    a, b = [n]\n    return a\n";
        assert_eq!(
            run(source, "g", &[1]),
            "raise ValueError: not enough values to unpack (expected 2, got 1)"
        );
    }

    #[test]
    fn test_argument_binding() {
        let source = indoc! {"
            def inner(a, b=2, *rest, c, **extra):
                return a, b, rest, c, extra

            def f(n):
                return inner(n, c=3), inner(1, 2, 3, 4, c=5, d=6)

            def g(n):
                return inner(n)
        "};
        assert_eq!(
            run(source, "f", &[1]),
            "((1, 2, (), 3, {}), (1, 2, (3, 4), 5, {'d': 6}))"
        );
        assert_eq!(
            run(source, "g", &[1]),
            "raise TypeError: inner() missing 1 required argument: 'c'"
        );
    }

    #[test]
    fn test_decorators_apply_bottom_up() {
        let source = indoc! {"
            def f(n):
                def twice(fn):
                    return lambda x: fn(fn(x))
                def inc(fn):
                    return lambda x: fn(x) + 1
                @twice
                @inc
                def base(x):
                    return x * 10
                return base(n)
        "};
        assert_eq!(run(source, "f", &[1]), "111");
    }

    #[test]
    fn test_fstrings_and_methods() {
        let source = indoc! {"
            def f(n):
                words = 'a,b,,c'.split(',')
                return f'{n:>4}|{n!r}|{len(words)}', '-'.join(w.upper() for w in words if w)
        "};
        assert_eq!(run(source, "f", &[7]), "('   7|7|4', 'A-B-C')");
    }

    #[test]
    fn test_withheld_builtin_aborts() {
        let source = "def f(n):\n    try:\n        open('x')\n    except Exception:\n        return 0\n";
        assert!(run(source, "f", &[0]).starts_with("abort unsupported construct"));
    }

    #[test]
    fn test_global_statement_writes_module_scope() {
        let source = indoc! {"
            def f(n):
                global seen
                seen = n
                return read()

            def read():
                return seen
        "};
        assert_eq!(run(source, "f", &[42]), "42");
    }
}
