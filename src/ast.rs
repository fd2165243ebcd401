//! Typed AST.
//!
//! Expressions resolve their type when they are constructed and construction
//! fails with a type error when the operands do not fit the operation, so an
//! `Expr` that exists is well typed. Statements are untyped.
//!
//! Emission walks the tree and hands each piece to an [`Emitter`]; the tree
//! never formats output itself.

use std::fmt;
use std::rc::Rc;

use crate::codegen::Emitter;
use crate::env::Id;
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Tag, Token};
use crate::ty::Type;

/// A 1-based line/column pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// `+ - * /` over numeric operands.
    Arith { op: Token, left: Box<Expr>, right: Box<Expr> },
    /// `< <= > >= == !=`.
    Rel { op: Token, left: Box<Expr>, right: Box<Expr> },
    /// `&& ||` over bool operands.
    Logical { op: Token, left: Box<Expr>, right: Box<Expr> },
    /// Unary minus.
    Unary { op: Token, operand: Box<Expr> },
    Not { op: Token, operand: Box<Expr> },
    Constant(Token),
    Temp(usize),
    Access { array: Box<Expr>, index: Box<Expr> },
    Id(Rc<Id>),
    /// An assignment used as a value; evaluates to the stored target.
    Assign { target: Box<Expr>, value: Box<Expr> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub loc: SourceLocation,
}

impl Expr {
    fn new(kind: ExprKind, ty: Type, loc: SourceLocation) -> Self {
        Self { kind, ty, loc }
    }

    pub fn arith(op: Token, left: Expr, right: Expr) -> CompileResult<Expr> {
        let ty = Type::max(&left.ty, &right.ty).ok_or_else(|| {
            CompileError::type_error(
                format!("arithmetic operands must be numeric, found `{}` and `{}`", left.ty, right.ty),
                op.loc,
            )
        })?;
        let loc = op.loc;
        Ok(Expr::new(ExprKind::Arith { op, left: Box::new(left), right: Box::new(right) }, ty, loc))
    }

    pub fn rel(op: Token, left: Expr, right: Expr) -> Expr {
        let loc = op.loc;
        Expr::new(ExprKind::Rel { op, left: Box::new(left), right: Box::new(right) }, Type::Bool, loc)
    }

    pub fn logical(op: Token, left: Expr, right: Expr) -> CompileResult<Expr> {
        if left.ty != Type::Bool || right.ty != Type::Bool {
            return Err(CompileError::type_error(
                format!("logical operands must be `bool`, found `{}` and `{}`", left.ty, right.ty),
                op.loc,
            ));
        }
        let loc = op.loc;
        Ok(Expr::new(ExprKind::Logical { op, left: Box::new(left), right: Box::new(right) }, Type::Bool, loc))
    }

    /// Unary minus; keeps the operand's type.
    pub fn unary(op: Token, operand: Expr) -> CompileResult<Expr> {
        if !operand.ty.is_numeric() {
            return Err(CompileError::type_error(
                format!("unary minus needs a numeric operand, found `{}`", operand.ty),
                op.loc,
            ));
        }
        let (ty, loc) = (operand.ty.clone(), op.loc);
        Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, ty, loc))
    }

    pub fn not(op: Token, operand: Expr) -> CompileResult<Expr> {
        if operand.ty != Type::Bool {
            return Err(CompileError::type_error(
                format!("`!` needs a `bool` operand, found `{}`", operand.ty),
                op.loc,
            ));
        }
        let loc = op.loc;
        Ok(Expr::new(ExprKind::Not { op, operand: Box::new(operand) }, Type::Bool, loc))
    }

    /// A literal. The type follows the token: integer, float, `true`/`false`.
    pub fn constant(value: Token) -> CompileResult<Expr> {
        let ty = match value.tag() {
            Tag::Num => Type::Int,
            Tag::Real => Type::Float,
            Tag::True | Tag::False => Type::Bool,
            _ => return Err(CompileError::syntax(format!("{} is not a literal", value), value.loc)),
        };
        let loc = value.loc;
        Ok(Expr::new(ExprKind::Constant(value), ty, loc))
    }

    pub fn temp(loc: SourceLocation, number: usize, ty: Type) -> Expr {
        Expr::new(ExprKind::Temp(number), ty, loc)
    }

    /// `array[index]`; the type is the array's element type.
    pub fn access(loc: SourceLocation, array: Expr, index: Expr) -> CompileResult<Expr> {
        let ty = match array.ty.element() {
            Some(of) => of.clone(),
            None => {
                return Err(CompileError::type_error(
                    format!("indexing a non-array of type `{}`", array.ty),
                    loc,
                ))
            }
        };
        if !index.ty.is_integral() {
            return Err(CompileError::type_error(
                format!("array index must be an integer, found `{}`", index.ty),
                index.loc,
            ));
        }
        Ok(Expr::new(ExprKind::Access { array: Box::new(array), index: Box::new(index) }, ty, loc))
    }

    pub fn id(loc: SourceLocation, id: Rc<Id>) -> Expr {
        let ty = id.ty.clone();
        Expr::new(ExprKind::Id(id), ty, loc)
    }

    pub fn assign(loc: SourceLocation, target: Expr, value: Expr) -> CompileResult<Expr> {
        check_store(loc, &target, &value)?;
        let ty = target.ty.clone();
        Ok(Expr::new(ExprKind::Assign { target: Box::new(target), value: Box::new(value) }, ty, loc))
    }

    /// Emits the expression and returns the handle of its value.
    ///
    /// Operands are always emitted left to right.
    pub fn emit(&self, out: &mut dyn Emitter) -> String {
        match &self.kind {
            ExprKind::Arith { op, left, right }
            | ExprKind::Rel { op, left, right }
            | ExprKind::Logical { op, left, right } => {
                let lhs = left.emit(out);
                let rhs = right.emit(out);
                out.emit_binary_op(&lhs, op, &rhs)
            }
            ExprKind::Unary { op, operand } | ExprKind::Not { op, operand } => {
                let value = operand.emit(out);
                out.emit_unary_op(op, &value)
            }
            ExprKind::Constant(value) => out.emit_load_const(value),
            ExprKind::Temp(number) => out.emit_temp(*number),
            ExprKind::Access { array, index } => {
                let arr = array.emit(out);
                let idx = index.emit(out);
                out.emit_array_access(&arr, &idx, &self.ty)
            }
            ExprKind::Id(id) => out.emit_identifier(id),
            ExprKind::Assign { target, value } => match &target.kind {
                ExprKind::Access { array, index } => {
                    let arr = array.emit(out);
                    let idx = index.emit(out);
                    let val = value.emit(out);
                    out.emit_array_assign(&arr, &idx, &val, &target.ty);
                    out.emit_array_access(&arr, &idx, &target.ty)
                }
                _ => {
                    let dst = target.emit(out);
                    let val = value.emit(out);
                    out.emit_assign(&dst, &val);
                    dst
                }
            },
        }
    }
}

// A store needs an lvalue of non-array type and a compatible value.
fn check_store(loc: SourceLocation, target: &Expr, value: &Expr) -> CompileResult<()> {
    if !matches!(target.kind, ExprKind::Id(_) | ExprKind::Access { .. }) {
        return Err(CompileError::syntax("left side of `=` is not assignable", loc));
    }
    if target.ty.is_array() {
        return Err(CompileError::type_error(format!("cannot assign to whole array of type `{}`", target.ty), loc));
    }
    if !target.ty.accepts(&value.ty) {
        return Err(CompileError::type_error(
            format!("cannot assign `{}` to `{}`", value.ty, target.ty),
            loc,
        ));
    }
    Ok(())
}

/// Conditions of `if`, `while` and `do` must be `bool`.
pub fn check_condition(cond: &Expr) -> CompileResult<()> {
    if cond.ty != Type::Bool {
        return Err(CompileError::type_error(
            format!("condition must be `bool`, found `{}`", cond.ty),
            cond.loc,
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// The empty statement.
    Null,
    /// Statements run in order. Never empty and never directly nested.
    Seq(Vec<Stmt>),
    If { cond: Expr, then: Box<Stmt> },
    Else { cond: Expr, then: Box<Stmt>, otherwise: Box<Stmt> },
    While { cond: Expr, body: Box<Stmt> },
    /// The body runs before the condition is first tested.
    Do { body: Box<Stmt>, cond: Expr },
    Break,
    Set { target: Expr, value: Expr },
    SetElem { array: Expr, index: Expr, value: Expr },
    /// An expression evaluated for its side effects.
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

impl Stmt {
    fn new(kind: StmtKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    pub fn null(loc: SourceLocation) -> Stmt {
        Stmt::new(StmtKind::Null, loc)
    }

    /// Sequences two statements; an empty side is dropped and sequences are
    /// spliced, so a run of statements stays one flat list.
    pub fn seq(first: Stmt, second: Stmt) -> Stmt {
        match (first.kind, second.kind) {
            (StmtKind::Null, kind) => Stmt::new(kind, second.loc),
            (kind, StmtKind::Null) => Stmt::new(kind, first.loc),
            (StmtKind::Seq(mut list), StmtKind::Seq(rest)) => {
                list.extend(rest);
                Stmt::new(StmtKind::Seq(list), first.loc)
            }
            (StmtKind::Seq(mut list), kind) => {
                list.push(Stmt::new(kind, second.loc));
                Stmt::new(StmtKind::Seq(list), first.loc)
            }
            (kind, StmtKind::Seq(rest)) => {
                let mut list = Vec::with_capacity(rest.len() + 1);
                list.push(Stmt::new(kind, first.loc));
                list.extend(rest);
                Stmt::new(StmtKind::Seq(list), first.loc)
            }
            (a, b) => Stmt::new(StmtKind::Seq(vec![Stmt::new(a, first.loc), Stmt::new(b, second.loc)]), first.loc),
        }
    }

    pub fn if_then(loc: SourceLocation, cond: Expr, then: Stmt) -> CompileResult<Stmt> {
        check_condition(&cond)?;
        Ok(Stmt::new(StmtKind::If { cond, then: Box::new(then) }, loc))
    }

    pub fn if_else(loc: SourceLocation, cond: Expr, then: Stmt, otherwise: Stmt) -> CompileResult<Stmt> {
        check_condition(&cond)?;
        Ok(Stmt::new(StmtKind::Else { cond, then: Box::new(then), otherwise: Box::new(otherwise) }, loc))
    }

    pub fn while_loop(loc: SourceLocation, cond: Expr, body: Stmt) -> CompileResult<Stmt> {
        check_condition(&cond)?;
        Ok(Stmt::new(StmtKind::While { cond, body: Box::new(body) }, loc))
    }

    pub fn do_while(loc: SourceLocation, body: Stmt, cond: Expr) -> CompileResult<Stmt> {
        check_condition(&cond)?;
        Ok(Stmt::new(StmtKind::Do { body: Box::new(body), cond }, loc))
    }

    pub fn brk(loc: SourceLocation) -> Stmt {
        Stmt::new(StmtKind::Break, loc)
    }

    /// `target = value;` for a variable target.
    pub fn set(loc: SourceLocation, target: Expr, value: Expr) -> CompileResult<Stmt> {
        if matches!(target.kind, ExprKind::Access { .. }) {
            return Err(CompileError::syntax("array element store must use an element assignment", loc));
        }
        check_store(loc, &target, &value)?;
        Ok(Stmt::new(StmtKind::Set { target, value }, loc))
    }

    /// `array[index] = value;`
    pub fn set_elem(loc: SourceLocation, array: Expr, index: Expr, value: Expr) -> CompileResult<Stmt> {
        let target = Expr::access(loc, array, index)?;
        check_store(loc, &target, &value)?;
        match target.kind {
            ExprKind::Access { array, index } => {
                Ok(Stmt::new(StmtKind::SetElem { array: *array, index: *index, value }, loc))
            }
            _ => Err(CompileError::syntax("left side of `=` is not assignable", loc)),
        }
    }

    pub fn expr(expr: Expr) -> Stmt {
        let loc = expr.loc;
        Stmt::new(StmtKind::Expr(expr), loc)
    }

    /// Emits the statement; the emitter decides the layout of each construct.
    pub fn emit(&self, out: &mut dyn Emitter) {
        match &self.kind {
            StmtKind::Null => {}
            StmtKind::Seq(list) => {
                for stmt in list {
                    stmt.emit(out);
                }
            }
            StmtKind::If { cond, then } => {
                let c = cond.emit(out);
                out.emit_if(&c, &mut |e: &mut dyn Emitter| then.emit(e));
            }
            StmtKind::Else { cond, then, otherwise } => {
                let c = cond.emit(out);
                out.emit_if_else(
                    &c,
                    &mut |e: &mut dyn Emitter| then.emit(e),
                    &mut |e: &mut dyn Emitter| otherwise.emit(e),
                );
            }
            StmtKind::While { cond, body } => {
                out.emit_while(&mut |e: &mut dyn Emitter| cond.emit(e), &mut |e: &mut dyn Emitter| body.emit(e));
            }
            StmtKind::Do { body, cond } => {
                out.emit_do_while(&mut |e: &mut dyn Emitter| body.emit(e), &mut |e: &mut dyn Emitter| cond.emit(e));
            }
            StmtKind::Break => out.emit_break(),
            StmtKind::Set { target, value } => {
                let dst = target.emit(out);
                let val = value.emit(out);
                out.emit_assign(&dst, &val);
            }
            StmtKind::SetElem { array, index, value } => {
                let arr = array.emit(out);
                let idx = index.emit(out);
                let val = value.emit(out);
                let elem = array.ty.element().unwrap_or(&value.ty);
                out.emit_array_assign(&arr, &idx, &val, elem);
            }
            StmtKind::Expr(expr) => {
                expr.emit(out);
            }
        }
    }
}

/// A parsed program: its statement tree and every declared symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Stmt,
    /// Declared symbols in declaration order.
    pub symbols: Vec<Rc<Id>>,
    /// Bytes needed to hold every variable live at the same time.
    pub frame_size: usize,
}

impl Program {
    pub fn emit(&self, out: &mut dyn Emitter) {
        self.body.emit(out);
    }
}
