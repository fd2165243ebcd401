use std::rc::Rc;

use log::debug;

use crate::ast::{check_condition, Expr, ExprKind, Program, Stmt};
use crate::env::{Env, Id};
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, Tag, Token, TokenKind, Word};
use crate::ty::Type;

/// Public entry point: parse a whole program from source text.
///
/// Stops at the first error.
pub fn parse_program(src: &str) -> CompileResult<Program> {
    Parser::new(src).program()
}

/// Single-pass recursive-descent parser. Type checks run while the tree is
/// built, so the lookahead token is the only state besides the scope stack.
struct Parser<'src> {
    lexer: Lexer<'src>,
    look: Token,
    env: Env,
    /// Next free byte offset.
    used: usize,
    frame_size: usize,
    /// Number of loops enclosing the current statement.
    loops: usize,
    symbols: Vec<Rc<Id>>,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str) -> Self {
        let mut lexer = Lexer::new(src);
        let look = lexer.scan();
        Self { lexer, look, env: Env::new(), used: 0, frame_size: 0, loops: 0, symbols: Vec::new() }
    }

    fn peek(&self) -> Tag {
        self.look.tag()
    }

    fn bump(&mut self) -> Token {
        let next = self.lexer.scan();
        std::mem::replace(&mut self.look, next)
    }

    fn expect(&mut self, tag: Tag) -> CompileResult<Token> {
        if self.peek() == tag {
            Ok(self.bump())
        } else {
            Err(CompileError::syntax(format!("expected {} but found {}", tag, self.look), self.look.loc))
        }
    }

    fn program(mut self) -> CompileResult<Program> {
        let body = self.block()?;
        if self.peek() != Tag::End {
            return Err(CompileError::syntax(
                format!("unexpected {} after the end of the program", self.look),
                self.look.loc,
            ));
        }
        Ok(Program { body, symbols: self.symbols, frame_size: self.frame_size })
    }

    fn block(&mut self) -> CompileResult<Stmt> {
        self.expect(Tag::Char('{'))?;
        self.env.push(self.used);
        debug!("enter scope {} at offset {}", self.env.depth(), self.used);
        let decls = self.decls()?;
        let stmts = self.stmts()?;
        self.expect(Tag::Char('}'))?;
        if let Some(base) = self.env.pop() {
            self.used = base;
        }
        debug!("leave scope, offset back to {}", self.used);
        Ok(Stmt::seq(decls, stmts))
    }

    fn decls(&mut self) -> CompileResult<Stmt> {
        let mut inits = Stmt::null(self.look.loc);
        while self.peek() == Tag::Basic {
            let ty = self.type_()?;
            let name = self.expect(Tag::Id)?;
            let id = Rc::new(Id::new(&*name.lexeme, ty, self.used));
            debug!("declare `{}`: {} at offset {}", id.name, id.ty, id.offset);
            self.used = id
                .ty
                .checked_width()
                .and_then(|width| self.used.checked_add(width))
                .ok_or_else(|| CompileError::type_error(format!("`{}` does not fit in memory", id.name), name.loc))?;
            self.frame_size = self.frame_size.max(self.used);
            self.env.put(&id.name, Rc::clone(&id));
            self.symbols.push(Rc::clone(&id));

            if self.peek() == Tag::Char('=') {
                let eq = self.bump();
                let value = self.assign()?;
                let init = Stmt::set(eq.loc, Expr::id(name.loc, id), value)?;
                inits = Stmt::seq(inits, init);
            }
            self.expect(Tag::Char(';'))?;
        }
        Ok(inits)
    }

    fn type_(&mut self) -> CompileResult<Type> {
        let tok = self.expect(Tag::Basic)?;
        let base = tok
            .as_word()
            .and_then(|w| w.basic.clone())
            .ok_or_else(|| CompileError::syntax(format!("{} is not a type", tok), tok.loc))?;
        self.dims(base)
    }

    // `int[2][3]` is an array of 2 arrays of 3 ints.
    fn dims(&mut self, base: Type) -> CompileResult<Type> {
        let mut sizes: Vec<(usize, Token)> = Vec::new();
        while self.peek() == Tag::Char('[') {
            self.bump();
            let tok = self.expect(Tag::Num)?;
            let size = match tok.kind {
                TokenKind::Num(n) => usize::try_from(n)
                    .map_err(|_| CompileError::syntax(format!("invalid array size {}", tok), tok.loc))?,
                _ => return Err(CompileError::syntax(format!("invalid array size {}", tok), tok.loc)),
            };
            sizes.push((size, tok));
            self.expect(Tag::Char(']'))?;
        }
        let mut ty = base;
        for (size, tok) in sizes.into_iter().rev() {
            ty = Type::array(ty, size);
            if ty.checked_width().is_none() {
                return Err(CompileError::type_error(format!("array type `{}` is too large", ty), tok.loc));
            }
        }
        Ok(ty)
    }

    fn stmts(&mut self) -> CompileResult<Stmt> {
        let mut seq = Stmt::null(self.look.loc);
        while !matches!(self.peek(), Tag::Char('}') | Tag::End) {
            let stmt = self.stmt()?;
            seq = Stmt::seq(seq, stmt);
        }
        Ok(seq)
    }

    fn stmt(&mut self) -> CompileResult<Stmt> {
        match self.peek() {
            Tag::Char(';') => {
                let semi = self.bump();
                Ok(Stmt::null(semi.loc))
            }
            Tag::Char('{') => self.block(),
            Tag::If => {
                let kw = self.bump();
                let cond = self.condition()?;
                let then = self.stmt()?;
                if self.peek() == Tag::Else {
                    self.bump();
                    let otherwise = self.stmt()?;
                    Stmt::if_else(kw.loc, cond, then, otherwise)
                } else {
                    Stmt::if_then(kw.loc, cond, then)
                }
            }
            Tag::While => {
                let kw = self.bump();
                let cond = self.condition()?;
                let body = self.loop_body()?;
                Stmt::while_loop(kw.loc, cond, body)
            }
            Tag::Do => {
                let kw = self.bump();
                let body = self.loop_body()?;
                self.expect(Tag::While)?;
                let cond = self.condition()?;
                self.expect(Tag::Char(';'))?;
                Stmt::do_while(kw.loc, body, cond)
            }
            Tag::Break => {
                let kw = self.bump();
                if self.loops == 0 {
                    return Err(CompileError::syntax("`break` outside of a loop", kw.loc));
                }
                self.expect(Tag::Char(';'))?;
                Ok(Stmt::brk(kw.loc))
            }
            Tag::Id | Tag::Num | Tag::Real | Tag::True | Tag::False | Tag::Char('(' | '-' | '!') => {
                let expr = self.assign()?;
                self.expect(Tag::Char(';'))?;
                expr_stmt(expr)
            }
            _ => Err(CompileError::syntax(format!("unknown statement start {}", self.look), self.look.loc)),
        }
    }

    fn condition(&mut self) -> CompileResult<Expr> {
        self.expect(Tag::Char('('))?;
        let cond = self.assign()?;
        self.expect(Tag::Char(')'))?;
        check_condition(&cond)?;
        Ok(cond)
    }

    fn loop_body(&mut self) -> CompileResult<Stmt> {
        self.loops += 1;
        let body = self.stmt();
        self.loops -= 1;
        body
    }

    fn assign(&mut self) -> CompileResult<Expr> {
        let target = self.or()?;
        if self.peek() == Tag::Char('=') {
            let eq = self.bump();
            let value = self.assign()?;
            return Expr::assign(eq.loc, target, value);
        }
        Ok(target)
    }

    fn or(&mut self) -> CompileResult<Expr> {
        let mut left = self.and()?;
        while self.peek() == Tag::Or {
            let op = self.bump();
            let right = self.and()?;
            left = Expr::logical(op, left, right)?;
        }
        Ok(left)
    }

    fn and(&mut self) -> CompileResult<Expr> {
        let mut left = self.equality()?;
        while self.peek() == Tag::And {
            let op = self.bump();
            let right = self.equality()?;
            left = Expr::logical(op, left, right)?;
        }
        Ok(left)
    }

    fn equality(&mut self) -> CompileResult<Expr> {
        let mut left = self.rel()?;
        while matches!(self.peek(), Tag::Eq | Tag::Ne) {
            let op = self.bump();
            let right = self.rel()?;
            left = Expr::rel(op, left, right);
        }
        Ok(left)
    }

    fn rel(&mut self) -> CompileResult<Expr> {
        let mut left = self.arith()?;
        while matches!(self.peek(), Tag::Char('<' | '>') | Tag::Le | Tag::Ge) {
            let op = self.bump();
            let right = self.arith()?;
            left = Expr::rel(op, left, right);
        }
        Ok(left)
    }

    fn arith(&mut self) -> CompileResult<Expr> {
        let mut left = self.term()?;
        while matches!(self.peek(), Tag::Char('+' | '-')) {
            let op = self.bump();
            let right = self.term()?;
            left = Expr::arith(op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> CompileResult<Expr> {
        let mut left = self.unary()?;
        while matches!(self.peek(), Tag::Char('*' | '/')) {
            let op = self.bump();
            let right = self.unary()?;
            left = Expr::arith(op, left, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> CompileResult<Expr> {
        match self.peek() {
            Tag::Char('-') => {
                let minus = self.bump();
                let op = Token::word(Rc::new(Word::new("-", Tag::Minus)), minus.loc);
                let operand = self.unary()?;
                Expr::unary(op, operand)
            }
            Tag::Char('!') => {
                let op = self.bump();
                let operand = self.unary()?;
                Expr::not(op, operand)
            }
            _ => self.factor(),
        }
    }

    fn factor(&mut self) -> CompileResult<Expr> {
        match self.peek() {
            Tag::Char('(') => {
                self.bump();
                let inner = self.assign()?;
                self.expect(Tag::Char(')'))?;
                Ok(inner)
            }
            Tag::Num | Tag::Real | Tag::True | Tag::False => Expr::constant(self.bump()),
            Tag::Id => {
                let name = self.bump();
                let id = self.env.get(&name.lexeme).ok_or_else(|| CompileError::undeclared(&name.lexeme, name.loc))?;
                let mut expr = Expr::id(name.loc, id);
                while self.peek() == Tag::Char('[') {
                    let open = self.bump();
                    let index = self.assign()?;
                    self.expect(Tag::Char(']'))?;
                    expr = Expr::access(open.loc, expr, index)?;
                }
                Ok(expr)
            }
            _ => Err(CompileError::syntax(format!("expected an expression but found {}", self.look), self.look.loc)),
        }
    }
}

// A top-level assignment becomes a store statement; anything else is kept
// for its side effects.
fn expr_stmt(expr: Expr) -> CompileResult<Stmt> {
    let loc = expr.loc;
    match expr.kind {
        ExprKind::Assign { target, value } => {
            let target = *target;
            match target.kind {
                ExprKind::Access { array, index } => Stmt::set_elem(loc, *array, *index, *value),
                _ => Stmt::set(loc, target, *value),
            }
        }
        _ => Ok(Stmt::expr(expr)),
    }
}
