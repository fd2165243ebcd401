//! A small compiler front-end for a block-structured toy language.
//!
//! Source text is scanned by [`lexer::Lexer`], parsed and type checked in one
//! pass by [`parser::parse_program`], and the resulting typed tree is handed to
//! any [`codegen::Emitter`]. Two backends ship with the crate: C-like
//! pseudocode ([`TextEmitter`]) and three-address code ([`ThreeAddressEmitter`]).

pub mod ast;
pub mod codegen;
pub mod env;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod ty;

use log::debug;

pub use ast::{Expr, ExprKind, Program, SourceLocation, Stmt, StmtKind};
pub use codegen::{Emitter, TextEmitter, ThreeAddressEmitter};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use parser::parse_program;
pub use ty::Type;

/// Parses `src` and emits the program through `out`.
pub fn compile(src: &str, out: &mut dyn Emitter) -> CompileResult<Program> {
    let program = parse_program(src)?;
    debug!("parsed {} symbol(s), frame size {}", program.symbols.len(), program.frame_size);
    program.emit(out);
    Ok(program)
}

/// Compiles `src` to pseudocode with the default text backend.
pub fn to_pseudocode(src: &str) -> CompileResult<String> {
    let mut out = TextEmitter::new();
    compile(src, &mut out)?;
    Ok(out.into_code())
}
