use std::collections::HashMap;

use log::warn;

use crate::env::Id;
use crate::lexer::Token;
use crate::ty::Type;

/// A deferred statement producer handed to an emitter.
pub type Block<'a> = &'a mut dyn FnMut(&mut dyn Emitter);
/// A deferred condition producer; returns the condition's handle.
pub type Cond<'a> = &'a mut dyn FnMut(&mut dyn Emitter) -> String;

/// The backend seam between the AST and concrete output.
///
/// Expression hooks return a handle: a string standing for the value just
/// computed that later hooks can refer to. Statement hooks append to the
/// backend's output. Control-flow hooks receive their sub-parts as producers
/// and decide when, and how often, to run them.
///
/// Array hooks also receive the element type, so a backend can compute
/// addresses from element widths.
pub trait Emitter {
    fn emit_load_const(&mut self, value: &Token) -> String;
    fn emit_identifier(&mut self, id: &Id) -> String;
    fn emit_unary_op(&mut self, op: &Token, operand: &str) -> String;
    fn emit_binary_op(&mut self, lhs: &str, op: &Token, rhs: &str) -> String;
    fn emit_array_access(&mut self, array: &str, index: &str, elem: &Type) -> String;
    fn emit_temp(&mut self, number: usize) -> String;

    fn emit_if(&mut self, cond: &str, then_block: Block<'_>);
    fn emit_if_else(&mut self, cond: &str, then_block: Block<'_>, else_block: Block<'_>);
    fn emit_while(&mut self, cond: Cond<'_>, body: Block<'_>);
    fn emit_do_while(&mut self, body: Block<'_>, cond: Cond<'_>);
    fn emit_break(&mut self);
    fn emit_assign(&mut self, target: &str, value: &str);
    fn emit_array_assign(&mut self, array: &str, index: &str, value: &str, elem: &Type);
}

/// Renders C-like pseudocode into one string.
#[derive(Debug, Clone)]
pub struct TextEmitter {
    code: String,
    depth: usize,
    indent: usize,
}

impl Default for TextEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEmitter {
    pub fn new() -> Self {
        Self::with_indent(4)
    }

    /// Nested bodies are indented by `indent` spaces per level.
    pub fn with_indent(indent: usize) -> Self {
        Self { code: String::new(), depth: 0, indent }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn into_code(self) -> String {
        self.code
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth * self.indent {
            self.code.push(' ');
        }
        self.code.push_str(text);
        self.code.push('\n');
    }

    fn nested(&mut self, block: Block<'_>) {
        self.depth += 1;
        block(self);
        self.depth -= 1;
    }

    // Runs a condition producer one level deeper than the current line and
    // returns the handle together with any statements it printed.
    fn nested_cond(&self, cond: Cond<'_>) -> (String, String) {
        let mut scratch = TextEmitter { code: String::new(), depth: self.depth + 1, indent: self.indent };
        let c = cond(&mut scratch);
        (c, scratch.code)
    }
}

// Wraps a handle in parentheses when it is itself an operator expression,
// so the printed text keeps the tree's grouping.
fn group(handle: &str) -> String {
    let mut brackets = 0usize;
    for c in handle.chars() {
        match c {
            '[' | '(' => brackets += 1,
            ']' | ')' => brackets = brackets.saturating_sub(1),
            ' ' if brackets == 0 => return format!("({})", handle),
            _ => {}
        }
    }
    handle.to_string()
}

impl Emitter for TextEmitter {
    fn emit_load_const(&mut self, value: &Token) -> String {
        value.lexeme.to_string()
    }

    fn emit_identifier(&mut self, id: &Id) -> String {
        id.name.clone()
    }

    fn emit_unary_op(&mut self, op: &Token, operand: &str) -> String {
        let operand = if operand.starts_with(|c| c == '-' || c == '!') { format!("({})", operand) } else { group(operand) };
        format!("{}{}", op.lexeme, operand)
    }

    fn emit_binary_op(&mut self, lhs: &str, op: &Token, rhs: &str) -> String {
        format!("{} {} {}", group(lhs), op.lexeme, group(rhs))
    }

    fn emit_array_access(&mut self, array: &str, index: &str, _elem: &Type) -> String {
        format!("{}[{}]", array, index)
    }

    fn emit_temp(&mut self, number: usize) -> String {
        format!("t{}", number)
    }

    fn emit_if(&mut self, cond: &str, then_block: Block<'_>) {
        self.line(&format!("if ({}) {{", cond));
        self.nested(then_block);
        self.line("}");
    }

    fn emit_if_else(&mut self, cond: &str, then_block: Block<'_>, else_block: Block<'_>) {
        self.line(&format!("if ({}) {{", cond));
        self.nested(then_block);
        self.line("} else {");
        self.nested(else_block);
        self.line("}");
    }

    // A condition that prints statements is re-evaluated inside the loop:
    // `while (true) { <stmts> if (!(c)) break; <body> }`.
    fn emit_while(&mut self, cond: Cond<'_>, body: Block<'_>) {
        let (c, stmts) = self.nested_cond(cond);
        if stmts.is_empty() {
            self.line(&format!("while ({}) {{", c));
        } else {
            self.line("while (true) {");
            self.code.push_str(&stmts);
            self.depth += 1;
            self.line(&format!("if (!({})) break;", c));
            self.depth -= 1;
        }
        self.nested(body);
        self.line("}");
    }

    fn emit_do_while(&mut self, body: Block<'_>, cond: Cond<'_>) {
        self.line("do {");
        self.nested(body);
        let (c, stmts) = self.nested_cond(cond);
        self.code.push_str(&stmts);
        self.line(&format!("}} while ({});", c));
    }

    fn emit_break(&mut self) {
        self.line("break;");
    }

    fn emit_assign(&mut self, target: &str, value: &str) {
        self.line(&format!("{} = {};", target, value));
    }

    fn emit_array_assign(&mut self, array: &str, index: &str, value: &str, _elem: &Type) {
        self.line(&format!("{}[{}] = {};", array, index, value));
    }
}

/// Lowers the tree to three-address pseudocode: every operator result lands
/// in a fresh temporary and control flow becomes labels and jumps.
///
/// Element accesses are flattened to byte offsets: `m[i][j]` over `int[2][3]`
/// becomes `t1 = i * 12`, `t2 = j * 4`, `t3 = t1 + t2`, `m [ t3 ]`.
#[derive(Debug, Clone, Default)]
pub struct ThreeAddressEmitter {
    code: String,
    temps: usize,
    labels: usize,
    /// Exit labels of the enclosing loops, innermost last.
    exits: Vec<String>,
    /// Offset temporaries of partial accesses, mapped to the array they index.
    rows: HashMap<String, String>,
}

impl ThreeAddressEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn into_code(self) -> String {
        self.code
    }

    fn instr(&mut self, text: &str) {
        self.code.push('\t');
        self.code.push_str(text);
        self.code.push('\n');
    }

    fn label(&mut self, label: &str) {
        self.code.push_str(label);
        self.code.push_str(":\n");
    }

    fn new_label(&mut self) -> String {
        self.labels += 1;
        format!("L{}", self.labels)
    }

    fn new_temp(&mut self) -> String {
        self.temps += 1;
        format!("t{}", self.temps)
    }

    // Base array and byte-offset handle of `array[index]`.
    fn address(&mut self, array: &str, index: &str, elem: &Type) -> (String, String) {
        let scaled = self.new_temp();
        self.instr(&format!("{} = {} * {}", scaled, index, elem.width()));
        match self.rows.get(array).cloned() {
            Some(base) => {
                let offset = self.new_temp();
                self.instr(&format!("{} = {} + {}", offset, array, scaled));
                (base, offset)
            }
            None => (array.to_string(), scaled),
        }
    }

    fn in_loop(&mut self, exit: &str, body: Block<'_>) {
        self.exits.push(exit.to_string());
        body(self);
        self.exits.pop();
    }
}

impl Emitter for ThreeAddressEmitter {
    fn emit_load_const(&mut self, value: &Token) -> String {
        value.lexeme.to_string()
    }

    fn emit_identifier(&mut self, id: &Id) -> String {
        id.name.clone()
    }

    fn emit_unary_op(&mut self, op: &Token, operand: &str) -> String {
        let t = self.new_temp();
        self.instr(&format!("{} = {} {}", t, op.lexeme, operand));
        t
    }

    fn emit_binary_op(&mut self, lhs: &str, op: &Token, rhs: &str) -> String {
        let t = self.new_temp();
        self.instr(&format!("{} = {} {} {}", t, lhs, op.lexeme, rhs));
        t
    }

    fn emit_array_access(&mut self, array: &str, index: &str, elem: &Type) -> String {
        let (base, offset) = self.address(array, index, elem);
        if elem.is_array() {
            self.rows.insert(offset.clone(), base);
            return offset;
        }
        let t = self.new_temp();
        self.instr(&format!("{} = {} [ {} ]", t, base, offset));
        t
    }

    fn emit_temp(&mut self, number: usize) -> String {
        format!("t{}", number)
    }

    fn emit_if(&mut self, cond: &str, then_block: Block<'_>) {
        let after = self.new_label();
        self.instr(&format!("iffalse {} goto {}", cond, after));
        then_block(self);
        self.label(&after);
    }

    fn emit_if_else(&mut self, cond: &str, then_block: Block<'_>, else_block: Block<'_>) {
        let otherwise = self.new_label();
        let after = self.new_label();
        self.instr(&format!("iffalse {} goto {}", cond, otherwise));
        then_block(self);
        self.instr(&format!("goto {}", after));
        self.label(&otherwise);
        else_block(self);
        self.label(&after);
    }

    fn emit_while(&mut self, cond: Cond<'_>, body: Block<'_>) {
        let head = self.new_label();
        let exit = self.new_label();
        self.label(&head);
        let c = cond(self);
        self.instr(&format!("iffalse {} goto {}", c, exit));
        self.in_loop(&exit, body);
        self.instr(&format!("goto {}", head));
        self.label(&exit);
    }

    fn emit_do_while(&mut self, body: Block<'_>, cond: Cond<'_>) {
        let head = self.new_label();
        let exit = self.new_label();
        self.label(&head);
        self.in_loop(&exit, body);
        let c = cond(self);
        self.instr(&format!("if {} goto {}", c, head));
        self.label(&exit);
    }

    fn emit_break(&mut self) {
        match self.exits.last().cloned() {
            Some(exit) => self.instr(&format!("goto {}", exit)),
            None => warn!("`break` emitted outside of any loop; ignored"),
        }
    }

    fn emit_assign(&mut self, target: &str, value: &str) {
        self.instr(&format!("{} = {}", target, value));
    }

    fn emit_array_assign(&mut self, array: &str, index: &str, value: &str, elem: &Type) {
        let (base, offset) = self.address(array, index, elem);
        self.instr(&format!("{} [ {} ] = {}", base, offset, value));
    }
}
