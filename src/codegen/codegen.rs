use std::cmp::Ordering;

use tracing::debug;

use crate::{
    analyzer::{FunctionTable, SymbolTable, Ty, Value},
    error::{CompileError, CompileResult, TypeError},
    parser::{BinOpKind, Block, FuncDec, Node, NodeId, NodeKind, UnOpKind},
};

use super::Assembly;

const WORD_SIZE: usize = 4;
const MAIN_FRAME_SIZE: &str = "frame_size_main";

macro_rules! emit {
    ($asm:expr, $($arg:tt)*) => {
        $asm.emit(format_args!($($arg)*))
    };
}

/// User functions live under a prefix so they never clash with mnemonics or
/// the boilerplate labels.
fn function_label(name: &str) -> String {
    format!("func_{name}")
}

fn frame_size_label(id: NodeId) -> String {
    format!("frame_size_{id}")
}

/// Walks the AST once, checking types and emitting code as it goes.
///
/// Every expression leaves its runtime result in EAX. A binary operator
/// evaluates its right operand first and parks it on the stack, so by the
/// time the operation runs the left operand is in EAX and the right in EBX.
pub struct Codegen<'a> {
    asm: Assembly,
    functions: FunctionTable<'a>,
}

impl Default for Codegen<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Codegen<'a> {
    pub fn new() -> Self {
        Self {
            asm: Assembly::new(),
            functions: FunctionTable::new(),
        }
    }

    /// Compiles a whole program (the top-level block) into the final text.
    pub fn generate(mut self, root: &'a Node) -> CompileResult<String> {
        let mut scope = SymbolTable::new();

        emit!(self.asm, "SUB ESP, {MAIN_FRAME_SIZE}");
        self.evaluate(root, &mut scope)?;
        emit!(self.asm, "{MAIN_FRAME_SIZE} equ {}", scope.frame_size());
        debug!(frame_size = scope.frame_size(), "main frame");

        Ok(self.asm.finish())
    }

    pub fn evaluate(&mut self, node: &'a Node, scope: &mut SymbolTable) -> CompileResult<Value> {
        match &node.kind {
            NodeKind::Identifier(name) => {
                let symbol = scope.get(name)?;
                emit!(self.asm, "MOV EAX, DWORD {}", symbol.address());
                Ok(Value::unknown(symbol.ty))
            }
            NodeKind::IntVal(num) => {
                emit!(self.asm, "MOV EAX, {num}");
                Ok(Value::Int(*num))
            }
            NodeKind::StrVal(s) => {
                self.gen_string(node.id, s);
                Ok(Value::Str(s.clone()))
            }
            NodeKind::BinOp(kind, left, right) => self.gen_binop(*kind, left, right, scope),
            NodeKind::UnOp(kind, operand) => self.gen_unop(*kind, operand, scope),
            NodeKind::Assign(name, expr) => {
                let value = self.evaluate(expr, scope)?;
                let symbol = scope.set_type(name, value.ty())?;
                emit!(self.asm, "MOV DWORD {}, EAX", symbol.address());
                Ok(Value::Void)
            }
            NodeKind::VarDec(name, init) => {
                let symbol = scope.declare_var(name, Ty::Int)?;
                emit!(self.asm, "MOV DWORD {}, 0", symbol.address());
                if let Some(init) = init {
                    let value = self.evaluate(init, scope)?;
                    scope.set_type(name, value.ty())?;
                    emit!(self.asm, "MOV DWORD {}, EAX", symbol.address());
                }
                Ok(Value::Void)
            }
            NodeKind::Block(block) => self.gen_block(block, scope),
            NodeKind::If(cond, then_block, else_block) => {
                self.gen_if(node.id, cond, then_block, else_block, scope)
            }
            NodeKind::While(cond, body) => self.gen_while(node.id, cond, body, scope),
            NodeKind::Read => {
                emit!(self.asm, "PUSH scanint");
                emit!(self.asm, "PUSH formatin");
                emit!(self.asm, "CALL scanf");
                emit!(self.asm, "ADD ESP, 8");
                emit!(self.asm, "MOV EAX, DWORD [scanint]");
                Ok(Value::unknown(Ty::Int))
            }
            NodeKind::Print(expr) => {
                self.evaluate(expr, scope)?;
                emit!(self.asm, "PUSH EAX");
                emit!(self.asm, "PUSH formatout");
                emit!(self.asm, "CALL printf");
                emit!(self.asm, "ADD ESP, 8");
                Ok(Value::Void)
            }
            NodeKind::FuncDec(decl) => self.gen_func_dec(node.id, decl),
            NodeKind::FuncCall(name, args) => self.gen_func_call(name, args, scope),
            NodeKind::Return(expr) => {
                let value = self.evaluate(expr, scope)?;
                emit!(self.asm, "MOV ESP, EBP");
                emit!(self.asm, "POP EBP");
                emit!(self.asm, "RET");
                Ok(value)
            }
            NodeKind::NoOp => Ok(Value::Void),
        }
    }

    /// Stops at the first `return` among the block's own statements and
    /// yields its value. A `return` nested deeper still emits its `RET` but
    /// does not cut this block short.
    fn gen_block(&mut self, block: &'a Block, scope: &mut SymbolTable) -> CompileResult<Value> {
        for stmt in &block.0 {
            if let NodeKind::Return(_) = stmt.kind {
                return self.evaluate(stmt, scope);
            }
            self.evaluate(stmt, scope)?;
        }
        Ok(Value::Void)
    }

    /// The bytes sit inline behind a jump; EAX gets their address.
    fn gen_string(&mut self, id: NodeId, s: &str) {
        let bytes = s
            .bytes()
            .chain(std::iter::once(0))
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        emit!(self.asm, "JMP str_end_{id}");
        emit!(self.asm, "str_{id}: db {bytes}");
        emit!(self.asm, "str_end_{id}:");
        emit!(self.asm, "MOV EAX, str_{id}");
    }

    fn gen_binop(
        &mut self,
        kind: BinOpKind,
        left: &'a Node,
        right: &'a Node,
        scope: &mut SymbolTable,
    ) -> CompileResult<Value> {
        let r = self.evaluate(right, scope)?;
        emit!(self.asm, "PUSH EAX");
        let l = self.evaluate(left, scope)?;
        emit!(self.asm, "POP EBX");

        let op = kind.symbol();
        match kind {
            BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div => {
                check_int(op, &l, &r)?;
                let (l, r) = (l.as_int(), r.as_int());
                let value = match kind {
                    BinOpKind::Add => {
                        emit!(self.asm, "ADD EAX, EBX");
                        l.wrapping_add(r)
                    }
                    BinOpKind::Sub => {
                        emit!(self.asm, "SUB EAX, EBX");
                        l.wrapping_sub(r)
                    }
                    BinOpKind::Mul => {
                        emit!(self.asm, "IMUL EBX");
                        l.wrapping_mul(r)
                    }
                    _ => {
                        emit!(self.asm, "CDQ");
                        emit!(self.asm, "IDIV EBX");
                        l.checked_div(r).unwrap_or(0)
                    }
                };
                Ok(Value::Int(value))
            }
            BinOpKind::And | BinOpKind::Or => {
                check_int(op, &l, &r)?;
                let (l, r) = (l.as_int(), r.as_int());
                if kind == BinOpKind::And {
                    emit!(self.asm, "AND EAX, EBX");
                    Ok(Value::Int(l & r))
                } else {
                    emit!(self.asm, "OR EAX, EBX");
                    Ok(Value::Int(l | r))
                }
            }
            BinOpKind::GreaterThan | BinOpKind::LessThan | BinOpKind::Equal => {
                let ordering = compare(op, &l, &r)?;
                let (routine, holds) = match kind {
                    BinOpKind::GreaterThan => ("binop_jg", ordering == Ordering::Greater),
                    BinOpKind::LessThan => ("binop_jl", ordering == Ordering::Less),
                    _ => ("binop_je", ordering == Ordering::Equal),
                };
                emit!(self.asm, "CMP EAX, EBX");
                emit!(self.asm, "CALL {routine}");
                Ok(Value::Int(holds as i32))
            }
            BinOpKind::Concat => {
                if l.ty() == Ty::Void || r.ty() == Ty::Void {
                    return Err(TypeError::Concat {
                        left: l.ty(),
                        right: r.ty(),
                    }
                    .into());
                }
                // No runtime lowering yet: EAX keeps the left operand.
                emit!(self.asm, "; .. (concatenation is resolved at compile time only)");
                Ok(Value::Str(format!("{l}{r}")))
            }
        }
    }

    fn gen_unop(
        &mut self,
        kind: UnOpKind,
        operand: &'a Node,
        scope: &mut SymbolTable,
    ) -> CompileResult<Value> {
        let value = self.evaluate(operand, scope)?;
        if value.ty() != Ty::Int {
            return Err(TypeError::Unary {
                op: kind.symbol(),
                operand: value.ty(),
            }
            .into());
        }

        let v = value.as_int();
        match kind {
            UnOpKind::Plus => Ok(Value::Int(v)),
            UnOpKind::Neg => {
                emit!(self.asm, "NEG EAX");
                Ok(Value::Int(v.wrapping_neg()))
            }
            UnOpKind::Not => {
                emit!(self.asm, "CMP EAX, False");
                emit!(self.asm, "CALL binop_je");
                Ok(Value::Int((v == 0) as i32))
            }
        }
    }

    fn gen_if(
        &mut self,
        id: NodeId,
        cond: &'a Node,
        then_block: &'a Block,
        else_block: &'a Block,
        scope: &mut SymbolTable,
    ) -> CompileResult<Value> {
        let else_label = format!("if_else_{id}");
        let end_label = format!("if_end_{id}");

        self.evaluate(cond, scope)?;
        emit!(self.asm, "CMP EAX, False");
        emit!(self.asm, "JE {else_label}");
        self.gen_block(then_block, scope)?;
        emit!(self.asm, "JMP {end_label}");
        emit!(self.asm, "{else_label}:");
        self.gen_block(else_block, scope)?;
        emit!(self.asm, "{end_label}:");

        Ok(Value::Void)
    }

    fn gen_while(
        &mut self,
        id: NodeId,
        cond: &'a Node,
        body: &'a Block,
        scope: &mut SymbolTable,
    ) -> CompileResult<Value> {
        let begin_label = format!("while_loop_{id}");
        let end_label = format!("while_exit_{id}");

        emit!(self.asm, "{begin_label}:");
        self.evaluate(cond, scope)?;
        emit!(self.asm, "CMP EAX, False");
        emit!(self.asm, "JE {end_label}");
        self.gen_block(body, scope)?;
        emit!(self.asm, "JMP {begin_label}");
        emit!(self.asm, "{end_label}:");

        Ok(Value::Void)
    }

    /// Emits the routine in place, jumped over so it does not run inline.
    /// The body gets a fresh scope holding only the parameters.
    fn gen_func_dec(&mut self, id: NodeId, decl: &'a FuncDec) -> CompileResult<Value> {
        self.functions.declare(decl)?;

        let label = function_label(&decl.name);
        let frame_size = frame_size_label(id);
        let end_label = format!("skip_func_{id}");

        emit!(self.asm, "JMP {end_label}");
        emit!(self.asm, "{label}:");
        emit!(self.asm, "PUSH EBP");
        emit!(self.asm, "MOV EBP, ESP");
        emit!(self.asm, "SUB ESP, {frame_size}");

        let mut scope = SymbolTable::new();
        for param in &decl.params {
            scope.declare_param(param)?;
        }

        let result = self.gen_block(&decl.body, &mut scope)?;
        if result.ty() != Ty::Void {
            self.functions.set_return_type(&decl.name, result.ty());
        }

        // Falling off the end returns 0.
        emit!(self.asm, "MOV EAX, 0");
        emit!(self.asm, "MOV ESP, EBP");
        emit!(self.asm, "POP EBP");
        emit!(self.asm, "RET");
        emit!(self.asm, "{frame_size} equ {}", scope.frame_size());
        emit!(self.asm, "{end_label}:");

        debug!(name = %decl.name, frame_size = scope.frame_size(), "generated function");
        Ok(Value::Void)
    }

    /// Arguments are pushed last to first, so the first one ends up at
    /// `[EBP+8]` in the callee. The caller pops them afterwards.
    fn gen_func_call(
        &mut self,
        name: &str,
        args: &'a [Node],
        scope: &mut SymbolTable,
    ) -> CompileResult<Value> {
        let entry = self.functions.get(name)?;
        if entry.arity() != args.len() {
            return Err(CompileError::Arity {
                name: name.to_string(),
                expected: entry.arity(),
                given: args.len(),
            });
        }

        for arg in args.iter().rev() {
            self.evaluate(arg, scope)?;
            emit!(self.asm, "PUSH EAX");
        }
        emit!(self.asm, "CALL {}", function_label(name));
        if !args.is_empty() {
            emit!(self.asm, "ADD ESP, {}", WORD_SIZE * args.len());
        }

        Ok(Value::unknown(entry.return_ty))
    }
}

fn check_int(op: &'static str, l: &Value, r: &Value) -> CompileResult<()> {
    if l.ty() == Ty::Int && r.ty() == Ty::Int {
        return Ok(());
    }
    Err(TypeError::Arithmetic {
        op,
        left: l.ty(),
        right: r.ty(),
    }
    .into())
}

/// Relational operators take two INTs or two STRINGs, never a mix.
fn compare(op: &'static str, l: &Value, r: &Value) -> CompileResult<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(TypeError::Mismatch {
            op,
            left: l.ty(),
            right: r.ty(),
        }
        .into()),
    }
}
