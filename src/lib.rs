//! A single-pass compiler from a small Lua-like language to 32-bit x86 NASM.
//!
//! - `lexer` turns filtered source text into tokens, one at a time.
//! - `parser` builds the AST by recursive descent.
//! - `analyzer` holds the type tags and the variable and function tables.
//! - `codegen` walks the AST once, type-checking and emitting assembly together.

pub mod analyzer;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

use codegen::Codegen;
use parser::{IdGenerator, Parser};

pub use error::{CompileError, CompileResult};

/// Compilation state that outlives a single run. Node ids keep counting across
/// compilations, so labels from different runs never collide either.
#[derive(Debug, Default)]
pub struct Compiler {
    ids: IdGenerator,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, source: &str) -> CompileResult<String> {
        let root = Parser::new(source, &mut self.ids)?.parse()?;
        Codegen::new().generate(&root)
    }
}

/// Compiles `source` into a complete assembly file.
pub fn compile(source: &str) -> CompileResult<String> {
    Compiler::new().compile(source)
}
