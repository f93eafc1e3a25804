use std::collections::HashMap;

use tracing::debug;

use crate::error::{CompileResult, NameError};

use super::Ty;

const SLOT_SIZE: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Symbol {
    pub ty: Ty,
    /// Positive: local at `[EBP - offset]`. Negative: parameter at `[EBP + |offset|]`.
    pub offset: i32,
}

impl Symbol {
    pub fn address(&self) -> String {
        if self.offset < 0 {
            format!("[EBP+{}]", -self.offset)
        } else {
            format!("[EBP-{}]", self.offset)
        }
    }
}

/// Variables of one frame: the top-level program or a single function body.
/// Scopes never nest and never see each other.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    table: HashMap<String, Symbol>,
    last_offset: i32,
    params: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a local to the next free slot: 4, 8, 12, ...
    pub fn declare_var(&mut self, name: &str, ty: Ty) -> CompileResult<Symbol> {
        if self.table.contains_key(name) {
            return Err(NameError::DuplicateVariable(name.to_string()).into());
        }

        self.last_offset += SLOT_SIZE;
        let symbol = Symbol {
            ty,
            offset: self.last_offset,
        };
        debug!(name, offset = symbol.offset, "declared local");
        self.table.insert(name.to_string(), symbol);
        Ok(symbol)
    }

    /// Binds the next parameter. The first one sits just above the saved EBP
    /// and the return address, at `[EBP+8]`, the next at `[EBP+12]`, ...
    pub fn declare_param(&mut self, name: &str) -> CompileResult<Symbol> {
        if self.table.contains_key(name) {
            return Err(NameError::DuplicateVariable(name.to_string()).into());
        }

        self.params += 1;
        let symbol = Symbol {
            ty: Ty::Int,
            offset: -SLOT_SIZE * (self.params as i32 + 1),
        };
        self.table.insert(name.to_string(), symbol);
        Ok(symbol)
    }

    pub fn get(&self, name: &str) -> CompileResult<Symbol> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| NameError::UndeclaredVariable(name.to_string()).into())
    }

    /// Retags an existing variable; its slot does not move.
    pub fn set_type(&mut self, name: &str, ty: Ty) -> CompileResult<Symbol> {
        let symbol = self
            .table
            .get_mut(name)
            .ok_or_else(|| NameError::UndeclaredVariable(name.to_string()))?;
        symbol.ty = ty;
        Ok(*symbol)
    }

    /// Bytes needed below EBP for every local declared so far.
    pub fn frame_size(&self) -> i32 {
        self.last_offset
    }
}
