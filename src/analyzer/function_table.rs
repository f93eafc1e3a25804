use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{CompileResult, NameError},
    parser::FuncDec,
};

use super::Ty;

#[derive(Clone, Copy, Debug)]
pub struct FunctionEntry<'a> {
    pub decl: &'a FuncDec,
    /// Tag of the body's top-level `return`; INT until one is seen.
    pub return_ty: Ty,
}

impl FunctionEntry<'_> {
    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }
}

/// Every function declared so far, by name. Names are write-once and live
/// for the whole compilation.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable<'a> {
    table: HashMap<String, FunctionEntry<'a>>,
}

impl<'a> FunctionTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, decl: &'a FuncDec) -> CompileResult<()> {
        if self.table.contains_key(&decl.name) {
            return Err(NameError::DuplicateFunction(decl.name.clone()).into());
        }

        debug!(name = %decl.name, params = decl.params.len(), "declared function");
        self.table.insert(
            decl.name.clone(),
            FunctionEntry {
                decl,
                return_ty: Ty::Int,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> CompileResult<FunctionEntry<'a>> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| NameError::UndeclaredFunction(name.to_string()).into())
    }

    pub fn set_return_type(&mut self, name: &str, ty: Ty) {
        if let Some(entry) = self.table.get_mut(name) {
            entry.return_ty = ty;
        }
    }
}
