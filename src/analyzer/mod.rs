mod function_table;
mod symbol_table;
mod ty;

pub use function_table::*;
pub use symbol_table::*;
pub use ty::*;
