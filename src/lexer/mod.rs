mod comments;
mod lexer;
mod token;

pub use comments::*;
pub use lexer::*;
pub use token::*;
