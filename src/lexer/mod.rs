mod lexer;
mod token;

pub use lexer::{Lexer, DELIMS};
pub use token::{Token, OPERATORS};
