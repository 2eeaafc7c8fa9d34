pub mod ast;
pub mod config;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod prompt;
pub mod remote;
pub mod repl;
pub mod terminal;

pub use parser::parse;
