//! ECMAScript modules: lexer, parser, tree and printer.

pub mod ast;
pub mod lexer;
mod parser;
mod printer;

pub use parser::parse;
pub use printer::{print_expr, print_program};
