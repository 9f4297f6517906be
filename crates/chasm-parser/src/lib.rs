//! chasm parser crate.
//!
//! This crate provides the lexer and parser for chasm assembler source:
//! - Lexical analysis (tokenization)
//! - Abstract Syntax Tree (AST) definitions
//! - Recursive-descent parser producing an arena-allocated AST
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use chasm_parser::Parser;
//!
//! let arena = Bump::new();
//! match Parser::parse("object point { i32, i32 }", &arena) {
//!     Ok(module) => println!("parsed {} items", module.items().len()),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

// Lexer module
pub mod lexer;

// AST module
pub mod ast;

// Re-export commonly used types at crate root
pub use ast::Parser;
pub use lexer::{Lexer, Token, TokenKind};
