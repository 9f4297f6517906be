//! Abstract Syntax Tree (AST) for chasm source.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use chasm_parser::Parser;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     method main<>void {
//!         psh_b 5;
//!         ret;
//!     }
//! "#;
//!
//! let module = Parser::parse(source, &arena).unwrap();
//! assert_eq!(module.items().len(), 1);
//! ```

pub mod nodes;
mod parser;
mod stmt_parser;

pub use chasm_core::{ParseError, ParseErrorKind};

pub use nodes::*;
pub use parser::Parser;
