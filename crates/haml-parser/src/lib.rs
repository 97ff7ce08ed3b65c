//! Haml Parser
//!
//! Parses `.haml` template source into a [`Document`] AST. Nesting comes from
//! indentation (tracked by `haml-lexer`), each line is dispatched on its
//! leading symbol, and `:filter` blocks are handed to transforms looked up in
//! a [`FilterRegistry`].
//!
//! # Example
//!
//! ```
//! use haml_parser::{Node, Parser};
//!
//! let doc = Parser::parse("%div\n  %span= 1\n").unwrap();
//! assert!(matches!(&doc.children[0], Node::Element(div) if div.tag == "div"));
//! ```

pub mod ast;
pub mod element;
pub mod filter;
pub mod parser;
pub mod registry;

pub use ast::{Document, Fragment, Node};
pub use parser::Parser;
pub use registry::{Filter, FilterRegistry};

use haml_lexer::LexerError;

/// The single error surfaced by a parse: an authoring mistake at a 1-based
/// source line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}Parse error at line {line}: {message}", file_prefix(.file))]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    /// Source identifier supplied by the caller, used only for display.
    pub file: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
            file: None,
        }
    }
}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError::new(e.message, e.line)
    }
}

fn file_prefix(file: &Option<String>) -> String {
    match file {
        Some(name) => format!("{name}: "),
        None => String::new(),
    }
}
