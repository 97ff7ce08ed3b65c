//! Haml Lexer
//!
//! Turns `.haml` source text into logical lines and tracks the
//! indentation-driven nesting that the parser builds its tree from.
//! Also decides, from surface syntax alone, whether an embedded Ruby
//! statement continues onto the next physical line.
//!
//! # Example
//!
//! ```
//! use haml_lexer::LineScanner;
//!
//! let mut scanner = LineScanner::new("%div\n\n  %span");
//! let first = scanner.next_line().unwrap();
//! assert_eq!(first.text, "%div");
//! assert_eq!(scanner.next_line().unwrap().line, 2);
//! assert_eq!(scanner.next_line().unwrap().indent, "  ");
//! assert!(!scanner.has_next());
//! ```

pub mod code;
pub mod indent;
pub mod line;
pub mod multiline;

pub use indent::{IndentHandler, IndentTracker, Indented};
pub use line::{LineScanner, LogicalLine};

/// Lexer error with the 1-based source line it was detected on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {line}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}
