//! Continuation of embedded Ruby across physical lines.
//!
//! A statement is incomplete when, after [`code::scan`], one of these holds:
//! a string or regex literal is unterminated, a bracket or `#{}` is unclosed,
//! a block parameter list (`do |a,`) is unclosed, or the code ends in one of
//! [`TRAILING_OPERATORS`] or [`TRAILING_WORDS`]. Nothing else is considered.
//!
//! A single trailing `|` is not an operator here: at the end of a line it is
//! Haml's own multiline marker, and inside code it closes block parameters.
//! A `/` only counts as division when it does not open a regex literal; see
//! [`code`] for how the two are told apart.

use crate::code;
use crate::{LexerError, LineScanner};

/// Line endings that leave a binary operator, ternary or call chain open.
/// Longer operators (`==`, `=~`, `<<`, `**`) end in one of these.
pub const TRAILING_OPERATORS: &[&str] = &[
    ",", "\\", "&&", "||", "+", "-", "*", "/", "%", "=", "~", "<", ">", ".", "&", "^", " ?", " :",
];

/// Keyword operators that continue a statement.
pub const TRAILING_WORDS: &[&str] = &["and", "or", "not"];

/// Ruby code merged from one or more physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub code: String,
    /// Physical lines covered, including the first one.
    pub line_count: usize,
}

/// Whether `text` is a syntactically complete statement as far as the
/// surface heuristics can tell.
pub fn looks_complete(text: &str) -> bool {
    let state = code::scan(text);
    if !state.is_balanced() {
        return false;
    }
    !ends_with_operator(state.skeleton.trim_end())
}

fn ends_with_operator(skeleton: &str) -> bool {
    TRAILING_OPERATORS.iter().any(|op| skeleton.ends_with(op))
        || TRAILING_WORDS
            .iter()
            .any(|word| code::ends_with_word(skeleton, word))
}

/// Pull physical lines from `scanner` until `code` looks complete.
///
/// Each line is appended after a `\n` so the merged code keeps its line
/// structure. Fails if the input ends while the statement is still open.
pub fn read(scanner: &mut LineScanner<'_>, code: &str) -> Result<Continuation, LexerError> {
    let mut merged = code.to_string();
    let mut line_count = 1;

    while !looks_complete(&merged) {
        let Some(next) = scanner.next_physical() else {
            return Err(LexerError::new(
                "Unterminated Ruby code: reached end of input inside a multiline statement",
                scanner.line_number(),
            ));
        };
        merged.push('\n');
        merged.push_str(next.trim_end());
        line_count += 1;
    }

    if line_count > 1 {
        log::trace!("merged {line_count} physical lines into one statement");
    }

    Ok(Continuation {
        code: merged,
        line_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // looks_complete
    // =========================================================================

    #[test]
    fn test_simple_statements_complete() {
        assert!(looks_complete("1"));
        assert!(looks_complete("link_to 'Home', root_path"));
        assert!(looks_complete("if user.admin?"));
        assert!(looks_complete("items.each do |item|"));
        assert!(looks_complete("x = -1"));
    }

    #[test]
    fn test_trailing_comma() {
        assert!(!looks_complete("foo 1,"));
        assert!(looks_complete("foo ?,"));
    }

    #[test]
    fn test_trailing_operators() {
        assert!(!looks_complete("a +"));
        assert!(!looks_complete("a &&"));
        assert!(!looks_complete("a ||"));
        assert!(!looks_complete("total ="));
        assert!(!looks_complete("user."));
        assert!(!looks_complete("ok ?"));
        assert!(!looks_complete("ok ? 1 :"));
        assert!(!looks_complete("a and"));
        assert!(looks_complete("brand"));
    }

    #[test]
    fn test_arithmetic_and_match_operators() {
        assert!(!looks_complete("total /"));
        assert!(!looks_complete("index %"));
        assert!(!looks_complete("name =~"));
        assert!(looks_complete("total / count"));
    }

    #[test]
    fn test_regex_literal_brackets_not_counted() {
        assert!(looks_complete(r"x = s.sub(/\(/, '')"));
        assert!(looks_complete("parts = line.split /,/"));
        assert!(!looks_complete("parts = line.split /,"));
    }

    #[test]
    fn test_backslash_continuation() {
        assert!(!looks_complete("foo \\"));
    }

    #[test]
    fn test_operator_inside_string_is_not_trailing() {
        assert!(looks_complete(r#"foo "a +""#));
        assert!(looks_complete("foo # trailing comment,"));
    }

    #[test]
    fn test_open_constructs() {
        assert!(!looks_complete("foo(1"));
        assert!(!looks_complete("\"abc"));
        assert!(!looks_complete("items.each do |a,"));
    }

    // =========================================================================
    // read
    // =========================================================================

    #[test]
    fn test_read_complete_consumes_nothing() {
        let mut scanner = LineScanner::new("foo\nbar");
        scanner.next_line();
        let cont = read(&mut scanner, "foo").unwrap();
        assert_eq!(cont.code, "foo");
        assert_eq!(cont.line_count, 1);
        assert_eq!(scanner.line_number(), 1);
    }

    #[test]
    fn test_read_merges_until_complete() {
        let mut scanner = LineScanner::new("= foo(1,\n  2,\n  3)\n%p");
        scanner.next_line();
        let cont = read(&mut scanner, "foo(1,").unwrap();
        assert_eq!(cont.code, "foo(1,\n  2,\n  3)");
        assert_eq!(cont.line_count, 3);
        assert_eq!(scanner.line_number(), 3);
        assert_eq!(scanner.next_line().unwrap().text, "%p");
    }

    #[test]
    fn test_read_fails_at_end_of_input() {
        let mut scanner = LineScanner::new("- foo(1,\n  2,");
        scanner.next_line();
        let err = read(&mut scanner, "foo(1,").unwrap_err();
        assert!(err.message.contains("Unterminated Ruby code"));
        assert_eq!(err.line, 2);
    }
}
