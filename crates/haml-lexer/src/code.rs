//! Surface-level lexing of embedded Ruby.
//!
//! This is not a Ruby tokenizer. It only knows enough to tell which brackets,
//! quotes and `#{}` interpolations are still open, so that a bracket written
//! inside a string or `/regex/` literal is never mistaken for structure.
//! A `/` counts as a regex opener only where an operand is expected; percent
//! literals (`%r{...}`, `%w(...)`) are scanned as ordinary brackets.

/// An open construct on the scanner's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Bracket(char),
    Str(char),
    Interpolation,
}

/// Result of scanning a piece of code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeState {
    /// Brackets, strings or interpolations left open at the end of the text.
    pub open: usize,
    /// A `do |a, b` or `{ |a` parameter list is still open.
    pub block_params_open: bool,
    /// Byte offset just past the closer that balanced the first opener,
    /// if the text started with an opening bracket.
    pub balanced_at: Option<usize>,
    /// The text with string contents replaced by `_` and comments removed.
    pub skeleton: String,
}

impl CodeState {
    pub fn is_balanced(&self) -> bool {
        self.open == 0 && !self.block_params_open
    }
}

/// Scan `text` and report what remains open at its end.
pub fn scan(text: &str) -> CodeState {
    let mut frames: Vec<Frame> = Vec::new();
    let mut skeleton = String::with_capacity(text.len());
    let mut block_params_open = false;
    let mut balanced_at = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match frames.last().copied() {
            Some(Frame::Str(quote)) => match c {
                '\\' => {
                    chars.next();
                }
                '#' if quote != '\'' && chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    frames.push(Frame::Interpolation);
                }
                c if c == quote => {
                    frames.pop();
                    skeleton.push('_');
                }
                _ => {}
            },
            _ => match c {
                '"' | '\'' | '`' => frames.push(Frame::Str(c)),
                '/' if starts_regex(&skeleton, chars.peek().map(|&(_, n)| n)) => {
                    frames.push(Frame::Str(c));
                }
                '#' => {
                    // Comment runs to the end of the physical line.
                    while let Some(&(_, n)) = chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '?' if starts_char_literal(&skeleton, chars.clone().map(|(_, n)| n)) => {
                    chars.next();
                    skeleton.push('_');
                }
                '(' | '[' | '{' => {
                    frames.push(Frame::Bracket(c));
                    skeleton.push(c);
                }
                ')' | ']' | '}' => {
                    match frames.last() {
                        Some(Frame::Interpolation) if c == '}' => {
                            frames.pop();
                        }
                        Some(Frame::Bracket(open)) if closes(*open, c) => {
                            frames.pop();
                            skeleton.push(c);
                        }
                        _ => skeleton.push(c),
                    }
                    if frames.is_empty() && balanced_at.is_none() && is_opener(text) {
                        balanced_at = Some(i + c.len_utf8());
                    }
                }
                '|' if block_params_open => {
                    block_params_open = false;
                    skeleton.push(' ');
                }
                '|' if opens_block_params(&skeleton) => {
                    block_params_open = true;
                    skeleton.push(' ');
                }
                _ => skeleton.push(c),
            },
        }
    }

    CodeState {
        open: frames.len(),
        block_params_open,
        balanced_at,
        skeleton,
    }
}

/// `/` opens a regex literal where an operand is expected: at the start,
/// after an operator or opening bracket, after a keyword like `when`, or as
/// the first argument of a paren-less call (`split /,/`, but not `a / b`).
fn starts_regex(skeleton: &str, next: Option<char>) -> bool {
    const KEYWORDS: &[&str] = &[
        "if", "elsif", "unless", "when", "while", "until", "and", "or", "not", "return",
    ];

    let before = skeleton.trim_end();
    match before.chars().last() {
        None => true,
        Some(c) if "([{,=!~&|;:?<>+-*".contains(c) => true,
        Some(_) if KEYWORDS.iter().any(|kw| ends_with_word(before, kw)) => true,
        Some(_) => {
            skeleton.ends_with(' ') && next.is_some_and(|n| !n.is_whitespace() && n != '=')
        }
    }
}

/// Byte offset just past the bracket that closes the one `text` starts with.
/// Returns `None` when `text` does not start with a bracket or never balances.
pub fn matching_close(text: &str) -> Option<usize> {
    scan(text).balanced_at
}

fn is_opener(text: &str) -> bool {
    text.starts_with(['(', '[', '{'])
}

fn closes(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}

/// `?x` is a character literal when it begins an operand and the literal
/// character is not followed by more identifier characters.
fn starts_char_literal(skeleton: &str, mut rest: impl Iterator<Item = char>) -> bool {
    let begins_operand = match skeleton.trim_end_matches(' ').chars().last() {
        None => true,
        Some(prev) => {
            skeleton.ends_with(' ') || matches!(prev, '(' | '[' | '{' | ',' | '=')
        }
    };
    if !begins_operand {
        return false;
    }
    match (rest.next(), rest.next()) {
        (Some(lit), after) if !lit.is_whitespace() => {
            after.map_or(true, |a| !(a.is_alphanumeric() || a == '_'))
        }
        _ => false,
    }
}

fn opens_block_params(skeleton: &str) -> bool {
    let trimmed = skeleton.trim_end();
    trimmed.ends_with('{') || ends_with_word(trimmed, "do")
}

/// `text` ends with `word` standing on its own.
pub fn ends_with_word(text: &str, word: &str) -> bool {
    match text.strip_suffix(word) {
        Some(before) => !before
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}
