use crate::{LexerError, LogicalLine};

/// An open indentation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Level {
    width: usize,
    /// Lines nested below this level are captured verbatim.
    opaque: bool,
}

/// Receives structural events from [`IndentTracker`].
///
/// Events fire synchronously while a line is processed, so the receiver can
/// keep its own stack in lock-step with the tracker's levels.
pub trait IndentHandler {
    type Error: From<LexerError>;

    /// A new, deeper level was opened by `line`.
    ///
    /// Returning `true` makes the level opaque: the opening line and every
    /// deeper line after it are reported as [`Indented::Opaque`].
    fn on_enter(&mut self, line: &LogicalLine) -> Result<bool, Self::Error>;

    /// The innermost level was closed.
    ///
    /// `following` is the dedented line when it lands on the closed level's
    /// own parent, making it the next sibling of the block that just ended.
    /// It is `None` for deeper levels closed on the way and at end of input.
    fn on_leave(&mut self, following: Option<&LogicalLine>) -> Result<(), Self::Error>;
}

/// What a processed line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indented<'l> {
    /// No content. Produces no structure but still counts as a line.
    Blank,
    /// Captured verbatim inside an opaque level.
    Opaque { text: &'l str },
    /// Ordinary content at a resolved indentation width.
    Structural { text: &'l str, width: usize },
}

/// Stack machine over leading-whitespace width.
///
/// Widths strictly increase from the bottom of the stack to the top. A line
/// either matches an existing level (possibly closing deeper ones) or opens a
/// single new level above the current top.
#[derive(Debug)]
pub struct IndentTracker {
    levels: Vec<Level>,
    indent_char: Option<char>,
}

impl Default for IndentTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentTracker {
    pub fn new() -> Self {
        Self {
            levels: vec![Level {
                width: 0,
                opaque: false,
            }],
            indent_char: None,
        }
    }

    /// Width of the innermost open level.
    pub fn current_width(&self) -> usize {
        self.top().width
    }

    /// Process one logical line, firing enter/leave events on `handler`.
    pub fn process<'l, H: IndentHandler>(
        &mut self,
        line: &'l LogicalLine,
        handler: &mut H,
    ) -> Result<Indented<'l>, H::Error> {
        if line.is_blank() {
            return Ok(Indented::Blank);
        }

        let width = line.width();
        if let Some(base) = self.opaque_base() {
            if width > base {
                return Ok(Indented::Opaque { text: &line.text });
            }
        }

        self.check_indent_char(line)?;

        let current = self.current_width();
        if width > current {
            self.levels.push(Level {
                width,
                opaque: false,
            });
            log::trace!("line {}: enter level {width}", line.line);
            if handler.on_enter(line)? {
                self.top_mut().opaque = true;
                return Ok(Indented::Opaque { text: &line.text });
            }
        } else if width < current {
            self.leave_to(width, line, handler)?;
        }

        Ok(Indented::Structural {
            text: &line.text,
            width,
        })
    }

    /// Close every open level at end of input.
    pub fn finish<H: IndentHandler>(&mut self, handler: &mut H) -> Result<(), H::Error> {
        while self.levels.len() > 1 {
            self.levels.pop();
            handler.on_leave(None)?;
        }
        Ok(())
    }

    fn leave_to<H: IndentHandler>(
        &mut self,
        width: usize,
        line: &LogicalLine,
        handler: &mut H,
    ) -> Result<(), H::Error> {
        while self.levels.len() > 1 && self.current_width() > width {
            self.levels.pop();
            log::trace!("line {}: leave to level {}", line.line, self.current_width());
            let following = (self.current_width() == width).then_some(line);
            handler.on_leave(following)?;
        }

        if self.current_width() != width {
            return Err(LexerError::new(
                format!(
                    "Inconsistent indentation: {width} columns of indentation does not match any outer level"
                ),
                line.line,
            )
            .into());
        }
        Ok(())
    }

    /// The first indented line decides whether the document uses tabs or
    /// spaces. Every later indentation must use only that character.
    fn check_indent_char(&mut self, line: &LogicalLine) -> Result<(), LexerError> {
        let mut chars = line.indent.chars();
        let Some(first) = chars.next() else {
            return Ok(());
        };

        let expected = *self.indent_char.get_or_insert(first);
        if first != expected || chars.any(|c| c != expected) {
            return Err(LexerError::new(
                format!(
                    "Inconsistent indentation character: the document is indented with {}",
                    describe(expected)
                ),
                line.line,
            ));
        }
        Ok(())
    }

    /// Width of the line that opened the current opaque level, if any.
    /// Lines deeper than this are captured verbatim.
    pub fn opaque_base(&self) -> Option<usize> {
        if !self.top().opaque {
            return None;
        }
        self.levels
            .len()
            .checked_sub(2)
            .map(|parent| self.levels[parent].width)
    }

    fn top(&self) -> &Level {
        // The root level is never popped.
        &self.levels[self.levels.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Level {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }
}

fn describe(c: char) -> &'static str {
    if c == '\t' {
        "tabs"
    } else {
        "spaces"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LineScanner;
    use pretty_assertions::assert_eq;

    /// Records events as strings; opens an opaque level after `-#` lines.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        last: String,
    }

    impl IndentHandler for Recorder {
        type Error = LexerError;

        fn on_enter(&mut self, line: &LogicalLine) -> Result<bool, LexerError> {
            self.events.push(format!("enter {}", line.line));
            Ok(self.last.starts_with("-#"))
        }

        fn on_leave(&mut self, following: Option<&LogicalLine>) -> Result<(), LexerError> {
            match following {
                Some(line) => self.events.push(format!("leave before {}", line.text)),
                None => self.events.push("leave".into()),
            }
            Ok(())
        }
    }

    fn run(source: &str) -> Result<(Vec<String>, Vec<String>), LexerError> {
        let mut scanner = LineScanner::new(source);
        let mut tracker = IndentTracker::new();
        let mut recorder = Recorder::default();
        let mut kinds = Vec::new();

        while let Some(line) = scanner.next_line() {
            let kind = match tracker.process(&line, &mut recorder)? {
                Indented::Blank => "blank".to_string(),
                Indented::Opaque { text } => format!("opaque {text}"),
                Indented::Structural { text, width } => {
                    recorder.last = text.to_string();
                    format!("{width} {text}")
                }
            };
            kinds.push(kind);
        }
        tracker.finish(&mut recorder)?;
        Ok((kinds, recorder.events))
    }

    // =========================================================================
    // Levels
    // =========================================================================

    #[test]
    fn test_flat_lines() {
        let (kinds, events) = run("a\nb").unwrap();
        assert_eq!(kinds, vec!["0 a", "0 b"]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_enter_and_finish() {
        let (kinds, events) = run("a\n  b\n    c").unwrap();
        assert_eq!(kinds, vec!["0 a", "2 b", "4 c"]);
        assert_eq!(events, vec!["enter 2", "enter 3", "leave", "leave"]);
    }

    #[test]
    fn test_multi_level_dedent_reports_following_once() {
        let (_, events) = run("a\n  b\n    c\nd").unwrap();
        assert_eq!(
            events,
            vec!["enter 2", "enter 3", "leave", "leave before d"]
        );
    }

    #[test]
    fn test_blank_lines_do_not_change_levels() {
        let (kinds, events) = run("a\n\n  b\n\nc").unwrap();
        assert_eq!(kinds, vec!["0 a", "blank", "2 b", "blank", "0 c"]);
        assert_eq!(events, vec!["enter 3", "leave before c"]);
    }

    #[test]
    fn test_widths_are_free_per_level() {
        let (kinds, _) = run("a\n    b\n      c\n    d").unwrap();
        assert_eq!(kinds, vec!["0 a", "4 b", "6 c", "4 d"]);
    }

    #[test]
    fn test_tabs() {
        let (kinds, _) = run("a\n\tb\n\t\tc").unwrap();
        assert_eq!(kinds, vec!["0 a", "1 b", "2 c"]);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_unmatched_dedent() {
        let err = run("a\n    b\n  c").unwrap_err();
        assert!(err.message.contains("Inconsistent indentation"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_mixed_characters_across_lines() {
        let err = run("a\n  b\nc\n\td").unwrap_err();
        assert!(err.message.contains("Inconsistent indentation character"));
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_mixed_characters_in_one_line() {
        let err = run("a\n \tb").unwrap_err();
        assert!(err.message.contains("Inconsistent indentation character"));
        assert_eq!(err.line, 2);
    }

    // =========================================================================
    // Opaque levels
    // =========================================================================

    #[test]
    fn test_opaque_level_captures_deeper_lines() {
        let (kinds, events) = run("-# note\n  foo\n      bar\n   baz\n%p").unwrap();
        assert_eq!(
            kinds,
            vec!["0 -# note", "opaque foo", "opaque bar", "opaque baz", "0 %p"]
        );
        assert_eq!(events, vec!["enter 2", "leave before %p"]);
    }

    #[test]
    fn test_opaque_lines_skip_character_check() {
        let (kinds, _) = run("-#\n  a\n \t b\nc").unwrap();
        assert_eq!(kinds, vec!["0 -#", "opaque a", "opaque b", "0 c"]);
    }
}
