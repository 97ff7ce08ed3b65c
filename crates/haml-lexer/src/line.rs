/// One parsed unit of input, possibly merged from several physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Leading indentation exactly as written (spaces or tabs).
    pub indent: String,
    /// The line content with indentation and trailing whitespace removed.
    pub text: String,
    /// 1-based number of the first physical line.
    pub line: usize,
    /// Number of physical lines merged into this one, at least 1.
    pub line_count: usize,
}

impl LogicalLine {
    /// Indentation width in characters. A tab counts as one column.
    pub fn width(&self) -> usize {
        self.indent.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of the last physical line covered by this logical line.
    pub fn last_line(&self) -> usize {
        self.line + self.line_count - 1
    }
}

/// Splits template source into logical lines with 1-based line numbers.
///
/// Every physical line is counted, blank ones included, so that line numbers
/// reported later always refer to the true position in the source. Lines
/// ending in ` |` are joined with the following ones (Haml multiline syntax).
pub struct LineScanner<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: split_lines(source),
            pos: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.lines.len()
    }

    /// Number of the last physical line consumed, 0 before the first read.
    pub fn line_number(&self) -> usize {
        self.pos
    }

    /// Total number of physical lines in the source.
    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Read the next logical line, merging pipe-continued physical lines.
    pub fn next_line(&mut self) -> Option<LogicalLine> {
        let raw = self.next_physical()?;
        Some(self.logical(raw))
    }

    /// Read the next line of a verbatim body nested deeper than `base`.
    ///
    /// A blank line or one indented deeper than `base` comes back exactly as
    /// written: no pipe merging, trailing whitespace kept. Any other line
    /// ends the body and is read as by [`LineScanner::next_line`].
    pub fn next_body_line(&mut self, base: usize) -> Option<LogicalLine> {
        let raw = self.next_physical()?;
        let (indent, text) = split_indent_raw(raw);
        if !text.is_empty() && indent.chars().count() <= base {
            return Some(self.logical(raw));
        }
        Some(LogicalLine {
            indent: indent.to_string(),
            text: text.to_string(),
            line: self.pos,
            line_count: 1,
        })
    }

    /// Build a logical line from `raw`, the physical line just consumed.
    fn logical(&mut self, raw: &str) -> LogicalLine {
        let line = self.pos;
        let (indent, text) = split_indent(raw);

        if !is_pipe_multiline(text) {
            return LogicalLine {
                indent: indent.to_string(),
                text: text.to_string(),
                line,
                line_count: 1,
            };
        }

        let mut merged = strip_pipe(text).to_string();
        let mut line_count = 1;
        while let Some(next) = self.peek_physical() {
            let (_, next_text) = split_indent(next);
            if !is_pipe_multiline(next_text) {
                break;
            }
            self.pos += 1;
            line_count += 1;
            merged.push_str(strip_pipe(next_text));
        }

        LogicalLine {
            indent: indent.to_string(),
            text: merged.trim_end().to_string(),
            line,
            line_count,
        }
    }

    /// Consume one raw physical line. Used by continuation readers that
    /// need to pull more text for a construct that spans several lines.
    pub fn next_physical(&mut self) -> Option<&'a str> {
        let raw = self.lines.get(self.pos).copied()?;
        self.pos += 1;
        Some(raw)
    }

    fn peek_physical(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }
}

/// Split on `\n`, `\r\n` and lone `\r`. A terminator at the very end does not
/// start another line.
fn split_lines(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&source[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&source[start..i]);
                i += 1;
                if i < bytes.len() && bytes[i] == b'\n' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < source.len() {
        lines.push(&source[start..]);
    }
    lines
}

/// Separate leading indentation from the content of a raw line.
pub fn split_indent(raw: &str) -> (&str, &str) {
    let (indent, content) = split_indent_raw(raw);
    (indent, content.trim_end())
}

fn split_indent_raw(raw: &str) -> (&str, &str) {
    let content = raw.trim_start_matches([' ', '\t']);
    raw.split_at(raw.len() - content.len())
}

fn is_pipe_multiline(text: &str) -> bool {
    text.len() >= 2 && text.ends_with('|') && text[..text.len() - 1].ends_with([' ', '\t'])
}

fn strip_pipe(text: &str) -> &str {
    &text[..text.len() - 1]
}
