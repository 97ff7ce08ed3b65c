//! Document parser for Haml.
//!
//! Drives the line scanner and indentation tracker from `haml-lexer` one
//! logical line at a time. Indentation events push and pop a stack of open
//! nodes; each non-blank line is dispatched on its leading symbol to exactly
//! one node kind.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Doctype, Document, HamlComment, HtmlComment, Node, Script, TrailingContent};
use crate::element;
use crate::filter::FilterParser;
use crate::registry::{self, FilterRegistry};
use crate::ParseError;
use haml_lexer::{multiline, IndentHandler, IndentTracker, Indented, LineScanner, LogicalLine};

const DOCTYPE_PREFIX: char = '!';
const ELEMENT_PREFIX: char = '%';
const SCRIPT_PREFIX: char = '=';
const COMMENT_PREFIX: char = '/';
const SILENT_SCRIPT_PREFIX: char = '-';
const DIV_ID_PREFIX: char = '#';
const DIV_CLASS_PREFIX: char = '.';
const FILTER_PREFIX: char = ':';
const ESCAPE_PREFIX: char = '\\';

const MID_BLOCK_KEYWORDS: &[&str] = &["else", "elsif", "rescue", "ensure", "end", "when"];

/// Leading keyword of a line. Group 1 is a mid-block keyword; group 2 a block
/// starter, possibly on the right of an assignment (`- x = if foo`).
static BLOCK_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^-?\s*(?:(else|elsif|rescue|ensure|end|when)|(?:\w+(?:,\s*\w+)*\s*=\s*)?(if|begin|case|unless))\b",
    )
    .expect("block keyword pattern is valid")
});

/// Haml document parser.
///
/// Holds only configuration; every call to [`Parser::parse_str`] owns its
/// own scanner, tracker and tree, so a `Parser` can be shared freely.
#[derive(Debug, Clone)]
pub struct Parser<'r> {
    filters: &'r FilterRegistry,
    file: Option<String>,
}

impl Parser<'static> {
    /// Parse source with the built-in filters.
    pub fn parse(source: &str) -> Result<Document, ParseError> {
        Parser::new(registry::builtins()).parse_str(source)
    }
}

impl<'r> Parser<'r> {
    pub fn new(filters: &'r FilterRegistry) -> Self {
        Self {
            filters,
            file: None,
        }
    }

    /// Name the source in error messages.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn parse_str(&self, source: &str) -> Result<Document, ParseError> {
        log::debug!("parsing {}", self.file.as_deref().unwrap_or("<string>"));
        let doc = Session::new(source, self.filters).run().map_err(|mut e| {
            e.file.clone_from(&self.file);
            e
        })?;
        log::debug!(
            "parsed {} top-level nodes from {} lines",
            doc.children.len(),
            doc.line_count
        );
        Ok(doc)
    }
}

/// State of one parse.
struct Session<'s, 'r> {
    scanner: LineScanner<'s>,
    tracker: IndentTracker,
    tree: Tree,
    filter: FilterParser,
    filters: &'r FilterRegistry,
}

impl<'s, 'r> Session<'s, 'r> {
    fn new(source: &'s str, filters: &'r FilterRegistry) -> Self {
        Self {
            scanner: LineScanner::new(source),
            tracker: IndentTracker::new(),
            tree: Tree::default(),
            filter: FilterParser::new(),
            filters,
        }
    }

    fn run(mut self) -> Result<Document, ParseError> {
        while let Some(line) = self.next_line() {
            log::trace!("line {}: {:?}", line.line, line.text);

            if self.filter.is_collecting() && !self.tree.in_haml_comment() {
                if let Some(node) = self.filter.append(&line, self.filters)? {
                    self.tree.current().push(node);
                }
            }
            if !self.filter.is_collecting() {
                self.parse_line(&line)?;
            }
        }

        if let Some(node) = self.filter.finish(self.filters)? {
            self.tree.current().push(node);
        }
        self.tracker.finish(&mut self.tree)?;

        Ok(Document {
            children: self.tree.root,
            line_count: self.scanner.total_lines(),
        })
    }

    /// Filter and Haml comment bodies are read verbatim; everything else as
    /// logical lines. The first line after `-#` may open the comment's body,
    /// so it is read as body text too when it is deeper.
    fn next_line(&mut self) -> Option<LogicalLine> {
        let base = self
            .filter
            .base_width()
            .or_else(|| self.tracker.opaque_base())
            .or_else(|| {
                matches!(self.tree.last_child(), Some(Node::HamlComment(_)))
                    .then(|| self.tracker.current_width())
            });
        match base {
            Some(base) => self.scanner.next_body_line(base),
            None => self.scanner.next_line(),
        }
    }

    fn parse_line(&mut self, line: &LogicalLine) -> Result<(), ParseError> {
        match self.tracker.process(line, &mut self.tree)? {
            Indented::Blank => Ok(()),
            Indented::Opaque { text } => {
                self.tree.current().push(Node::text(text, line.line));
                Ok(())
            }
            Indented::Structural { text, width } => self.dispatch(text, width, line.line),
        }
    }

    fn dispatch(&mut self, text: &str, width: usize, line: usize) -> Result<(), ParseError> {
        let Some(first) = text.chars().next() else {
            return Ok(());
        };

        match first {
            ELEMENT_PREFIX => {
                let el = element::parse(text, line, &mut self.scanner)?;
                self.tree.current().push(Node::Element(el));
                Ok(())
            }
            DOCTYPE_PREFIX => self.parse_doctype(text, line),
            COMMENT_PREFIX => {
                self.tree.current().push(Node::HtmlComment(HtmlComment {
                    text: text[1..].trim().to_string(),
                    children: Vec::new(),
                    line,
                }));
                Ok(())
            }
            SCRIPT_PREFIX => {
                let code = self.read_code(&text[1..])?;
                self.tree.current().push(Node::Script(script(code, line)));
                Ok(())
            }
            SILENT_SCRIPT_PREFIX => self.parse_silent_script(text, line),
            DIV_ID_PREFIX if text.starts_with("#{") => self.parse_plain(text, line),
            DIV_ID_PREFIX | DIV_CLASS_PREFIX => {
                self.dispatch(&format!("{ELEMENT_PREFIX}{}{text}", element::DEFAULT_TAG), width, line)
            }
            FILTER_PREFIX => self.filter.start(text, width, line),
            ESCAPE_PREFIX => self.parse_plain(&text[1..], line),
            _ => self.parse_plain(text, line),
        }
    }

    fn parse_doctype(&mut self, text: &str, line: usize) -> Result<(), ParseError> {
        let Some(rest) = text.strip_prefix("!!!") else {
            return Err(self.error("Illegal doctype declaration"));
        };
        self.tree.current().push(Node::Doctype(Doctype {
            text: rest.trim().to_string(),
            line,
        }));
        Ok(())
    }

    fn parse_silent_script(&mut self, text: &str, line: usize) -> Result<(), ParseError> {
        if text.starts_with("-#") {
            self.tree.current().push(Node::HamlComment(HamlComment {
                children: Vec::new(),
                line,
            }));
            return Ok(());
        }
        let code = self.read_code(&text[1..])?;
        self.tree.current().push(Node::SilentScript(script(code, line)));
        Ok(())
    }

    fn parse_plain(&mut self, text: &str, line: usize) -> Result<(), ParseError> {
        self.tree.current().push(Node::text(text, line));
        Ok(())
    }

    /// Ruby code following a script prefix, with continuation lines merged.
    fn read_code(&mut self, after_prefix: &str) -> Result<String, ParseError> {
        let code = after_prefix.trim();
        if code.is_empty() {
            return Err(self.error("No Ruby code to evaluate"));
        }
        Ok(multiline::read(&mut self.scanner, code)?.code)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.scanner.line_number())
    }
}

fn script(code: String, line: usize) -> Script {
    Script {
        code,
        mid_block_keyword: false,
        children: Vec::new(),
        line,
    }
}

/// The leading block keyword of `text`, if any.
fn block_keyword(text: &str) -> Option<&str> {
    let caps = BLOCK_KEYWORD.captures(text)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

fn is_mid_block_keyword(text: &str) -> bool {
    block_keyword(text).is_some_and(|kw| MID_BLOCK_KEYWORDS.contains(&kw))
}

/// Root children plus the stack of currently open nodes.
///
/// An open node is detached from its parent while lines are appended to it
/// and re-attached as its parent's last child when its block closes, which
/// keeps document order.
#[derive(Default)]
struct Tree {
    root: Vec<Node>,
    open: Vec<Node>,
}

impl Tree {
    /// Children of the innermost open node.
    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut().and_then(Node::children_mut) {
            Some(children) => children,
            None => &mut self.root,
        }
    }

    /// Most recently added node at the current nesting level.
    fn last_child(&self) -> Option<&Node> {
        match self.open.last().and_then(Node::children) {
            Some(children) => children.last(),
            None => self.root.last(),
        }
    }

    fn in_haml_comment(&self) -> bool {
        matches!(self.open.last(), Some(Node::HamlComment(_)))
    }
}

impl IndentHandler for Tree {
    type Error = ParseError;

    fn on_enter(&mut self, line: &LogicalLine) -> Result<bool, ParseError> {
        let at = line.last_line();
        let Some(node) = self.current().pop() else {
            return Err(ParseError::new(
                "Indenting at the beginning of the document is illegal.",
                at,
            ));
        };

        match &node {
            Node::Element(el) if el.self_closing => {
                return Err(ParseError::new(
                    "Illegal nesting: nesting within a self-closing tag is illegal.",
                    at,
                ));
            }
            Node::Element(el) if el.trailing != TrailingContent::None => {
                return Err(ParseError::new(
                    format!(
                        "Illegal nesting: content can't be both given on the same line as %{} and nested within it.",
                        el.tag
                    ),
                    at,
                ));
            }
            other if other.children().is_none() => {
                return Err(ParseError::new(
                    format!("Illegal nesting: nesting within {} is illegal.", other.kind()),
                    at,
                ));
            }
            _ => {}
        }

        let opaque = matches!(node, Node::HamlComment(_));
        self.open.push(node);
        Ok(opaque)
    }

    fn on_leave(&mut self, following: Option<&LogicalLine>) -> Result<(), ParseError> {
        let Some(mut node) = self.open.pop() else {
            return Ok(());
        };
        if let Node::Script(s) | Node::SilentScript(s) = &mut node {
            s.mid_block_keyword = following.is_some_and(|l| is_mid_block_keyword(&l.text));
        }
        self.current().push(node);
        Ok(())
    }
}
