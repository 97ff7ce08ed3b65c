//! Filter block collection.
//!
//! After a `:name` line, every following line indented deeper than it is
//! captured verbatim, trailing whitespace and ` |` endings included. When
//! indentation returns to the filter line's level (or input ends) the body,
//! minus its common indentation, is handed to the transform registered for
//! `name`. Unknown names are reported only then, so the body is always
//! consumed.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{FilterOutput, Node};
use crate::registry::FilterRegistry;
use crate::ParseError;
use haml_lexer::LogicalLine;

static FILTER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(\w+)$").expect("filter name pattern is valid"));

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Collecting(Block),
}

#[derive(Debug)]
struct Block {
    name: String,
    /// Width of the `:name` line. Body lines must be deeper.
    base_width: usize,
    /// Body lines with their indentation; blank lines are empty.
    lines: Vec<String>,
    line: usize,
}

#[derive(Debug, Default)]
pub struct FilterParser {
    state: State,
}

impl FilterParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, State::Collecting(_))
    }

    /// Width of the `:name` line of the block being collected. Only lines
    /// deeper than this belong to the body.
    pub fn base_width(&self) -> Option<usize> {
        match &self.state {
            State::Collecting(block) => Some(block.base_width),
            State::Idle => None,
        }
    }

    /// Begin collecting after a `:name` line at `base_width`.
    pub fn start(&mut self, text: &str, base_width: usize, line: usize) -> Result<(), ParseError> {
        let name = FILTER_NAME
            .captures(text)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ParseError::new(format!("Invalid filter name: {text}"), line))?;

        log::debug!("line {line}: start filter `{}`", name.as_str());
        self.state = State::Collecting(Block {
            name: name.as_str().to_string(),
            base_width,
            lines: Vec::new(),
            line,
        });
        Ok(())
    }

    /// Offer the next line to the block being collected.
    ///
    /// Returns `Some` with the filter's output when `line` closes the block;
    /// the line itself is then not consumed and must be parsed normally.
    pub fn append(
        &mut self,
        line: &LogicalLine,
        registry: &FilterRegistry,
    ) -> Result<Option<Node>, ParseError> {
        let State::Collecting(block) = &mut self.state else {
            return Ok(None);
        };

        if line.is_blank() {
            block.lines.push(String::new());
            return Ok(None);
        }

        let width = line.width();
        if width <= block.base_width {
            return self.finish(registry);
        }

        block.lines.push(format!("{}{}", line.indent, line.text));
        Ok(None)
    }

    /// Close the block being collected, if any, and run its transform.
    pub fn finish(&mut self, registry: &FilterRegistry) -> Result<Option<Node>, ParseError> {
        let State::Collecting(mut block) = std::mem::take(&mut self.state) else {
            return Ok(None);
        };

        while block.lines.last().is_some_and(|l| l.trim().is_empty()) {
            block.lines.pop();
        }
        let body = strip_common_indent(&block.lines);

        let filter = registry.lookup(&block.name).ok_or_else(|| {
            ParseError::new(format!("Filter not found: {}", block.name), block.line)
        })?;

        log::debug!(
            "line {}: finish filter `{}` ({} body lines)",
            block.line,
            block.name,
            block.lines.len()
        );
        let fragment = filter.compile(&body);
        Ok(Some(Node::FilterOutput(FilterOutput {
            name: block.name,
            fragment,
            line: block.line,
        })))
    }
}

/// Join `lines`, removing the indentation shared by every non-blank line.
fn strip_common_indent(lines: &[String]) -> String {
    let common = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ' || *c == '\t').count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.chars().skip(common).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
