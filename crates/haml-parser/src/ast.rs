//! Abstract Syntax Tree for Haml templates.
//!
//! Every node records the 1-based source line it was opened on so the code
//! generator can keep generated lines aligned with the template.

/// A complete parsed template (the root of the tree).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub children: Vec<Node>,
    /// Physical lines in the source, blank ones included.
    pub line_count: usize,
}

/// A node below the root. Children are owned by their parent, in document
/// order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `!!! 5`
    Doctype(Doctype),

    /// `/ comment`, rendered as an HTML comment.
    HtmlComment(HtmlComment),

    /// `-# comment`, rendered as nothing. Nested lines are kept as text.
    HamlComment(HamlComment),

    /// Plain text content (may contain `#{}` interpolation).
    Text(Text),

    /// `%tag.class#id{attrs}`
    Element(Element),

    /// `= code`, output of a Ruby expression.
    Script(Script),

    /// `- code`, Ruby evaluated for its side effects or control flow.
    SilentScript(Script),

    /// The result of a `:filter` block.
    FilterOutput(FilterOutput),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Doctype {
    /// Text after `!!!`, trimmed. Empty for the default doctype.
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlComment {
    pub text: String,
    pub children: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HamlComment {
    /// Nested lines, each captured verbatim as a [`Node::Text`].
    pub children: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub line: usize,
}

/// What followed the tag declaration on its own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingContent {
    #[default]
    None,
    /// `%p= code`; the script is the element's first child.
    Script,
    /// `%p text`; the text is the element's first child.
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// `.class` shorthand, in order of appearance.
    pub classes: Vec<String>,
    /// `#id` shorthand, in order of appearance.
    pub ids: Vec<String>,
    /// Raw Ruby between the `{` `}` of the attributes block.
    pub attributes: Option<String>,
    /// `<` marker: strip whitespace inside the element.
    pub nuke_inner_whitespace: bool,
    /// `>` marker: strip whitespace around the element.
    pub nuke_outer_whitespace: bool,
    /// `/` marker: no content allowed.
    pub self_closing: bool,
    pub trailing: TrailingContent,
    pub children: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub code: String,
    /// Set once the block closes: the next sibling line starts with a
    /// continuation keyword (`else`, `elsif`, `when`, `rescue`, `ensure`,
    /// `end`), so no terminator must be emitted for this block.
    pub mid_block_keyword: bool,
    pub children: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    pub name: String,
    pub fragment: Fragment,
    pub line: usize,
}

/// Opaque output of a filter transform, consumed by the code generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Literal output.
    Static(String),
    /// Ruby code to run.
    Code(String),
    /// Fragments in order.
    Multi(Vec<Fragment>),
    /// A line break in the generated code.
    Newline,
}

impl Node {
    /// Source line the node was opened on.
    pub fn line(&self) -> usize {
        match self {
            Node::Doctype(n) => n.line,
            Node::HtmlComment(n) => n.line,
            Node::HamlComment(n) => n.line,
            Node::Text(n) => n.line,
            Node::Element(n) => n.line,
            Node::Script(n) | Node::SilentScript(n) => n.line,
            Node::FilterOutput(n) => n.line,
        }
    }

    /// Children of nodes that can contain nested lines.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::HtmlComment(n) => Some(&n.children),
            Node::HamlComment(n) => Some(&n.children),
            Node::Element(n) => Some(&n.children),
            Node::Script(n) | Node::SilentScript(n) => Some(&n.children),
            Node::Doctype(_) | Node::Text(_) | Node::FilterOutput(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::HtmlComment(n) => Some(&mut n.children),
            Node::HamlComment(n) => Some(&mut n.children),
            Node::Element(n) => Some(&mut n.children),
            Node::Script(n) | Node::SilentScript(n) => Some(&mut n.children),
            Node::Doctype(_) | Node::Text(_) | Node::FilterOutput(_) => None,
        }
    }

    /// Short name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Doctype(_) => "doctype",
            Node::HtmlComment(_) => "comment",
            Node::HamlComment(_) => "Haml comment",
            Node::Text(_) => "plain text",
            Node::Element(_) => "element",
            Node::Script(_) => "script",
            Node::SilentScript(_) => "silent script",
            Node::FilterOutput(_) => "filter",
        }
    }

    pub(crate) fn text(content: impl Into<String>, line: usize) -> Node {
        Node::Text(Text {
            content: content.into(),
            line,
        })
    }
}
