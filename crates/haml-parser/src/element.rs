//! Element line parser.
//!
//! Grammar of an element line, in order:
//!
//! ```text
//! %tag .class #id {ruby attributes} <> / = code
//!                                         | plain text
//! ```
//!
//! The attributes block is balanced with the quote- and interpolation-aware
//! scanner from `haml-lexer`, pulling further physical lines while it stays
//! open.

use crate::ast::{Element, Node, Script, TrailingContent};
use crate::ParseError;
use haml_lexer::{code, multiline, LineScanner};

/// Tag used when only `.class` / `#id` shorthand is given.
pub const DEFAULT_TAG: &str = "div";

/// Parse an element line. `text` starts with `%`.
pub fn parse(text: &str, line: usize, scanner: &mut LineScanner<'_>) -> Result<Element, ParseError> {
    let rest = text.strip_prefix('%').unwrap_or(text);

    // Stage 1: tag name and shorthand
    let (tag, mut rest) = take_name(rest);
    let mut classes = Vec::new();
    let mut ids = Vec::new();

    while let Some(prefix) = rest.chars().next().filter(|c| *c == '.' || *c == '#') {
        let (name, after) = take_name(&rest[1..]);
        if name.is_empty() {
            return Err(ParseError::new(
                "Illegal element: classes and ids must have values.",
                scanner.line_number(),
            ));
        }
        if prefix == '.' {
            classes.push(name.to_string());
        } else {
            ids.push(name.to_string());
        }
        rest = after;
    }

    let tag = match (tag.is_empty(), classes.is_empty() && ids.is_empty()) {
        (false, _) => tag.to_string(),
        (true, false) => DEFAULT_TAG.to_string(),
        (true, true) => {
            return Err(ParseError::new(
                format!("Invalid element declaration: {text}"),
                scanner.line_number(),
            ))
        }
    };

    // Stage 2: attributes block, possibly spanning lines
    let (attributes, rest) = if rest.starts_with('{') {
        let (attrs, after) = parse_attributes(rest, scanner)?;
        (Some(attrs), after)
    } else {
        (None, rest.to_string())
    };

    // Stage 3: whitespace removal and self-closing markers
    let mut rest = rest.as_str();
    let mut nuke_inner_whitespace = false;
    let mut nuke_outer_whitespace = false;
    loop {
        if !nuke_inner_whitespace && rest.starts_with('<') {
            nuke_inner_whitespace = true;
        } else if !nuke_outer_whitespace && rest.starts_with('>') {
            nuke_outer_whitespace = true;
        } else {
            break;
        }
        rest = &rest[1..];
    }

    let self_closing = rest.starts_with('/');
    if self_closing {
        rest = &rest[1..];
        if !rest.trim().is_empty() {
            return Err(ParseError::new(
                "Self-closing tags can't have content.",
                scanner.line_number(),
            ));
        }
    }

    let mut element = Element {
        tag,
        classes,
        ids,
        attributes,
        nuke_inner_whitespace,
        nuke_outer_whitespace,
        self_closing,
        trailing: TrailingContent::None,
        children: Vec::new(),
        line,
    };

    // Stage 4: inline content
    if let Some(code) = rest.strip_prefix('=') {
        let code = code.trim();
        if code.is_empty() {
            return Err(ParseError::new(
                "No Ruby code to evaluate",
                scanner.line_number(),
            ));
        }
        let continuation = multiline::read(scanner, code)?;
        element.trailing = TrailingContent::Script;
        element.children.push(Node::Script(Script {
            code: continuation.code,
            mid_block_keyword: false,
            children: Vec::new(),
            line,
        }));
    } else if !rest.trim().is_empty() {
        element.trailing = TrailingContent::Plain;
        element.children.push(Node::text(rest.trim(), line));
    }

    Ok(element)
}

/// Split the attributes block off `rest`, which starts with `{`.
/// Returns the code between the braces and whatever follows the closing one.
fn parse_attributes(
    rest: &str,
    scanner: &mut LineScanner<'_>,
) -> Result<(String, String), ParseError> {
    let mut buf = rest.to_string();
    loop {
        if let Some(end) = code::matching_close(&buf) {
            let attrs = buf[1..end - 1].trim().to_string();
            return Ok((attrs, buf[end..].to_string()));
        }
        match scanner.next_physical() {
            Some(next) => {
                buf.push('\n');
                buf.push_str(next.trim());
            }
            None => {
                return Err(ParseError::new(
                    "Unmatched attributes delimiter",
                    scanner.line_number(),
                ))
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == ':'
}

fn take_name(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|&(_, c)| !is_name_char(c))
        .map_or(text.len(), |(i, _)| i);
    text.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Parse the first line of `source` as an element.
    fn element(source: &str) -> Element {
        try_element(source).unwrap()
    }

    fn try_element(source: &str) -> Result<Element, ParseError> {
        let mut scanner = LineScanner::new(source);
        let first = scanner.next_line().unwrap();
        parse(&first.text, first.line, &mut scanner)
    }

    fn child_text(el: &Element) -> &str {
        match &el.children[0] {
            Node::Text(t) => &t.content,
            other => panic!("Expected Text, got {other:?}"),
        }
    }

    fn child_code(el: &Element) -> &str {
        match &el.children[0] {
            Node::Script(s) => &s.code,
            other => panic!("Expected Script, got {other:?}"),
        }
    }

    // =========================================================================
    // Tag and shorthand
    // =========================================================================

    #[test]
    fn test_bare_tag() {
        let el = element("%div");
        assert_eq!(el.tag, "div");
        assert!(el.classes.is_empty());
        assert!(el.attributes.is_none());
        assert_eq!(el.trailing, TrailingContent::None);
        assert!(el.children.is_empty());
    }

    #[test]
    fn test_namespaced_and_hyphenated_tags() {
        assert_eq!(element("%fb:login-button").tag, "fb:login-button");
    }

    #[test]
    fn test_classes_and_ids() {
        let el = element("%span.foo.bar#main#alt");
        assert_eq!(el.tag, "span");
        assert_eq!(el.classes, vec!["foo", "bar"]);
        assert_eq!(el.ids, vec!["main", "alt"]);
    }

    #[test]
    fn test_shorthand_defaults_to_div() {
        let el = element("%.box");
        assert_eq!(el.tag, DEFAULT_TAG);
        assert_eq!(el.classes, vec!["box"]);
    }

    #[test]
    fn test_empty_declaration() {
        let err = try_element("%").unwrap_err();
        assert!(err.message.contains("Invalid element declaration"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_empty_class_name() {
        let err = try_element("%p. hello").unwrap_err();
        assert!(err.message.contains("classes and ids must have values"));
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    #[test]
    fn test_attributes() {
        let el = element(r#"%span{class: "x", "old" => 2} hello"#);
        assert_eq!(el.attributes.as_deref(), Some(r#"class: "x", "old" => 2"#));
        assert_eq!(child_text(&el), "hello");
    }

    #[test]
    fn test_nested_attributes() {
        let el = element("%span{data: {foo: 1, bar: 'baz'}} hello");
        assert_eq!(el.attributes.as_deref(), Some("data: {foo: 1, bar: 'baz'}"));
        assert_eq!(child_text(&el), "hello");
    }

    #[test]
    fn test_closing_brace_inside_string() {
        let el = element(r#"%span{title: "a}b"} hello"#);
        assert_eq!(el.attributes.as_deref(), Some(r#"title: "a}b""#));
        assert_eq!(child_text(&el), "hello");
    }

    #[test]
    fn test_closing_brace_inside_interpolation() {
        let el = element(r#"%span{data: "x#{ {a: 1}[:a] }y"} hello"#);
        assert_eq!(el.attributes.as_deref(), Some(r#"data: "x#{ {a: 1}[:a] }y""#));
    }

    #[test]
    fn test_multiline_attributes() {
        let mut scanner = LineScanner::new("%a{href: '/',\n   title: 'Home'} Home\n%br");
        let first = scanner.next_line().unwrap();
        let el = parse(&first.text, first.line, &mut scanner).unwrap();
        assert_eq!(el.attributes.as_deref(), Some("href: '/',\ntitle: 'Home'"));
        assert_eq!(child_text(&el), "Home");
        assert_eq!(scanner.line_number(), 2);
        assert_eq!(scanner.next_line().unwrap().text, "%br");
    }

    #[test]
    fn test_unmatched_attributes() {
        let err = try_element("%span{foo").unwrap_err();
        assert_eq!(err.message, "Unmatched attributes delimiter");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unmatched_attributes_reports_last_line() {
        let err = try_element("%span{foo,\n  bar").unwrap_err();
        assert_eq!(err.message, "Unmatched attributes delimiter");
        assert_eq!(err.line, 2);
    }

    // =========================================================================
    // Markers
    // =========================================================================

    #[test]
    fn test_self_closing() {
        let el = element("%br/");
        assert!(el.self_closing);
        assert!(el.children.is_empty());
    }

    #[test]
    fn test_self_closing_with_content() {
        let err = try_element("%br/ text").unwrap_err();
        assert!(err.message.contains("Self-closing tags can't have content"));
    }

    #[test]
    fn test_whitespace_markers() {
        let el = element("%img{href: x}>");
        assert!(el.nuke_outer_whitespace);
        assert!(!el.nuke_inner_whitespace);

        let el = element("%p<>= x");
        assert!(el.nuke_inner_whitespace);
        assert!(el.nuke_outer_whitespace);
        assert_eq!(child_code(&el), "x");
    }

    // =========================================================================
    // Inline content
    // =========================================================================

    #[test]
    fn test_inline_script() {
        let el = element("%span= 1");
        assert_eq!(el.trailing, TrailingContent::Script);
        assert_eq!(child_code(&el), "1");
    }

    #[test]
    fn test_inline_script_continuation() {
        let mut scanner = LineScanner::new("%p= link_to 'Home',\n  root_path\n%br");
        let first = scanner.next_line().unwrap();
        let el = parse(&first.text, first.line, &mut scanner).unwrap();
        assert_eq!(child_code(&el), "link_to 'Home',\n  root_path");
        assert_eq!(scanner.line_number(), 2);
    }

    #[test]
    fn test_empty_inline_script() {
        let err = try_element("%p=").unwrap_err();
        assert_eq!(err.message, "No Ruby code to evaluate");
    }

    #[test]
    fn test_inline_plain_text() {
        let el = element("%p   hello  world");
        assert_eq!(el.trailing, TrailingContent::Plain);
        assert_eq!(child_text(&el), "hello  world");
    }

    #[test]
    fn test_spaced_equals_is_text() {
        let el = element("%p = not code");
        assert_eq!(el.trailing, TrailingContent::Plain);
        assert_eq!(child_text(&el), "= not code");
    }
}
