use clap::{Parser as ClapParser, Subcommand};
use haml_parser::ast::{Fragment, Node};
use haml_parser::{Document, Parser};
use std::path::Path;

#[derive(ClapParser)]
#[command(name = "haml")]
#[command(about = "Haml template parser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a .haml file for syntax errors
    Check {
        /// Input .haml file
        path: String,
    },

    /// Print the parsed tree of a .haml file
    Ast {
        /// Input .haml file
        path: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { path } => cmd_check(&path),
        Command::Ast { path } => cmd_ast(&path),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_file(path: &str) -> Document {
    let source = read_source(path);
    log::info!("read {} bytes from {path}", source.len());

    match Parser::new(haml_parser::registry::builtins())
        .with_file(path)
        .parse_str(&source)
    {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str) {
    let doc = parse_file(path);
    eprintln!("OK: {path} ({} lines)", doc.line_count);
}

fn cmd_ast(path: &str) {
    let doc = parse_file(path);
    let mut out = String::new();
    for node in &doc.children {
        render(node, 0, &mut out);
    }
    print!("{out}");
}

/// One node per line: `<line>: <indent><summary>`.
fn render(node: &Node, depth: usize, out: &mut String) {
    let summary = match node {
        Node::Doctype(d) => format!("doctype {:?}", d.text),
        Node::HtmlComment(c) => format!("comment {:?}", c.text),
        Node::HamlComment(_) => "haml-comment".to_string(),
        Node::Text(t) => format!("text {:?}", t.content),
        Node::Element(el) => {
            let mut s = format!("%{}", el.tag);
            for id in &el.ids {
                s.push_str(&format!("#{id}"));
            }
            for class in &el.classes {
                s.push_str(&format!(".{class}"));
            }
            if let Some(attrs) = &el.attributes {
                s.push_str(&format!("{{{attrs}}}"));
            }
            if el.nuke_inner_whitespace {
                s.push('<');
            }
            if el.nuke_outer_whitespace {
                s.push('>');
            }
            if el.self_closing {
                s.push('/');
            }
            s
        }
        Node::Script(s) => format!("= {:?}{}", s.code, mid_block(s.mid_block_keyword)),
        Node::SilentScript(s) => format!("- {:?}{}", s.code, mid_block(s.mid_block_keyword)),
        Node::FilterOutput(f) => format!(":{} {}", f.name, fragment(&f.fragment)),
    };

    out.push_str(&format!("{:>4}: {}{summary}\n", node.line(), "  ".repeat(depth)));
    for child in node.children().unwrap_or_default() {
        render(child, depth + 1, out);
    }
}

fn mid_block(flag: bool) -> &'static str {
    if flag {
        " (mid-block)"
    } else {
        ""
    }
}

fn fragment(f: &Fragment) -> String {
    match f {
        Fragment::Static(s) => format!("static {s:?}"),
        Fragment::Code(c) => format!("code {c:?}"),
        Fragment::Multi(parts) => {
            let parts: Vec<String> = parts.iter().map(fragment).collect();
            format!("[{}]", parts.join(", "))
        }
        Fragment::Newline => "newline".to_string(),
    }
}
