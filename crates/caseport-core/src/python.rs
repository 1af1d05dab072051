//! Python source parsing
//!
//! Test modules are parsed with tree-sitter. [`parse_module`] returns the
//! module docstring, its `pytestmark` marks and the top-level functions and
//! classes with their docstrings and rendered decorators.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::error::CaseportError;
use crate::source_gen;

/// A function or method definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    /// 1-indexed line of the `def` keyword
    pub line: usize,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
    pub is_async: bool,
}

/// A class definition with its directly defined methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub line: usize,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
    pub methods: Vec<FunctionDef>,
}

/// A top-level definition, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Function(FunctionDef),
    Class(ClassDef),
}

/// What the collector needs from one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSource {
    pub docstring: Option<String>,
    /// Rendered items of the module-level `pytestmark` assignment
    pub marks: Vec<String>,
    pub definitions: Vec<Definition>,
}

/// Parse Python source text
///
/// Any syntax error fails the whole file, reported at the first error
/// node's position.
pub fn parse_module(path: &Path, source: &str) -> Result<ModuleSource, CaseportError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| syntax_error(path, 1, 1, format!("failed to load grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| syntax_error(path, 1, 1, "parser produced no tree"))?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, column, message) = match first_error(root) {
            Some(node) if node.is_missing() => {
                let pos = node.start_position();
                (pos.row + 1, pos.column + 1, format!("missing '{}'", node.kind()))
            }
            Some(node) => {
                let pos = node.start_position();
                (pos.row + 1, pos.column + 1, "invalid syntax".to_string())
            }
            None => (1, 1, "invalid syntax".to_string()),
        };
        return Err(syntax_error(path, line, column, message));
    }

    let mut module = ModuleSource {
        docstring: docstring_of(root, source),
        ..Default::default()
    };

    for node in named_children(root) {
        match node.kind() {
            "function_definition" => {
                module
                    .definitions
                    .push(Definition::Function(function_def(node, Vec::new(), source)));
            }
            "class_definition" => {
                module
                    .definitions
                    .push(Definition::Class(class_def(node, Vec::new(), source)));
            }
            "decorated_definition" => {
                let decorators = decorators_of(node, source);
                match node.child_by_field_name("definition") {
                    Some(def) if def.kind() == "function_definition" => module
                        .definitions
                        .push(Definition::Function(function_def(def, decorators, source))),
                    Some(def) if def.kind() == "class_definition" => module
                        .definitions
                        .push(Definition::Class(class_def(def, decorators, source))),
                    _ => {}
                }
            }
            "expression_statement" => {
                if let Some(marks) = pytestmark(node, source) {
                    module.marks = marks;
                }
            }
            _ => {}
        }
    }

    Ok(module)
}

fn syntax_error(path: &Path, line: usize, column: usize, message: impl Into<String>) -> CaseportError {
    CaseportError::Syntax {
        path: path.to_path_buf(),
        line,
        column,
        message: message.into(),
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

/// Source text covered by a node
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Named children, skipping comments
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// All children including punctuation, skipping comments
pub(crate) fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn function_def(node: Node<'_>, decorators: Vec<String>, source: &str) -> FunctionDef {
    FunctionDef {
        name: node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default(),
        line: node.start_position().row + 1,
        docstring: node
            .child_by_field_name("body")
            .and_then(|body| docstring_of(body, source)),
        decorators,
        is_async: all_children(node).iter().any(|c| c.kind() == "async"),
    }
}

fn class_def(node: Node<'_>, decorators: Vec<String>, source: &str) -> ClassDef {
    let body = node.child_by_field_name("body");
    let mut methods = Vec::new();

    for child in body.map(named_children).unwrap_or_default() {
        match child.kind() {
            "function_definition" => methods.push(function_def(child, Vec::new(), source)),
            "decorated_definition" => {
                if let Some(def) = child
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition")
                {
                    methods.push(function_def(def, decorators_of(child, source), source));
                }
            }
            _ => {}
        }
    }

    ClassDef {
        name: node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default(),
        line: node.start_position().row + 1,
        docstring: body.and_then(|b| docstring_of(b, source)),
        decorators,
        methods,
    }
}

fn decorators_of(node: Node<'_>, source: &str) -> Vec<String> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "decorator")
        .filter_map(|decorator| named_children(decorator).into_iter().next())
        .map(|expr| source_gen::render(expr, source))
        .collect()
}

/// Items of a `pytestmark = ...` statement, rendered
fn pytestmark(statement: Node<'_>, source: &str) -> Option<Vec<String>> {
    let assignment = named_children(statement)
        .into_iter()
        .find(|n| n.kind() == "assignment")?;
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" || node_text(left, source) != "pytestmark" {
        return None;
    }
    let right = assignment.child_by_field_name("right")?;

    let items = match right.kind() {
        "list" | "tuple" | "expression_list" => named_children(right),
        _ => vec![right],
    };
    Some(
        items
            .into_iter()
            .map(|item| source_gen::render(item, source))
            .collect(),
    )
}

/// Cleaned docstring of a module or block
///
/// Only a first statement that is a plain string literal counts, possibly
/// implicitly concatenated. Byte strings and f-strings are not docstrings.
fn docstring_of(body: Node<'_>, source: &str) -> Option<String> {
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(first).into_iter().next()?;

    let parts = match expr.kind() {
        "string" => vec![expr],
        "concatenated_string" => named_children(expr),
        _ => return None,
    };

    let mut doc = String::new();
    for part in parts {
        let literal = StringLiteral::split(node_text(part, source))?;
        if literal.is_bytes() || literal.is_format() {
            return None;
        }
        doc.push_str(&literal.decode_str());
    }
    Some(cleandoc(&doc))
}

/// A string literal split into prefix, quote and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StringLiteral<'a> {
    pub prefix: &'a str,
    pub body: &'a str,
}

impl<'a> StringLiteral<'a> {
    pub fn split(text: &'a str) -> Option<Self> {
        let quote_at = text.find(['\'', '"'])?;
        let (prefix, rest) = text.split_at(quote_at);
        let quote = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
            &rest[..3]
        } else {
            &rest[..1]
        };
        let body = rest.strip_prefix(quote)?.strip_suffix(quote)?;
        Some(Self { prefix, body })
    }

    fn has_prefix(&self, ch: char) -> bool {
        self.prefix.chars().any(|c| c.eq_ignore_ascii_case(&ch))
    }

    pub fn is_raw(&self) -> bool {
        self.has_prefix('r')
    }

    pub fn is_bytes(&self) -> bool {
        self.has_prefix('b')
    }

    pub fn is_format(&self) -> bool {
        self.has_prefix('f')
    }

    pub fn is_unicode(&self) -> bool {
        self.has_prefix('u')
    }

    pub fn decode_str(&self) -> String {
        decode_str(self.body, self.is_raw())
    }

    pub fn decode_bytes(&self) -> Vec<u8> {
        if self.is_raw() {
            return self.body.as_bytes().to_vec();
        }
        let mut out = Vec::with_capacity(self.body.len());
        let mut chars = self.body.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                let mut buf = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                continue;
            }
            match chars.next() {
                Some('x') => {
                    let hex: String = (0..2).filter_map(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
                    match u8::from_str_radix(&hex, 16) {
                        Ok(b) if hex.len() == 2 => out.push(b),
                        _ => {
                            out.extend_from_slice(b"\\x");
                            out.extend_from_slice(hex.as_bytes());
                        }
                    }
                }
                Some(c @ '0'..='7') => out.push(octal_escape(c, &mut chars) as u8),
                Some('\n') => {}
                Some(c) => match simple_escape(c) {
                    Some(e) => out.push(e as u8),
                    None => {
                        out.push(b'\\');
                        let mut buf = [0; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                },
                None => out.push(b'\\'),
            }
        }
        out
    }
}

fn simple_escape(c: char) -> Option<char> {
    Some(match c {
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'a' => '\u{7}',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        _ => return None,
    })
}

fn octal_escape(first: char, chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u32 {
    let mut value = first.to_digit(8).unwrap_or(0);
    for _ in 0..2 {
        match chars.next_if(|c| c.is_digit(8)) {
            Some(c) => value = value * 8 + c.to_digit(8).unwrap_or(0),
            None => break,
        }
    }
    value
}

/// Decode the escape sequences of a `str` literal body
pub(crate) fn decode_str(body: &str, raw: bool) -> String {
    if raw {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        let (digits, is_hex) = match next {
            'x' => (2, true),
            'u' => (4, true),
            'U' => (8, true),
            _ => (0, false),
        };
        if is_hex {
            let hex: String = (0..digits)
                .filter_map(|_| chars.next_if(char::is_ascii_hexdigit))
                .collect();
            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(c) if hex.len() == digits => out.push(c),
                _ => {
                    out.push('\\');
                    out.push(next);
                    out.push_str(&hex);
                }
            }
            continue;
        }
        match next {
            '\n' => {}
            '0'..='7' => {
                let value = octal_escape(next, &mut chars);
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            c => match simple_escape(c) {
                Some(e) => out.push(e),
                None => {
                    // Unknown escapes such as \N{...} stay as written
                    out.push('\\');
                    out.push(c);
                }
            },
        }
    }
    out
}

/// Clean up docstring indentation
///
/// Tabs are expanded, the first line loses its leading whitespace, the
/// common indentation of the remaining lines is removed, and leading and
/// trailing empty lines are dropped.
pub fn cleandoc(doc: &str) -> String {
    let mut lines: Vec<String> = doc.split('\n').map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let spaces = 8 - (col % 8);
            out.extend(std::iter::repeat_n(' ', spaces));
            col += spaces;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}
