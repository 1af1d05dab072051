//! Rendering Python expressions back to source text
//!
//! Decorators and marks are stored as text so that marker names can be
//! matched with a regex. The rendering is normalized: operators and
//! conditional expressions are parenthesized, literals are written the way
//! Python's `repr` writes them, and redundant parentheses are dropped.

use tree_sitter::Node;

use crate::python::{all_children, decode_str, named_children, node_text, StringLiteral};

/// Overflowing float literals are written with this exponent
const INFSTR: &str = "1e309";

/// Render an expression node as normalized source text
pub fn render(node: Node<'_>, source: &str) -> String {
    let mut generator = Generator {
        source,
        out: String::new(),
    };
    generator.visit(node);
    generator.out
}

struct Generator<'s> {
    source: &'s str,
    out: String,
}

impl<'s> Generator<'s> {
    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node_text(node, self.source)
    }

    fn visit_seq(&mut self, nodes: &[Node<'_>], separator: &str) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.write(separator);
            }
            self.visit(*node);
        }
    }

    fn visit_field(&mut self, node: Node<'_>, field: &str) {
        if let Some(child) = node.child_by_field_name(field) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" => self.write(self.text(node)),
            "attribute" => {
                self.visit_field(node, "object");
                self.write(".");
                self.visit_field(node, "attribute");
            }
            "call" => {
                self.visit_field(node, "function");
                self.write("(");
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    if arguments.kind() == "generator_expression" {
                        self.visit(arguments);
                    } else {
                        self.visit_seq(&named_children(arguments), ", ");
                    }
                }
                self.write(")");
            }
            "keyword_argument" => {
                self.visit_field(node, "name");
                self.write("=");
                self.visit_field(node, "value");
            }
            "list_splat" | "list_splat_pattern" => {
                self.write("*");
                self.visit_children(node);
            }
            "dictionary_splat" | "dictionary_splat_pattern" => {
                self.write("**");
                self.visit_children(node);
            }
            "parenthesized_expression" => self.visit_children(node),
            "integer" => {
                let literal = int_repr(self.text(node));
                self.write(&literal);
            }
            "float" => {
                let literal = float_literal_repr(self.text(node));
                self.write(&literal);
            }
            "true" => self.write("True"),
            "false" => self.write("False"),
            "none" => self.write("None"),
            "ellipsis" => self.write("..."),
            "string" => self.visit_strings(&[node]),
            "concatenated_string" => self.visit_strings(&named_children(node)),
            "list" | "list_pattern" => {
                self.write("[");
                self.visit_seq(&named_children(node), ", ");
                self.write("]");
            }
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
                let items = named_children(node);
                self.write("(");
                self.visit_seq(&items, ", ");
                if items.len() == 1 {
                    self.write(",");
                }
                self.write(")");
            }
            "set" => {
                self.write("{");
                self.visit_seq(&named_children(node), ", ");
                self.write("}");
            }
            "dictionary" => {
                self.write("{");
                self.visit_seq(&named_children(node), ", ");
                self.write("}");
            }
            "pair" => {
                self.visit_field(node, "key");
                self.write(": ");
                self.visit_field(node, "value");
            }
            "list_comprehension" => self.visit_comprehension(node, "[", "]"),
            "set_comprehension" | "dictionary_comprehension" => {
                self.visit_comprehension(node, "{", "}")
            }
            "generator_expression" => self.visit_comprehension(node, "(", ")"),
            "for_in_clause" => {
                self.write(" for ");
                self.visit_field(node, "left");
                self.write(" in ");
                let mut cursor = node.walk();
                let right: Vec<Node<'_>> = node.children_by_field_name("right", &mut cursor).collect();
                if right.len() > 1 {
                    self.write("(");
                    self.visit_seq(&right, ", ");
                    self.write(")");
                } else {
                    self.visit_seq(&right, ", ");
                }
            }
            "if_clause" => {
                self.write(" if ");
                self.visit_children(node);
            }
            "conditional_expression" => {
                let parts = named_children(node);
                if let [body, test, orelse] = parts.as_slice() {
                    self.write("(");
                    self.visit(*body);
                    self.write(" if ");
                    self.visit(*test);
                    self.write(" else ");
                    self.visit(*orelse);
                    self.write(")");
                } else {
                    self.write_raw(node);
                }
            }
            "unary_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |o| o.kind());
                self.write("(");
                self.write(op);
                self.write(" ");
                self.visit_field(node, "argument");
                self.write(")");
            }
            "not_operator" => {
                self.write("(not ");
                self.visit_field(node, "argument");
                self.write(")");
            }
            "binary_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |o| o.kind());
                self.write("(");
                self.visit_field(node, "left");
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.visit_field(node, "right");
                self.write(")");
            }
            "boolean_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |o| o.kind());
                let operands = bool_operands(node, op);
                self.write("(");
                self.visit_seq(&operands, &format!(" {} ", op));
                self.write(")");
            }
            "comparison_operator" => {
                self.write("(");
                for child in all_children(node) {
                    if child.is_named() {
                        self.visit(child);
                    } else {
                        self.write(" ");
                        self.write(child.kind());
                        self.write(" ");
                    }
                }
                self.write(")");
            }
            "subscript" => {
                self.visit_field(node, "value");
                self.write("[");
                let mut cursor = node.walk();
                let subscripts: Vec<Node<'_>> =
                    node.children_by_field_name("subscript", &mut cursor).collect();
                if subscripts.len() > 1 {
                    self.write("(");
                    self.visit_seq(&subscripts, ", ");
                    self.write(")");
                } else {
                    self.visit_seq(&subscripts, ", ");
                }
                self.write("]");
            }
            "slice" => {
                // lower ':' upper [':' step]
                let mut parts: [Option<Node<'_>>; 3] = [None; 3];
                let mut colons = 0;
                for child in all_children(node) {
                    if child.kind() == ":" {
                        colons += 1;
                    } else if child.is_named() && colons < 3 {
                        parts[colons] = Some(child);
                    }
                }
                if let Some(lower) = parts[0] {
                    self.visit(lower);
                }
                self.write(":");
                if let Some(upper) = parts[1] {
                    self.visit(upper);
                }
                if let Some(step) = parts[2] {
                    self.write(":");
                    self.visit(step);
                }
            }
            "lambda" => {
                self.write("(lambda ");
                if let Some(parameters) = node.child_by_field_name("parameters") {
                    self.visit_seq(&named_children(parameters), ", ");
                }
                self.write(": ");
                self.visit_field(node, "body");
                self.write(")");
            }
            "default_parameter" => {
                self.visit_field(node, "name");
                self.write("=");
                self.visit_field(node, "value");
            }
            "keyword_separator" => self.write("*"),
            "positional_separator" => self.write("/"),
            _ => self.write_raw(node),
        }
    }

    fn write_raw(&mut self, node: Node<'_>) {
        self.write(self.text(node));
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn visit_comprehension(&mut self, node: Node<'_>, open: &str, close: &str) {
        self.write(open);
        self.visit_field(node, "body");
        for child in named_children(node) {
            if matches!(child.kind(), "for_in_clause" | "if_clause") {
                self.visit(child);
            }
        }
        self.write(close);
    }

    /// Write one string literal, or several implicitly concatenated ones
    fn visit_strings(&mut self, parts: &[Node<'_>]) {
        let literals: Vec<(Node<'_>, StringLiteral<'_>)> = parts
            .iter()
            .filter_map(|part| StringLiteral::split(self.text(*part)).map(|lit| (*part, lit)))
            .collect();

        if literals.iter().any(|(_, lit)| lit.is_format()) {
            let mut value = String::new();
            for (part, literal) in &literals {
                self.fstring_part(*part, literal, &mut value);
            }
            self.write("f");
            self.write(&str_repr(&value));
        } else if literals.iter().all(|(_, lit)| lit.is_bytes()) && !literals.is_empty() {
            let bytes: Vec<u8> = literals
                .iter()
                .flat_map(|(_, lit)| lit.decode_bytes())
                .collect();
            self.write(&bytes_repr(&bytes));
        } else {
            let value: String = literals.iter().map(|(_, lit)| lit.decode_str()).collect();
            if literals.len() == 1 && literals[0].1.is_unicode() {
                self.write("u");
            }
            self.write(&str_repr(&value));
        }
    }

    /// Append the f-string form of one literal to `value`
    fn fstring_part(&self, node: Node<'_>, literal: &StringLiteral<'_>, value: &mut String) {
        if !literal.is_format() {
            value.push_str(&escape_braces(&literal.decode_str()));
            return;
        }
        for child in all_children(node) {
            match child.kind() {
                "string_content" => {
                    let decoded = decode_str(self.text(child), literal.is_raw())
                        .replace("{{", "{")
                        .replace("}}", "}");
                    value.push_str(&escape_braces(&decoded));
                }
                "escape_interpolation" => value.push_str(self.text(child)),
                "interpolation" => {
                    value.push('{');
                    let expr = child
                        .child_by_field_name("expression")
                        .map(|e| render(e, self.source))
                        .unwrap_or_default();
                    if expr.starts_with('{') {
                        value.push(' ');
                    }
                    value.push_str(&expr);
                    if let Some(conversion) = child.child_by_field_name("type_conversion") {
                        value.push_str(self.text(conversion));
                    }
                    if let Some(spec) = child.child_by_field_name("format_specifier") {
                        let spec = self.text(spec);
                        value.push(':');
                        value.push_str(spec.strip_prefix(':').unwrap_or(spec));
                    }
                    value.push('}');
                }
                _ => {}
            }
        }
    }
}

/// Operands of a chain of the same boolean operator, left to right
fn bool_operands<'t>(node: Node<'t>, op: &str) -> Vec<Node<'t>> {
    let mut operands = Vec::new();
    if let Some(left) = node.child_by_field_name("left") {
        let same_op = left.kind() == "boolean_operator"
            && left.child_by_field_name("operator").map(|o| o.kind()) == Some(op);
        if same_op {
            operands.extend(bool_operands(left, op));
        } else {
            operands.push(left);
        }
    }
    if let Some(right) = node.child_by_field_name("right") {
        operands.push(right);
    }
    operands
}

fn escape_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

/// Python `repr` of a `str`
pub fn str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code < 0x100 {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code < 0x10000 {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Python `repr` of a `bytes`
pub fn bytes_repr(value: &[u8]) -> String {
    let quote = if value.contains(&b'\'') && !value.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(value.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &byte in value {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push(quote as char);
    out
}

/// Integer literal in decimal, as `repr` writes it
fn int_repr(text: &str) -> String {
    let cleaned = text.replace('_', "");
    if cleaned.ends_with(['j', 'J']) {
        return cleaned;
    }
    let lower = cleaned.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u128::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u128::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u128::from_str_radix(bin, 2)
    } else {
        lower.parse::<u128>()
    };
    parsed.map(|v| v.to_string()).unwrap_or(cleaned)
}

fn float_literal_repr(text: &str) -> String {
    let cleaned = text.replace('_', "");
    if cleaned.ends_with(['j', 'J']) {
        return cleaned;
    }
    match cleaned.parse::<f64>() {
        Ok(value) => float_repr(value),
        Err(_) => cleaned,
    }
}

/// Python `repr` of a float
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            INFSTR.to_string()
        } else {
            format!("-{}", INFSTR)
        };
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let fixed = format!("{}", value);
        if fixed.contains('.') {
            fixed
        } else {
            format!("{}.0", fixed)
        }
    } else {
        let sci = format!("{:e}", value);
        match sci.split_once('e') {
            Some((mantissa, exponent)) => {
                let exp: i32 = exponent.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            None => sci,
        }
    }
}
