//! Structured text parsing
//!
//! Parses the restricted reStructuredText dialect used in test docstrings
//! into a [`Document`] tree. The dialect covers:
//! - Paragraphs, with ``literal``, **strong** and *emphasis* inline markup
//! - Bullet lists (`*`, `-`, `+`)
//! - Enumerated lists (`1.`, `a)`, `(iv)`, `#.`)
//! - Field lists (`:name: body`)
//! - Block quotes (indented blocks) and literal blocks (`::`)
//!
//! Problems the renderer can recover from are reported as [`ParseMessage`]s.
//! Only input that can never become well-formed markup (control characters)
//! is rejected with an error.

use serde::{Deserialize, Serialize};

use crate::error::CaseportError;

/// Regex patterns for parsing (compiled once)
mod patterns {
    use std::sync::LazyLock;

    pub static FIELD_MARKER: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^:([^:\s](?:[^:]*[^:\s])?):(?:\s+(.*))?$").unwrap());

    pub static BULLET: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^([-*+])(?:\s+(.*))?$").unwrap());

    pub static ENUMERATOR: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"^(\()?([0-9]+|#|[a-zA-Z]|[ivxlcdm]+|[IVXLCDM]+)([.)])(?:\s+(.*))?$")
            .unwrap()
    });
}

/// A recoverable problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMessage {
    /// 1-indexed line in the parsed text
    pub line: usize,
    /// "warning" or "error"
    pub level: String,
    pub message: String,
}

/// A parsed text block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub messages: Vec<ParseMessage>,
}

/// Block-level element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Paragraph text with lines joined by `\n`
    Paragraph(String),
    BulletList(Vec<Vec<Block>>),
    EnumeratedList {
        style: EnumStyle,
        start: u32,
        items: Vec<Vec<Block>>,
    },
    FieldList(Vec<Field>),
    BlockQuote(Vec<Block>),
    LiteralBlock(String),
}

/// A `:name: body` entry of a field list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub body: Vec<Block>,
}

/// Enumeration sequence of an enumerated list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStyle {
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl EnumStyle {
    /// CSS class used in rendered HTML
    pub fn class(self) -> &'static str {
        match self {
            EnumStyle::Arabic => "arabic",
            EnumStyle::LowerAlpha => "loweralpha",
            EnumStyle::UpperAlpha => "upperalpha",
            EnumStyle::LowerRoman => "lowerroman",
            EnumStyle::UpperRoman => "upperroman",
        }
    }
}

impl Block {
    /// Whether the block renders without separating newlines inside a list
    pub(crate) fn is_compactable(items: &[Vec<Block>]) -> bool {
        items.iter().all(|item| match item.as_slice() {
            [] => true,
            [Block::Paragraph(_)] => true,
            _ => false,
        })
    }
}

/// Inline-level element of paragraph text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Literal(String),
    Strong(String),
    Emphasis(String),
    /// Interpreted text, with its role if one was given
    Role(Option<String>, String),
}

/// One source line with its original line number
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }
}

/// Parse a text block into a document tree
///
/// Empty input yields an empty document.
pub fn parse(text: &str) -> Result<Document, CaseportError> {
    if let Some((line, ch)) = find_invalid_char(text) {
        return Err(CaseportError::Markup {
            line,
            message: format!("invalid character U+{:04X}", ch as u32),
        });
    }

    let expanded: Vec<String> = text.lines().map(expand_tabs).collect();
    let lines: Vec<Line<'_>> = expanded
        .iter()
        .enumerate()
        .map(|(i, text)| Line {
            number: i + 1,
            text: text.trim_end(),
        })
        .collect();

    let mut messages = Vec::new();
    let blocks = parse_blocks(&lines, &mut messages);
    Ok(Document { blocks, messages })
}

fn find_invalid_char(text: &str) -> Option<(usize, char)> {
    for (i, line) in text.split('\n').enumerate() {
        if let Some(ch) = line
            .chars()
            .find(|c| c.is_control() && !matches!(c, '\t' | '\r'))
        {
            return Some((i + 1, ch));
        }
    }
    None
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

/// Owned copy of a dedented line range, so nested blocks can be reparsed
struct Dedented {
    numbers: Vec<usize>,
    texts: Vec<String>,
}

impl Dedented {
    fn from_lines(lines: &[Line<'_>], amount: usize) -> Self {
        Self {
            numbers: lines.iter().map(|l| l.number).collect(),
            texts: lines
                .iter()
                .map(|l| l.text.get(amount.min(l.indent())..).unwrap_or("").to_string())
                .collect(),
        }
    }

    fn with_first(number: usize, first: &str, rest: Dedented) -> Self {
        let mut numbers = vec![number];
        let mut texts = vec![first.to_string()];
        numbers.extend(rest.numbers);
        texts.extend(rest.texts);
        Self { numbers, texts }
    }

    fn lines(&self) -> Vec<Line<'_>> {
        self.numbers
            .iter()
            .zip(&self.texts)
            .map(|(&number, text)| Line {
                number,
                text: text.as_str(),
            })
            .collect()
    }
}

fn parse_blocks(lines: &[Line<'_>], messages: &mut Vec<ParseMessage>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;
    let mut pending_literal = false;

    while i < lines.len() {
        if lines[i].is_blank() {
            i += 1;
            continue;
        }

        if lines[i].indent() > 0 {
            let end = indented_end(lines, i);
            let block_lines = trim_trailing_blank(&lines[i..end]);
            let amount = min_indent(block_lines);
            let dedented = Dedented::from_lines(block_lines, amount);
            if pending_literal {
                blocks.push(Block::LiteralBlock(dedented.texts.join("\n")));
            } else {
                blocks.push(Block::BlockQuote(parse_blocks(&dedented.lines(), messages)));
            }
            pending_literal = false;
            i = end;
            continue;
        }
        pending_literal = false;

        if patterns::FIELD_MARKER.is_match(lines[i].text) {
            let (fields, next) = parse_field_list(lines, i, messages);
            blocks.push(Block::FieldList(fields));
            i = next;
            continue;
        }

        if let Some(caps) = patterns::BULLET.captures(lines[i].text) {
            let bullet = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let (items, next) = parse_bullet_list(lines, i, &bullet, messages);
            blocks.push(Block::BulletList(items));
            i = next;
            continue;
        }

        if let Some(item) = enumerator_at(lines, i, None) {
            let (block, next) = parse_enumerated_list(lines, i, item, messages);
            blocks.push(block);
            i = next;
            continue;
        }

        // Paragraph: consecutive unindented, non-blank lines
        let start = i;
        while i < lines.len() && !lines[i].is_blank() && lines[i].indent() == 0 {
            i += 1;
        }
        if i < lines.len() && !lines[i].is_blank() {
            messages.push(ParseMessage {
                line: lines[i].number,
                level: "error".to_string(),
                message: "Unexpected indentation.".to_string(),
            });
        }

        let mut text = lines[start..i]
            .iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(stripped) = text.strip_suffix("::") {
            pending_literal = true;
            text = if stripped.is_empty() {
                String::new()
            } else if stripped.ends_with(char::is_whitespace) {
                stripped.trim_end().to_string()
            } else {
                format!("{}:", stripped)
            };
        }
        if !text.is_empty() {
            blocks.push(Block::Paragraph(text));
        }
    }

    blocks
}

/// Index one past the block of lines indented deeper than column zero
fn indented_end(lines: &[Line<'_>], start: usize) -> usize {
    let mut end = start;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent() > 0) {
        end += 1;
    }
    end
}

fn trim_trailing_blank<'a, 'b>(lines: &'b [Line<'a>]) -> &'b [Line<'a>] {
    let mut end = lines.len();
    while end > 0 && lines[end - 1].is_blank() {
        end -= 1;
    }
    &lines[..end]
}

fn min_indent(lines: &[Line<'_>]) -> usize {
    lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(Line::indent)
        .min()
        .unwrap_or(0)
}

/// Collect the body of an item whose first line text follows a marker
///
/// Returns the body lines and the index just past the item.
fn item_body(lines: &[Line<'_>], index: usize, first: &str) -> (Dedented, usize) {
    let end = indented_end(lines, index + 1);
    let rest = trim_trailing_blank(&lines[index + 1..end]);
    let amount = min_indent(rest);
    let body = Dedented::with_first(
        lines[index].number,
        first,
        Dedented::from_lines(rest, amount),
    );
    (body, end)
}

fn skip_blank(lines: &[Line<'_>], mut i: usize) -> usize {
    while i < lines.len() && lines[i].is_blank() {
        i += 1;
    }
    i
}

/// Report a construct followed directly by unindented text
fn ends_without_blank(
    lines: &[Line<'_>],
    next: usize,
    what: &str,
    messages: &mut Vec<ParseMessage>,
) {
    if next < lines.len() && next > 0 && !lines[next - 1].is_blank() {
        messages.push(ParseMessage {
            line: lines[next].number,
            level: "warning".to_string(),
            message: format!("{} ends without a blank line; unexpected unindent.", what),
        });
    }
}

fn parse_field_list(
    lines: &[Line<'_>],
    mut i: usize,
    messages: &mut Vec<ParseMessage>,
) -> (Vec<Field>, usize) {
    let mut fields = Vec::new();

    loop {
        let Some(caps) = patterns::FIELD_MARKER.captures(lines[i].text) else {
            break;
        };
        let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let first = caps.get(2).map_or("", |m| m.as_str());
        let (body, end) = item_body(lines, i, first);
        fields.push(Field {
            name,
            body: parse_blocks(&body.lines(), messages),
        });

        let next = skip_blank(lines, end);
        if next < lines.len() && patterns::FIELD_MARKER.is_match(lines[next].text) {
            i = next;
            continue;
        }
        ends_without_blank(lines, next, "Field list", messages);
        return (fields, next);
    }

    (fields, i)
}

fn parse_bullet_list(
    lines: &[Line<'_>],
    mut i: usize,
    bullet: &str,
    messages: &mut Vec<ParseMessage>,
) -> (Vec<Vec<Block>>, usize) {
    let mut items = Vec::new();

    loop {
        let Some(caps) = patterns::BULLET.captures(lines[i].text) else {
            break;
        };
        if caps.get(1).map(|m| m.as_str()) != Some(bullet) {
            break;
        }
        let first = caps.get(2).map_or("", |m| m.as_str());
        let (body, end) = item_body(lines, i, first);
        items.push(parse_blocks(&body.lines(), messages));

        let next = skip_blank(lines, end);
        let continues = next < lines.len()
            && patterns::BULLET
                .captures(lines[next].text)
                .is_some_and(|c| c.get(1).map(|m| m.as_str()) == Some(bullet));
        if continues {
            i = next;
            continue;
        }
        ends_without_blank(lines, next, "Bullet list", messages);
        return (items, next);
    }

    (items, i)
}

/// An enumerated list item marker
#[derive(Debug, Clone)]
struct Enumerator {
    style: EnumStyle,
    /// `None` for the `#` auto-enumerator
    ordinal: Option<u32>,
    format: (bool, char),
    text: String,
}

/// Recognize an enumerated list item at `index`
///
/// When `previous` is given, the item must continue that list: same format,
/// same style and the next ordinal. A lone item followed directly by
/// unindented text is a paragraph, not a list.
fn enumerator_at(lines: &[Line<'_>], index: usize, previous: Option<&Enumerator>) -> Option<Enumerator> {
    let caps = patterns::ENUMERATOR.captures(lines[index].text)?;
    let open_paren = caps.get(1).is_some();
    let suffix = caps.get(3)?.as_str().chars().next()?;
    if open_paren && suffix != ')' {
        return None;
    }
    let raw = caps.get(2)?.as_str();
    let text = caps.get(4).map_or("", |m| m.as_str()).to_string();

    let (style, ordinal) = match previous {
        Some(prev) => (prev.style, ordinal_in(prev.style, raw)?),
        None => classify_enumerator(raw)?,
    };
    let enumerator = Enumerator {
        style,
        ordinal,
        format: (open_paren, suffix),
        text,
    };

    if let Some(prev) = previous {
        if prev.format != enumerator.format {
            return None;
        }
        match (prev.ordinal, enumerator.ordinal) {
            (Some(p), Some(n)) if p.checked_add(1) != Some(n) => return None,
            (None, Some(_)) | (Some(_), None) => return None,
            _ => {}
        }
    } else {
        let next = index + 1;
        let standalone = next >= lines.len()
            || lines[next].is_blank()
            || lines[next].indent() > 0
            || enumerator_at(lines, next, Some(&enumerator)).is_some();
        if !standalone {
            return None;
        }
    }

    Some(enumerator)
}

fn classify_enumerator(raw: &str) -> Option<(EnumStyle, Option<u32>)> {
    if raw == "#" {
        return Some((EnumStyle::Arabic, None));
    }
    if let Ok(n) = raw.parse::<u32>() {
        return Some((EnumStyle::Arabic, Some(n)));
    }
    if raw == "i" {
        return Some((EnumStyle::LowerRoman, Some(1)));
    }
    if raw == "I" {
        return Some((EnumStyle::UpperRoman, Some(1)));
    }
    if raw.len() == 1 {
        let ch = raw.chars().next()?;
        let style = if ch.is_ascii_lowercase() {
            EnumStyle::LowerAlpha
        } else {
            EnumStyle::UpperAlpha
        };
        return Some((style, ordinal_in(style, raw)?));
    }
    let style = if raw.chars().all(|c| c.is_ascii_lowercase()) {
        EnumStyle::LowerRoman
    } else {
        EnumStyle::UpperRoman
    };
    Some((style, ordinal_in(style, raw)?))
}

fn ordinal_in(style: EnumStyle, raw: &str) -> Option<Option<u32>> {
    if raw == "#" {
        return Some(None);
    }
    let value = match style {
        EnumStyle::Arabic => raw.parse::<u32>().ok()?,
        EnumStyle::LowerAlpha | EnumStyle::UpperAlpha => {
            let mut chars = raw.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            let matches_case = match style {
                EnumStyle::LowerAlpha => ch.is_ascii_lowercase(),
                _ => ch.is_ascii_uppercase(),
            };
            if !matches_case {
                return None;
            }
            (ch.to_ascii_lowercase() as u32) - ('a' as u32) + 1
        }
        EnumStyle::LowerRoman | EnumStyle::UpperRoman => {
            let matches_case = match style {
                EnumStyle::LowerRoman => raw.chars().all(|c| c.is_ascii_lowercase()),
                _ => raw.chars().all(|c| c.is_ascii_uppercase()),
            };
            if !matches_case {
                return None;
            }
            roman_value(raw)?
        }
    };
    Some(Some(value))
}

fn roman_value(raw: &str) -> Option<u32> {
    let digit = |c: char| match c.to_ascii_lowercase() {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        'l' => Some(50),
        'c' => Some(100),
        'd' => Some(500),
        'm' => Some(1000),
        _ => None,
    };
    let values: Vec<u32> = raw.chars().map(digit).collect::<Option<_>>()?;
    let mut total = 0;
    for (i, &value) in values.iter().enumerate() {
        if values.get(i + 1).is_some_and(|&next| next > value) {
            total -= value as i64;
        } else {
            total += value as i64;
        }
    }
    u32::try_from(total).ok().filter(|&v| v > 0)
}

fn parse_enumerated_list(
    lines: &[Line<'_>],
    mut i: usize,
    first: Enumerator,
    messages: &mut Vec<ParseMessage>,
) -> (Block, usize) {
    let style = first.style;
    let start = first.ordinal.unwrap_or(1);
    let mut items = Vec::new();
    let mut current = first;

    loop {
        let (body, end) = item_body(lines, i, &current.text);
        items.push(parse_blocks(&body.lines(), messages));

        let next = skip_blank(lines, end);
        if next < lines.len() && lines[next].indent() == 0 {
            if let Some(item) = enumerator_at(lines, next, Some(&current)) {
                current = item;
                i = next;
                continue;
            }
        }
        ends_without_blank(lines, next, "Enumerated list", messages);
        return (Block::EnumeratedList { style, start, items }, next);
    }
}

/// Split paragraph text into inline elements
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some((inline, next)) = inline_at(&chars, i) {
            if !plain.is_empty() {
                out.push(Inline::Text(std::mem::take(&mut plain)));
            }
            out.push(inline);
            i = next;
        } else {
            plain.push(chars[i]);
            i += 1;
        }
    }
    if !plain.is_empty() {
        out.push(Inline::Text(plain));
    }
    out
}

/// Plain text content of paragraph text, with inline markup removed
pub fn text_content(text: &str) -> String {
    parse_inline(text)
        .into_iter()
        .map(|inline| match inline {
            Inline::Text(s)
            | Inline::Literal(s)
            | Inline::Strong(s)
            | Inline::Emphasis(s)
            | Inline::Role(_, s) => s,
        })
        .collect()
}

fn can_open(chars: &[char], i: usize, marker_len: usize) -> bool {
    let before_ok = i == 0
        || chars[i - 1].is_whitespace()
        || matches!(chars[i - 1], '\'' | '"' | '(' | '[' | '{' | '<' | '-' | '/' | ':');
    let after_ok = chars
        .get(i + marker_len)
        .is_some_and(|c| !c.is_whitespace());
    before_ok && after_ok
}

fn find_close(chars: &[char], from: usize, marker: &[char]) -> Option<usize> {
    let mut j = from;
    while j + marker.len() <= chars.len() {
        if chars[j..j + marker.len()] == *marker && j > from && !chars[j - 1].is_whitespace() {
            let after = chars.get(j + marker.len());
            if after.is_none_or(|c| c.is_whitespace() || c.is_ascii_punctuation()) {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

fn inline_at(chars: &[char], i: usize) -> Option<(Inline, usize)> {
    let starts_with = |s: &str| {
        let m: Vec<char> = s.chars().collect();
        chars.len() >= i + m.len() && chars[i..i + m.len()] == *m
    };
    let collect = |a: usize, b: usize| chars[a..b].iter().collect::<String>();

    if starts_with("``") && can_open(chars, i, 2) {
        let close = find_close(chars, i + 2, &['`', '`'])?;
        return Some((Inline::Literal(collect(i + 2, close)), close + 2));
    }
    if starts_with("**") && can_open(chars, i, 2) {
        let close = find_close(chars, i + 2, &['*', '*'])?;
        return Some((Inline::Strong(collect(i + 2, close)), close + 2));
    }
    if starts_with("*") && can_open(chars, i, 1) {
        let close = find_close(chars, i + 1, &['*'])?;
        return Some((Inline::Emphasis(collect(i + 1, close)), close + 1));
    }
    if starts_with(":") && (i == 0 || chars[i - 1].is_whitespace() || chars[i - 1] == '(') {
        // :role:`text`
        let mut j = i + 1;
        while j < chars.len() && (chars[j].is_alphanumeric() || matches!(chars[j], '_' | '-' | '.' | ':')) {
            if chars[j] == ':' && chars.get(j + 1) == Some(&'`') {
                let role = collect(i + 1, j);
                let close = find_close(chars, j + 2, &['`'])?;
                return Some((Inline::Role(Some(role), collect(j + 2, close)), close + 1));
            }
            j += 1;
        }
        return None;
    }
    if starts_with("`") && can_open(chars, i, 1) {
        let close = find_close(chars, i + 1, &['`'])?;
        return Some((Inline::Role(None, collect(i + 1, close)), close + 1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(s: &str) -> Block {
        Block::Paragraph(s.to_string())
    }

    #[test]
    fn test_parse_empty() {
        let doc = parse("").unwrap();
        assert!(doc.blocks.is_empty());
        assert!(doc.messages.is_empty());
    }

    #[test]
    fn test_parse_paragraphs() {
        let doc = parse("First line\nsecond line\n\nAnother paragraph").unwrap();
        assert_eq!(
            doc.blocks,
            vec![para("First line\nsecond line"), para("Another paragraph")]
        );
    }

    #[test]
    fn test_parse_field_list() {
        let doc = parse(":id: ABC\n:steps: Do thing\n:expectedresults: Thing happens").unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::FieldList(vec![
                Field {
                    name: "id".to_string(),
                    body: vec![para("ABC")],
                },
                Field {
                    name: "steps".to_string(),
                    body: vec![para("Do thing")],
                },
                Field {
                    name: "expectedresults".to_string(),
                    body: vec![para("Thing happens")],
                },
            ])]
        );
    }

    #[test]
    fn test_field_list_spans_blank_lines_and_continuations() {
        let text = "Summary.\n\n:id: 1\n\n:steps: Run the thing and\n    check it.\n\n:empty:\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        let Block::FieldList(fields) = &doc.blocks[1] else {
            panic!("expected field list, got {:?}", doc.blocks[1]);
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].body, vec![para("Run the thing and\ncheck it.")]);
        assert!(fields[2].body.is_empty());
    }

    #[test]
    fn test_field_body_with_enumerated_list() {
        let text = ":steps:\n\n    1. First Step\n    2. Second Step\n";
        let doc = parse(text).unwrap();
        let Block::FieldList(fields) = &doc.blocks[0] else {
            panic!("expected field list");
        };
        assert_eq!(
            fields[0].body,
            vec![Block::EnumeratedList {
                style: EnumStyle::Arabic,
                start: 1,
                items: vec![vec![para("First Step")], vec![para("Second Step")]],
            }]
        );
    }

    #[test]
    fn test_bullet_list_items() {
        let doc = parse("* item 1\n* item 2\n  continued\n\n* item 3").unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::BulletList(vec![
                vec![para("item 1")],
                vec![para("item 2\ncontinued")],
                vec![para("item 3")],
            ])]
        );
    }

    #[test]
    fn test_enumerated_styles() {
        let doc = parse("a) first\nb) second").unwrap();
        assert!(matches!(
            doc.blocks[0],
            Block::EnumeratedList {
                style: EnumStyle::LowerAlpha,
                start: 1,
                ..
            }
        ));

        let doc = parse("(iii) third\n(iv) fourth").unwrap();
        assert!(matches!(
            doc.blocks[0],
            Block::EnumeratedList {
                style: EnumStyle::LowerRoman,
                start: 3,
                ..
            }
        ));

        let doc = parse("#. one\n#. two").unwrap();
        let Block::EnumeratedList { items, .. } = &doc.blocks[0] else {
            panic!("expected enumerated list");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_enumerator_followed_by_text_is_paragraph() {
        let doc = parse("A. Einstein was a\nphysicist.").unwrap();
        assert_eq!(doc.blocks, vec![para("A. Einstein was a\nphysicist.")]);
    }

    #[test]
    fn test_out_of_sequence_items() {
        // Without a blank line the second enumerator disqualifies the first
        let doc = parse("1. one\n3. three").unwrap();
        assert_eq!(doc.blocks, vec![para("1. one\n3. three")]);

        let doc = parse("1. one\n\n3. three").unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(doc.blocks[1], Block::EnumeratedList { start: 3, .. }));
    }

    #[test]
    fn test_largest_ordinal_has_no_successor() {
        let doc = parse("4294967295. a\n4294967295. b").unwrap();
        assert_eq!(doc.blocks, vec![para("4294967295. a\n4294967295. b")]);

        let doc = parse("4294967295. a\n\n4294967295. b\n").unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(
            doc.blocks[0],
            Block::EnumeratedList { start: 4294967295, .. }
        ));
    }

    #[test]
    fn test_list_ending_without_blank_line_reported() {
        let doc = parse("* one\n* two\nTrailing text").unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.messages[0].line, 3);
        assert_eq!(doc.messages[0].level, "warning");
    }

    #[test]
    fn test_indented_block_is_block_quote() {
        let doc = parse("    :field1: value1\n    :field2: value2\n").unwrap();
        let Block::BlockQuote(inner) = &doc.blocks[0] else {
            panic!("expected block quote");
        };
        assert!(matches!(inner[0], Block::FieldList(_)));
    }

    #[test]
    fn test_literal_block() {
        let doc = parse("Example::\n\n    x = 1\n    y = 2\n").unwrap();
        assert_eq!(
            doc.blocks,
            vec![
                para("Example:"),
                Block::LiteralBlock("x = 1\ny = 2".to_string())
            ]
        );
    }

    #[test]
    fn test_unexpected_indentation_reported() {
        let doc = parse("Paragraph\n    indented").unwrap();
        assert_eq!(doc.messages[0].line, 2);
        assert_eq!(doc.messages[0].level, "error");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_control_character_rejected() {
        let err = parse("ok\nbad \u{1} char").unwrap_err();
        assert_eq!(err.code(), "E006");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_unicode_preserved() {
        let doc = parse(":title: Überprüfung — 日本語").unwrap();
        let Block::FieldList(fields) = &doc.blocks[0] else {
            panic!("expected field list");
        };
        assert_eq!(fields[0].body, vec![para("Überprüfung — 日本語")]);
    }

    #[test]
    fn test_parse_inline() {
        assert_eq!(
            parse_inline("Use ``foo()`` with *care* and **force**."),
            vec![
                Inline::Text("Use ".to_string()),
                Inline::Literal("foo()".to_string()),
                Inline::Text(" with ".to_string()),
                Inline::Emphasis("care".to_string()),
                Inline::Text(" and ".to_string()),
                Inline::Strong("force".to_string()),
                Inline::Text(".".to_string()),
            ]
        );
        assert_eq!(
            parse_inline("See :class:`Foo`"),
            vec![
                Inline::Text("See ".to_string()),
                Inline::Role(Some("class".to_string()), "Foo".to_string()),
            ]
        );
        assert_eq!(parse_inline("2 * 3 * 4"), vec![Inline::Text("2 * 3 * 4".to_string())]);
    }

    #[test]
    fn test_text_content() {
        assert_eq!(text_content("Run ``make`` now"), "Run make now");
    }
}
