//! Field extraction from docstrings
//!
//! [`parse_docstring`] pulls `:name: value` fields out of a docstring and
//! [`map_steps`] pairs a test's steps with its expected results.

use std::collections::BTreeMap;
use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::html::{self, HtmlTranslator};
use crate::markup::{self, Block};

/// Extract the fields of every field list in a docstring
///
/// Field names are lower-cased. A field whose body is a single paragraph
/// maps to that paragraph's text; any other body maps to its rendered
/// HTML. Later fields with the same name replace earlier ones. Text that
/// cannot be parsed yields no fields.
pub fn parse_docstring(docstring: Option<&str>) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let Some(docstring) = docstring.filter(|d| !d.is_empty()) else {
        return fields;
    };

    match markup::parse(docstring) {
        Ok(document) => {
            for message in &document.messages {
                tracing::debug!(
                    "docstring line {}: {}: {}",
                    message.line,
                    message.level,
                    message.message
                );
            }
            collect_fields(&document.blocks, &mut fields);
        }
        Err(err) => {
            tracing::warn!("ignoring fields of malformed docstring: {}", err);
        }
    }
    fields
}

fn collect_fields(blocks: &[Block], fields: &mut BTreeMap<String, String>) {
    for block in blocks {
        match block {
            Block::FieldList(list) => {
                for field in list {
                    fields.insert(field.name.to_lowercase(), field_value(&field.body));
                }
            }
            Block::BlockQuote(inner) => collect_fields(inner, fields),
            Block::BulletList(items) | Block::EnumeratedList { items, .. } => {
                for item in items {
                    collect_fields(item, fields);
                }
            }
            Block::Paragraph(_) | Block::LiteralBlock(_) => {}
        }
    }
}

fn field_value(body: &[Block]) -> String {
    match body {
        [Block::Paragraph(text)] => markup::text_content(text),
        _ => {
            let mut out = String::new();
            html::render_blocks(&mut out, body, &HtmlTranslator, false);
            out
        }
    }
}

/// Pair steps with expected results
///
/// Two ordered lists with the same number of items pair up item by item,
/// each side holding the item's inner markup. Anything else, including
/// plain text, single paragraphs and lists of different lengths, yields
/// the two values unchanged as a single pair.
pub fn map_steps(steps: &str, expected: &str) -> Vec<(String, String)> {
    let fallback = || vec![(steps.to_string(), expected.to_string())];

    let (Some(steps_root), Some(expected_root)) = (parse_fragment(steps), parse_fragment(expected))
    else {
        return fallback();
    };

    match (steps_root.name.as_str(), expected_root.name.as_str()) {
        ("ol", "ol") => {
            let steps_items = steps_root.item_markup(steps);
            let expected_items = expected_root.item_markup(expected);
            if steps_items.len() != expected_items.len() || steps_items.is_empty() {
                return fallback();
            }
            steps_items.into_iter().zip(expected_items).collect()
        }
        _ => fallback(),
    }
}

/// Inner markup of each item of an ordered-list value
///
/// Returns `None` when the value is not a single `<ol>` element.
pub fn ordered_list_items(value: &str) -> Option<Vec<String>> {
    let root = parse_fragment(value)?;
    (root.name == "ol").then(|| root.item_markup(value))
}

/// An element of a parsed markup fragment, with byte ranges into the source
#[derive(Debug)]
struct Element {
    name: String,
    inner: Range<usize>,
    children: Vec<Element>,
}

impl Element {
    fn item_markup(&self, source: &str) -> Vec<String> {
        self.children
            .iter()
            .filter(|child| child.name == "li")
            .map(|li| source[li.inner.clone()].trim().to_string())
            .collect()
    }
}

/// Parse a well-formed markup fragment with exactly one root element
fn parse_fragment(text: &str) -> Option<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let before = reader.buffer_position();
        let event = reader.read_event().ok()?;
        let after = reader.buffer_position();

        let finished = match event {
            Event::Start(start) => {
                stack.push(Element {
                    name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    inner: after..after,
                    children: Vec::new(),
                });
                None
            }
            Event::Empty(start) => Some(Element {
                name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                inner: after..after,
                children: Vec::new(),
            }),
            Event::End(_) => {
                let mut element = stack.pop()?;
                element.inner.end = before;
                Some(element)
            }
            Event::Text(t) => {
                if stack.is_empty() && !t.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                None
            }
            Event::CData(_) => {
                if stack.is_empty() {
                    return None;
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if root.is_none() => root = Some(element),
                None => return None,
            }
        }
    }

    if !stack.is_empty() {
        return None;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_docstring() {
        let docstring = "\n    :field1: value1\n    :field2: value2\n    :field3:\n        * item 1\n        * item 2\n    ";
        let fields = parse_docstring(Some(docstring));
        let expected: BTreeMap<String, String> = [
            ("field1", "value1"),
            ("field2", "value2"),
            (
                "field3",
                "<ul class=\"simple\">\n<li><p>item 1</p></li>\n<li><p>item 2</p></li>\n</ul>\n",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_parse_none_docstring() {
        assert!(parse_docstring(None).is_empty());
        assert!(parse_docstring(Some("")).is_empty());
    }

    #[test]
    fn test_field_names_lowercased_and_markup_stripped() {
        let fields = parse_docstring(Some("Summary.\n\n:ID: ABC\n:Title: Run ``make``"));
        assert_eq!(fields.get("id").map(String::as_str), Some("ABC"));
        assert_eq!(fields.get("title").map(String::as_str), Some("Run make"));
    }

    #[test]
    fn test_empty_field_body() {
        let fields = parse_docstring(Some(":setup:\n:id: 1"));
        assert_eq!(fields.get("setup").map(String::as_str), Some(""));
    }

    #[test]
    fn test_multi_paragraph_body_kept_as_markup() {
        let fields = parse_docstring(Some(":setup: First.\n\n    Second & last.\n"));
        assert_eq!(
            fields.get("setup").map(String::as_str),
            Some("<p>First.</p>\n<p>Second &amp; last.</p>\n")
        );
    }

    #[test]
    fn test_malformed_docstring_yields_no_fields() {
        assert!(parse_docstring(Some(":id: 1\n\u{1}")).is_empty());
    }

    #[test]
    fn test_unicode_field_values() {
        let fields = parse_docstring(Some(":title: Überprüfung 日本語"));
        assert_eq!(
            fields.get("title").map(String::as_str),
            Some("Überprüfung 日本語")
        );
    }

    #[test]
    fn test_map_steps_single_paragraph() {
        assert_eq!(
            map_steps("Do thing", "Thing happens"),
            pairs(&[("Do thing", "Thing happens")])
        );
        assert_eq!(
            map_steps("<p>Do thing</p>", "<p>Thing happens</p>"),
            pairs(&[("<p>Do thing</p>", "<p>Thing happens</p>")])
        );
    }

    #[test]
    fn test_map_steps_keeps_surrounding_whitespace() {
        assert_eq!(
            map_steps("<p>Do thing</p>\n", "<p>Thing happens</p>\n"),
            pairs(&[("<p>Do thing</p>\n", "<p>Thing happens</p>\n")])
        );
        assert_eq!(
            map_steps("  <p>Do thing</p>", "<p>Thing happens</p>\n\n"),
            pairs(&[("  <p>Do thing</p>", "<p>Thing happens</p>\n\n")])
        );
    }

    #[test]
    fn test_huge_list_ordinals_are_not_fatal() {
        let fields = parse_docstring(Some(":steps:\n\n    4294967295. a\n    4294967295. b\n"));
        assert_eq!(
            fields.get("steps").map(String::as_str),
            Some("4294967295. a\n4294967295. b")
        );
    }

    #[test]
    fn test_map_steps_ordered_lists() {
        let steps = "<ol class=\"arabic simple\">\n<li><p>First Step</p></li>\n<li><p>Second Step</p></li>\n</ol>\n";
        let expected = "<ol class=\"arabic simple\">\n<li><p>First Result</p></li>\n<li><p>Second Result</p></li>\n</ol>\n";
        assert_eq!(
            map_steps(steps, expected),
            pairs(&[
                ("<p>First Step</p>", "<p>First Result</p>"),
                ("<p>Second Step</p>", "<p>Second Result</p>"),
            ])
        );
    }

    #[test]
    fn test_map_steps_mismatched_lengths_fall_back() {
        let steps = "<ol>\n<li><p>One</p></li>\n<li><p>Two</p></li>\n</ol>\n";
        let expected = "<ol>\n<li><p>Only</p></li>\n</ol>\n";
        assert_eq!(map_steps(steps, expected), pairs(&[(steps, expected)]));
    }

    #[test]
    fn test_map_steps_mismatched_shapes_fall_back() {
        let steps = "<ol>\n<li><p>One</p></li>\n</ol>\n";
        assert_eq!(
            map_steps(steps, "Single result"),
            pairs(&[(steps, "Single result")])
        );
        assert_eq!(
            map_steps("<p>a</p>", steps),
            pairs(&[("<p>a</p>", steps)])
        );
    }

    #[test]
    fn test_map_steps_malformed_markup_falls_back() {
        assert_eq!(
            map_steps("<ol><li>open", "<ol><li>x</li></ol>"),
            pairs(&[("<ol><li>open", "<ol><li>x</li></ol>")])
        );
        assert_eq!(
            map_steps("<p>a</p><p>b</p>", "<p>c</p>"),
            pairs(&[("<p>a</p><p>b</p>", "<p>c</p>")])
        );
    }

    #[test]
    fn test_ordered_list_items() {
        assert_eq!(
            ordered_list_items("<ol>\n<li><p>a</p></li>\n<li>\n<p>b</p>\n</li>\n</ol>\n"),
            Some(vec!["<p>a</p>".to_string(), "<p>b</p>".to_string()])
        );
        assert_eq!(ordered_list_items("<ul><li>a</li></ul>"), None);
        assert_eq!(ordered_list_items("plain text"), None);
    }

    #[test]
    fn test_steps_from_docstring_lists() {
        let fields = parse_docstring(Some(
            ":steps:\n\n    1. First Step\n    2. Second Step\n\n:expectedresults:\n\n    1. First Result\n    2. Second Result\n",
        ));
        let steps = &fields["steps"];
        let expected = &fields["expectedresults"];
        assert_eq!(
            map_steps(steps, expected),
            pairs(&[
                ("<p>First Step</p>", "<p>First Result</p>"),
                ("<p>Second Step</p>", "<p>Second Result</p>"),
            ])
        );
    }
}
