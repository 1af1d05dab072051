//! HTML rendering of parsed structured text
//!
//! Rendering goes through a [`Translator`], which decides how field lists
//! are presented. [`TableFieldListTranslator`] is the translator for
//! documentation output: a table with one row per field, the field name in
//! the header cell and the body in the data cell. [`HtmlTranslator`] renders
//! definition lists and is what the built-in `description` default uses, so
//! tracker descriptions keep the plain HTML writer's shape.

use crate::error::CaseportError;
use crate::markup::{self, Block, Document, Field, Inline, ParseMessage};

/// Output-formatting strategy for field lists
///
/// Every other construct renders the same way regardless of translator.
pub trait Translator {
    fn field_list_start(&self, out: &mut String, simple: bool) {
        out.push_str(if simple {
            "<dl class=\"field-list simple\">\n"
        } else {
            "<dl class=\"field-list\">\n"
        });
    }

    fn field_list_end(&self, out: &mut String) {
        out.push_str("</dl>\n");
    }

    /// Open a field and emit its (already escaped) name
    fn field_name(&self, out: &mut String, name: &str) {
        out.push_str("<dt>");
        out.push_str(name);
        out.push_str("<span class=\"colon\">:</span></dt>\n");
    }

    fn field_body_start(&self, out: &mut String, _empty: bool) {
        out.push_str("<dd>");
    }

    fn field_body_end(&self, out: &mut String) {
        out.push_str("</dd>\n");
    }

    fn field_end(&self, _out: &mut String) {}
}

/// Plain HTML writer output: field lists as `<dl>` definition lists
///
/// Used for the computed `description` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTranslator;

impl Translator for HtmlTranslator {}

/// Translator for documentation output: field lists as HTML tables
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFieldListTranslator;

impl Translator for TableFieldListTranslator {
    fn field_list_start(&self, out: &mut String, simple: bool) {
        out.push_str(if simple {
            "<table class=\"field-list simple\">\n"
        } else {
            "<table class=\"field-list\">\n"
        });
    }

    fn field_list_end(&self, out: &mut String) {
        out.push_str("</table>\n");
    }

    fn field_name(&self, out: &mut String, name: &str) {
        out.push_str("<tr><th>");
        out.push_str(name);
        out.push_str("</th>\n");
    }

    fn field_body_start(&self, out: &mut String, empty: bool) {
        out.push_str("<td>");
        // Keep the row height when the field has no body
        if empty {
            out.push_str("<p></p>");
        }
    }

    fn field_body_end(&self, out: &mut String) {
        out.push_str("</td>\n");
    }

    fn field_end(&self, out: &mut String) {
        out.push_str("</tr>\n");
    }
}

/// Rendered HTML plus the messages produced while parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub messages: Vec<ParseMessage>,
}

/// Parse structured text and render the HTML document body
///
/// Empty or absent input renders to an empty string. Input that cannot be
/// parsed is rendered as a single escaped paragraph.
pub fn parse_rst(text: Option<&str>, translator: &dyn Translator) -> Rendered {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Rendered::default();
    };

    match markup::parse(text) {
        Ok(document) => Rendered {
            html: render_document(&document, translator),
            messages: document.messages,
        },
        Err(err) => {
            tracing::warn!("rendering unparseable text verbatim: {}", err);
            let (line, message) = match &err {
                CaseportError::Markup { line, message } => (*line, message.clone()),
                other => (0, other.to_string()),
            };
            Rendered {
                html: format!(
                    "<div class=\"document\">\n<p>{}</p>\n</div>\n",
                    escape(text)
                ),
                messages: vec![ParseMessage {
                    line,
                    level: "severe".to_string(),
                    message,
                }],
            }
        }
    }
}

/// Render a whole document wrapped in its `div`
pub fn render_document(document: &Document, translator: &dyn Translator) -> String {
    let mut out = String::from("<div class=\"document\">\n");
    render_blocks(&mut out, &document.blocks, translator, false);
    out.push_str("</div>\n");
    out
}

/// Render a block sequence without any wrapper
///
/// `compact` drops the newline after paragraphs, as items of simple lists do.
pub fn render_blocks(out: &mut String, blocks: &[Block], translator: &dyn Translator, compact: bool) {
    for block in blocks {
        render_block(out, block, translator, compact);
    }
}

fn render_block(out: &mut String, block: &Block, translator: &dyn Translator, compact: bool) {
    match block {
        Block::Paragraph(text) => {
            out.push_str("<p>");
            render_inline(out, text);
            out.push_str("</p>");
            if !compact {
                out.push('\n');
            }
        }
        Block::BulletList(items) => {
            let simple = Block::is_compactable(items);
            out.push_str(if simple { "<ul class=\"simple\">\n" } else { "<ul>\n" });
            render_items(out, items, translator, simple);
            out.push_str("</ul>\n");
        }
        Block::EnumeratedList { style, start, items } => {
            let simple = Block::is_compactable(items);
            out.push_str("<ol class=\"");
            out.push_str(style.class());
            if simple {
                out.push_str(" simple");
            }
            out.push('"');
            if *start != 1 {
                out.push_str(&format!(" start=\"{}\"", start));
            }
            out.push_str(">\n");
            render_items(out, items, translator, simple);
            out.push_str("</ol>\n");
        }
        Block::FieldList(fields) => render_field_list(out, fields, translator),
        Block::BlockQuote(blocks) => {
            out.push_str("<blockquote>\n");
            render_blocks(out, blocks, translator, false);
            out.push_str("</blockquote>\n");
        }
        Block::LiteralBlock(text) => {
            out.push_str("<pre class=\"literal-block\">");
            out.push_str(&escape(text));
            out.push_str("</pre>\n");
        }
    }
}

fn render_items(out: &mut String, items: &[Vec<Block>], translator: &dyn Translator, simple: bool) {
    for item in items {
        out.push_str("<li>");
        render_blocks(out, item, translator, simple);
        out.push_str("</li>\n");
    }
}

fn render_field_list(out: &mut String, fields: &[Field], translator: &dyn Translator) {
    let simple = fields.iter().all(|f| f.body.len() <= 1);
    translator.field_list_start(out, simple);
    for field in fields {
        translator.field_name(out, &escape(&field.name));
        translator.field_body_start(out, field.body.is_empty());
        render_blocks(out, &field.body, translator, false);
        translator.field_body_end(out);
        translator.field_end(out);
    }
    translator.field_list_end(out);
}

/// Render paragraph text with inline markup
pub fn render_inline(out: &mut String, text: &str) {
    for inline in markup::parse_inline(text) {
        match inline {
            Inline::Text(s) => out.push_str(&escape(&s)),
            Inline::Literal(s) | Inline::Role(_, s) => {
                out.push_str("<span class=\"docutils literal\">");
                out.push_str(&escape(&s));
                out.push_str("</span>");
            }
            Inline::Strong(s) => {
                out.push_str("<strong>");
                out.push_str(&escape(&s));
                out.push_str("</strong>");
            }
            Inline::Emphasis(s) => {
                out.push_str("<em>");
                out.push_str(&escape(&s));
                out.push_str("</em>");
            }
        }
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '@' => out.push_str("&#64;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rst_empty_string() {
        assert_eq!(parse_rst(Some(""), &HtmlTranslator).html, "");
        assert_eq!(parse_rst(None, &HtmlTranslator).html, "");
    }

    #[test]
    fn test_parse_rst_default_field_list() {
        let rendered = parse_rst(Some(":field1: value1\n:field2: value2"), &HtmlTranslator);
        assert_eq!(
            rendered.html,
            concat!(
                "<div class=\"document\">\n",
                "<dl class=\"field-list simple\">\n",
                "<dt>field1<span class=\"colon\">:</span></dt>\n",
                "<dd><p>value1</p>\n",
                "</dd>\n",
                "<dt>field2<span class=\"colon\">:</span></dt>\n",
                "<dd><p>value2</p>\n",
                "</dd>\n",
                "</dl>\n",
                "</div>\n",
            )
        );
    }

    #[test]
    fn test_parse_rst_translator_class() {
        let docstring = "\n    :field1: value1\n    :field2: value2\n    :field3:\n    ";
        let expected = concat!(
            "<div class=\"document\">\n",
            "<blockquote>\n",
            "<table class=\"field-list simple\">\n",
            "<tr><th>field1</th>\n",
            "<td><p>value1</p>\n",
            "</td>\n",
            "</tr>\n",
            "<tr><th>field2</th>\n",
            "<td><p>value2</p>\n",
            "</td>\n",
            "</tr>\n",
            "<tr><th>field3</th>\n",
            "<td><p></p></td>\n",
            "</tr>\n",
            "</table>\n",
            "</blockquote>\n",
            "</div>\n",
        );
        assert_eq!(
            parse_rst(Some(docstring), &TableFieldListTranslator).html,
            expected
        );
    }

    #[test]
    fn test_translators_differ_only_in_field_lists() {
        let text = "Summary.\n\n* item\n";
        assert_eq!(
            parse_rst(Some(text), &HtmlTranslator),
            parse_rst(Some(text), &TableFieldListTranslator)
        );

        let text = ":id: 1\n";
        let table = parse_rst(Some(text), &TableFieldListTranslator).html;
        assert!(table.contains("<tr><th>id</th>\n<td><p>1</p>\n</td>\n</tr>\n"));
        assert!(!table.contains("<dl"));
    }

    #[test]
    fn test_render_lists() {
        let rendered = parse_rst(Some("* item 1\n* item 2"), &HtmlTranslator);
        assert_eq!(
            rendered.html,
            concat!(
                "<div class=\"document\">\n",
                "<ul class=\"simple\">\n",
                "<li><p>item 1</p></li>\n",
                "<li><p>item 2</p></li>\n",
                "</ul>\n",
                "</div>\n",
            )
        );

        let rendered = parse_rst(Some("3. third\n4. fourth"), &HtmlTranslator);
        assert!(rendered
            .html
            .contains("<ol class=\"arabic simple\" start=\"3\">\n<li><p>third</p></li>\n"));
    }

    #[test]
    fn test_render_loose_list_items() {
        let rendered = parse_rst(Some("* para one\n\n  para two\n* next"), &HtmlTranslator);
        assert!(rendered
            .html
            .contains("<ul>\n<li><p>para one</p>\n<p>para two</p>\n</li>\n<li><p>next</p>\n</li>\n</ul>\n"));
    }

    #[test]
    fn test_escape_and_inline() {
        let rendered = parse_rst(Some("Mail <a@b> & use ``x < y``"), &HtmlTranslator);
        assert_eq!(
            rendered.html,
            "<div class=\"document\">\n<p>Mail &lt;a&#64;b&gt; &amp; use <span class=\"docutils literal\">x &lt; y</span></p>\n</div>\n"
        );
    }

    #[test]
    fn test_unparseable_text_rendered_verbatim() {
        let rendered = parse_rst(Some("bad\u{7}text"), &HtmlTranslator);
        assert_eq!(
            rendered.html,
            "<div class=\"document\">\n<p>bad\u{7}text</p>\n</div>\n"
        );
        assert_eq!(rendered.messages[0].level, "severe");
    }
}
