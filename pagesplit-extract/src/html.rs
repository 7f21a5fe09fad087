//! HTML serialization and plain-text rendering over a parsed `scraper` tree.
//!
//! [`prettify`] re-serializes a document one node per line with one space of
//! indentation per level, giving every element a chance to be kept, dropped
//! or replaced by a plain-text line on the way out. [`render_text`] flattens
//! an element into newline-separated blocks of collapsed inline text.

use scraper::{ElementRef, Html, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const PRESERVE_WHITESPACE: &[&str] = &["pre", "textarea"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "caption",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "html",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

const NON_TEXT_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// What to do with an element while serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    Drop,
    /// Emit the given text as a standalone text line instead of the element.
    Replace(String),
}

/// Per-element hook consulted by [`prettify`].
pub trait ElementRewriter {
    fn rewrite(&self, element: ElementRef<'_>) -> Rewrite;

    /// Whether `<!-- ... -->` nodes survive serialization.
    fn keep_comments(&self) -> bool {
        true
    }
}

/// Serialize a document, running every element through `rewriter`.
///
/// ```
/// use pagesplit_extract::html::{prettify, ElementRewriter, Rewrite};
/// use scraper::{ElementRef, Html};
///
/// struct KeepAll;
/// impl ElementRewriter for KeepAll {
///     fn rewrite(&self, _: ElementRef<'_>) -> Rewrite {
///         Rewrite::Keep
///     }
/// }
///
/// let doc = Html::parse_document("<p>Hi <b>there</b></p>");
/// let out = prettify(&doc, &KeepAll);
/// assert!(out.contains("  <p>\n   Hi\n   <b>\n    there\n   </b>\n  </p>"));
/// ```
pub fn prettify(document: &Html, rewriter: &dyn ElementRewriter) -> String {
    let mut out = String::new();
    for node in document.tree.root().children() {
        match node.value() {
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push_str(">\n");
            }
            Node::Comment(comment) if rewriter.keep_comments() => {
                write_comment(&mut out, comment, 0);
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    write_element(&mut out, element, 0, rewriter);
                }
            }
            _ => {}
        }
    }
    out
}

fn write_element(
    out: &mut String,
    element: ElementRef<'_>,
    depth: usize,
    rewriter: &dyn ElementRewriter,
) {
    match rewriter.rewrite(element) {
        Rewrite::Drop => return,
        Rewrite::Replace(text) => {
            write_text(out, &text, depth);
            return;
        }
        Rewrite::Keep => {}
    }

    let name = element.value().name();
    push_indent(out, depth);
    if PRESERVE_WHITESPACE.contains(&name) {
        out.push_str(&element.html());
        out.push('\n');
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    out.push_str(">\n");

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let raw = RAW_TEXT_ELEMENTS.contains(&name);
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if raw {
                    push_indent(out, depth + 1);
                    out.push_str(trimmed);
                    out.push('\n');
                } else {
                    write_text(out, trimmed, depth + 1);
                }
            }
            Node::Comment(comment) if rewriter.keep_comments() => {
                write_comment(out, comment, depth + 1);
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_element(out, child_el, depth + 1, rewriter);
                }
            }
            _ => {}
        }
    }

    push_indent(out, depth);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn write_text(out: &mut String, text: &str, depth: usize) {
    push_indent(out, depth);
    escape_into(out, text, false);
    out.push('\n');
}

fn write_comment(out: &mut String, comment: &str, depth: usize) {
    push_indent(out, depth);
    out.push_str("<!--");
    out.push_str(comment);
    out.push_str("-->\n");
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push(' ');
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Flatten an element into plain text.
///
/// Block-level elements start new lines, `<br>` breaks a line, and runs of
/// inline whitespace collapse to one space. A line break that only separates
/// two CJK characters is dropped instead of becoming a space. With
/// `formatting`, headings, list items and quotes keep a markdown-style prefix.
///
/// ```
/// use pagesplit_extract::html::render_text;
/// use scraper::Html;
///
/// let doc = Html::parse_fragment("<h2>Title</h2><p>One\n  two <i>three</i></p>");
/// assert_eq!(render_text(doc.root_element(), false), "Title\nOne two three");
/// assert_eq!(render_text(doc.root_element(), true), "## Title\nOne two three");
/// ```
pub fn render_text(root: ElementRef<'_>, formatting: bool) -> String {
    let mut renderer = TextRenderer {
        formatting,
        lines: Vec::new(),
        current: String::new(),
        prefix: None,
        gap: Gap::None,
    };
    renderer.walk(root);
    renderer.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

struct TextRenderer {
    formatting: bool,
    lines: Vec<String>,
    current: String,
    prefix: Option<&'static str>,
    gap: Gap,
}

impl TextRenderer {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if NON_TEXT_ELEMENTS.contains(&name) {
            return;
        }
        if name == "br" {
            self.break_line();
            return;
        }

        let block = BLOCK_ELEMENTS.contains(&name);
        if block {
            self.break_line();
            if self.formatting {
                if let Some(prefix) = block_prefix(name) {
                    self.prefix = Some(prefix);
                }
            }
        }
        self.walk(element);
        if block {
            self.break_line();
        }
    }

    fn push_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.gap = match (self.gap, ch) {
                    (Gap::Newline, _) | (_, '\n') => Gap::Newline,
                    _ => Gap::Space,
                };
                continue;
            }

            if let Some(last) = self.current.chars().last() {
                let separate = match self.gap {
                    Gap::None => false,
                    Gap::Space => true,
                    Gap::Newline => !(is_cjk(last) && is_cjk(ch)),
                };
                if separate {
                    self.current.push(' ');
                }
            }
            self.gap = Gap::None;
            self.current.push(ch);
        }
    }

    fn break_line(&mut self) {
        let line = self.current.trim();
        if !line.is_empty() {
            let rendered = match self.prefix.take() {
                Some(prefix) => format!("{prefix}{line}"),
                None => line.to_string(),
            };
            self.lines.push(rendered);
        }
        self.current.clear();
        self.gap = Gap::None;
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

fn block_prefix(name: &str) -> Option<&'static str> {
    match name {
        "h1" => Some("# "),
        "h2" => Some("## "),
        "h3" => Some("### "),
        "h4" => Some("#### "),
        "h5" => Some("##### "),
        "h6" => Some("###### "),
        "li" => Some("- "),
        "blockquote" => Some("> "),
        _ => None,
    }
}

/// Scripts written without inter-word spaces.
fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}' // half/full-width forms
    )
}
