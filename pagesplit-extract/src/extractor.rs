//! Main-content text extraction.
//!
//! [`TextExtractor`] is the seam the pipeline depends on. The default
//! implementation runs readability (via `dom_smoothie`) over a pre-filtered
//! copy of the page and renders the surviving article as plain text.

use std::panic::{self, AssertUnwindSafe};

use dom_smoothie::Readability;
use pagesplit_common::ExtractionOptions;
use scraper::{ElementRef, Html};

use crate::html::{prettify, render_text, ElementRewriter, Rewrite};

/// Reduces a full HTML page to its main textual content.
pub trait TextExtractor: Send + Sync {
    /// Plain text of the page's main content, or `None` when nothing can be
    /// identified with confidence.
    fn extract(&self, html: &str, url: &str) -> Option<String>;
}

/// Readability-based extractor honouring [`ExtractionOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor {
    options: ExtractionOptions,
}

impl ReadabilityExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    fn readable_text(&self, html: &str, url: &str) -> Option<String> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut readability = match Readability::new(html, Some(url), None) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(url, error = %e, "extract.readability_init_failed");
                    return None;
                }
            };
            match readability.parse() {
                Ok(article) => Some(article.content.to_string()),
                Err(e) => {
                    tracing::debug!(url, error = %e, "extract.readability_failed");
                    None
                }
            }
        }));

        let content = match result {
            Ok(content) => content?,
            Err(_) => {
                tracing::warn!(url, "extract.readability_panicked");
                return None;
            }
        };

        let fragment = Html::parse_fragment(&content);
        non_blank(render_text(
            fragment.root_element(),
            self.options.include_formatting,
        ))
    }

    fn body_text(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let body = document
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")?;
        non_blank(render_text(body, self.options.include_formatting))
    }
}

impl TextExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &str) -> Option<String> {
        let filtered = prettify(&Html::parse_document(html), &ContentFilter(self.options));

        if let Some(text) = self.readable_text(&filtered, url) {
            return Some(text);
        }
        if self.options.no_fallback {
            return None;
        }

        tracing::debug!(url, "extract.fallback_to_body");
        self.body_text(&filtered)
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strips what the options exclude before readability sees the page.
struct ContentFilter(ExtractionOptions);

const ALWAYS_DROPPED: &[&str] = &["script", "style", "noscript", "template"];
const IMAGE_ELEMENTS: &[&str] = &["img", "svg"];
const IMAGE_WRAPPERS: &[&str] = &["picture", "figure"];

impl ElementRewriter for ContentFilter {
    fn rewrite(&self, element: ElementRef<'_>) -> Rewrite {
        let name = element.value().name();
        let options = &self.0;

        let dropped = ALWAYS_DROPPED.contains(&name)
            || (!options.include_tables && name == "table")
            || (!options.include_images && is_image_element(element))
            || (!options.include_comments && is_comment_section(element));

        if dropped { Rewrite::Drop } else { Rewrite::Keep }
    }

    fn keep_comments(&self) -> bool {
        false
    }
}

/// Image markup. Wrappers (`<picture>`, `<figure>`) only count when they
/// hold no text of their own, so a placeholder token substituted for the
/// inner `<img>` survives.
fn is_image_element(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    if IMAGE_ELEMENTS.contains(&name) {
        return true;
    }
    IMAGE_WRAPPERS.contains(&name) && element.text().all(|t| t.trim().is_empty())
}

fn is_comment_section(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let id_marks = value.id().is_some_and(marks_comments);
    id_marks || value.classes().any(marks_comments)
}

fn marks_comments(token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    token == "comment"
        || token == "comments"
        || token.starts_with("comment-")
        || token.starts_with("comments-")
        || token.contains("disqus")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{replace_images_with_placeholders, ImageInfo, PlaceholderIndex};

    fn filtered(html: &str, options: ExtractionOptions) -> String {
        prettify(&Html::parse_document(html), &ContentFilter(options))
    }

    #[test]
    fn filter_drops_tables_and_comment_sections_by_default() {
        let html = r#"<body><p>keep me</p><table><tr><td>cell</td></tr></table>
            <div id="comments"><p>first!</p></div><section class="comment-list">spam</section>
            <!-- hidden --></body>"#;
        let out = filtered(html, ExtractionOptions::default());
        assert!(out.contains("keep me"));
        assert!(!out.contains("cell"));
        assert!(!out.contains("first!"));
        assert!(!out.contains("spam"));
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn filter_respects_inclusion_flags() {
        let html = r#"<body><table><tr><td>cell</td></tr></table><div class="comments">hi</div><img src="x.png"></body>"#;
        let options = ExtractionOptions {
            include_tables: true,
            include_comments: true,
            include_images: true,
            ..ExtractionOptions::default()
        };
        let out = filtered(html, options);
        assert!(out.contains("cell"));
        assert!(out.contains("hi"));
        assert!(out.contains("<img"));
    }

    #[test]
    fn filter_keeps_figures_carrying_placeholder_text() {
        let html = r#"<body><figure>[[IMAGE: a]]</figure><figure><img src="b.png"></figure></body>"#;
        let out = filtered(html, ExtractionOptions::default());
        assert!(out.contains("[[IMAGE: a]]"));
        assert!(!out.contains("b.png"));
    }

    #[test]
    fn filter_keeps_pictures_whose_image_became_a_placeholder() {
        let index = PlaceholderIndex::from_image_info(&[ImageInfo::new(
            "https://x/a.png",
            "[[IMAGE: a]]",
        )]);
        let page = r#"<body><p>before</p><picture><source srcset="a.webp"><img src="a.png"></picture>
            <p><picture><img src="a.png"></picture></p><picture><img src="other.png"></picture></body>"#;
        let substituted = replace_images_with_placeholders(&index, page, "https://x/");

        let out = filtered(&substituted, ExtractionOptions::default());
        assert_eq!(out.matches("[[IMAGE: a]]").count(), 2);
        assert_eq!(out.matches("<picture").count(), 2);
        assert!(!out.contains("other.png"));
    }

    #[test]
    fn scripts_never_reach_the_text() {
        let html = "<body><script>alert('x')</script><style>p{}</style><p>visible</p></body>";
        let out = filtered(html, ExtractionOptions { include_images: true, ..Default::default() });
        assert!(!out.contains("alert"));
        assert!(!out.contains("p{}"));
    }

    #[test]
    fn comment_markers_match_whole_tokens() {
        assert!(marks_comments("Comments"));
        assert!(marks_comments("comment-body"));
        assert!(marks_comments("disqus_thread"));
        assert!(!marks_comments("commentary"));
    }

    #[test]
    fn empty_page_has_no_content() {
        let extractor = ReadabilityExtractor::default();
        assert_eq!(extractor.extract("<html><body></body></html>", "https://x/"), None);

        let fallback = ReadabilityExtractor::new(ExtractionOptions {
            no_fallback: false,
            ..Default::default()
        });
        assert_eq!(fallback.extract("<html><body>  </body></html>", "https://x/"), None);
    }

    #[test]
    fn fallback_uses_body_text() {
        let extractor = ReadabilityExtractor::new(ExtractionOptions {
            no_fallback: false,
            ..Default::default()
        });
        let text = extractor
            .extract("<html><body><p>Just a short line.</p></body></html>", "https://x/")
            .expect("body text");
        assert!(text.contains("Just a short line."));
    }
}
