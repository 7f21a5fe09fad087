//! Image placeholders: the per-record URL index and `<img>` substitution.
//!
//! Every `<img>` whose resolved source URL is known to the record is replaced
//! by its placeholder token as plain text; known-unknown images are removed;
//! images without a usable source are left alone.

use std::cell::Cell;
use std::collections::HashMap;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::html::{prettify, ElementRewriter, Rewrite};

/// One known image on the source page.
///
/// Fields beyond `url` and `placeholder` are carried along untouched so the
/// output record can echo the input metadata verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub url: String,
    pub placeholder: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageInfo {
    pub fn new(url: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            placeholder: placeholder.into(),
            extra: Map::new(),
        }
    }
}

/// Lookup from absolute image URL to placeholder token for one record.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderIndex {
    by_url: HashMap<String, String>,
}

impl PlaceholderIndex {
    /// Build the index; when a URL repeats, the last entry wins.
    ///
    /// ```
    /// use pagesplit_extract::images::{ImageInfo, PlaceholderIndex};
    /// use url::Url;
    ///
    /// let index = PlaceholderIndex::from_image_info(&[
    ///     ImageInfo::new("https://x/a.png", "[[IMAGE: first]]"),
    ///     ImageInfo::new("https://x/a.png", "[[IMAGE: second]]"),
    /// ]);
    /// let url = Url::parse("https://x/a.png").unwrap();
    /// assert_eq!(index.lookup(&url), Some("[[IMAGE: second]]"));
    /// assert_eq!(index.len(), 1);
    /// ```
    pub fn from_image_info(images: &[ImageInfo]) -> Self {
        Self::build(images, None)
    }

    /// Like [`from_image_info`](Self::from_image_info), but relative entry
    /// URLs are resolved against the page they came from.
    ///
    /// ```
    /// use pagesplit_extract::images::{ImageInfo, PlaceholderIndex};
    /// use url::Url;
    ///
    /// let index = PlaceholderIndex::with_base(
    ///     &[ImageInfo::new("/img/a.png", "[[IMAGE: a]]")],
    ///     "https://x/articles/today.html",
    /// );
    /// let url = Url::parse("https://x/img/a.png").unwrap();
    /// assert_eq!(index.lookup(&url), Some("[[IMAGE: a]]"));
    /// ```
    pub fn with_base(images: &[ImageInfo], page_url: &str) -> Self {
        Self::build(images, Url::parse(page_url).ok().as_ref())
    }

    fn build(images: &[ImageInfo], base: Option<&Url>) -> Self {
        let by_url = images
            .iter()
            .map(|image| (normalize_url(&image.url, base), image.placeholder.clone()))
            .collect();
        Self { by_url }
    }

    pub fn lookup(&self, url: &Url) -> Option<&str> {
        self.by_url.get(url.as_str()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

/// Keys go through the same URL normalization as resolved `src` values so
/// `https://X/a%20b.png` and `https://x/a b.png` meet in the middle.
fn normalize_url(raw: &str, base: Option<&Url>) -> String {
    let trimmed = raw.trim();
    let parsed = match (Url::parse(trimmed), base) {
        (Ok(url), _) => Ok(url),
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(trimmed),
        (Err(e), _) => Err(e),
    };
    match parsed {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::warn!(url = raw, error = %e, "images.index_key_unresolved");
            raw.to_string()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("cannot resolve image source {src:?}: {reason}")]
    Resolve { src: String, reason: String },
}

/// Outcome for a single image element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDecision<'a> {
    /// Resolved URL is in the index: substitute the placeholder token.
    Matched(&'a str),
    /// No usable source attribute: leave the element as it is.
    AbsentUrl,
    /// Resolved URL is not in the index: remove the element.
    UnmatchedUrl,
}

/// Decide what happens to an image with the given source attribute.
///
/// ```
/// use pagesplit_extract::images::{decide, ImageDecision, ImageInfo, PlaceholderIndex};
/// use url::Url;
///
/// let index = PlaceholderIndex::from_image_info(&[ImageInfo::new("https://x/a.png", "[[IMAGE: a]]")]);
/// let base = Url::parse("https://x/page.html").unwrap();
///
/// assert_eq!(decide(&index, Some("a.png"), Some(&base)).unwrap(), ImageDecision::Matched("[[IMAGE: a]]"));
/// assert_eq!(decide(&index, Some("b.png"), Some(&base)).unwrap(), ImageDecision::UnmatchedUrl);
/// assert_eq!(decide(&index, None, Some(&base)).unwrap(), ImageDecision::AbsentUrl);
/// ```
pub fn decide<'a>(
    index: &'a PlaceholderIndex,
    src: Option<&str>,
    base: Option<&Url>,
) -> Result<ImageDecision<'a>, SubstitutionError> {
    let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(ImageDecision::AbsentUrl);
    };

    let resolved = match (Url::parse(src), base) {
        (Ok(url), _) => url,
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => {
            base.join(src).map_err(|e| SubstitutionError::Resolve {
                src: src.to_string(),
                reason: e.to_string(),
            })?
        }
        (Err(e), _) => {
            return Err(SubstitutionError::Resolve {
                src: src.to_string(),
                reason: e.to_string(),
            });
        }
    };

    Ok(match index.lookup(&resolved) {
        Some(placeholder) => ImageDecision::Matched(placeholder),
        None => ImageDecision::UnmatchedUrl,
    })
}

/// The image's source: `src`, or the lazy-load `data-src` when `src` is
/// missing or blank.
fn image_source<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    let value = element.value();
    value
        .attr("src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| value.attr("data-src"))
}

/// Per-document counts, logged once substitution finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionStats {
    pub matched: usize,
    pub removed: usize,
    pub untouched: usize,
    pub errors: usize,
}

struct ImageSubstituter<'a> {
    index: &'a PlaceholderIndex,
    base: Option<&'a Url>,
    stats: Cell<SubstitutionStats>,
}

impl ImageSubstituter<'_> {
    fn bump(&self, f: impl FnOnce(&mut SubstitutionStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl ElementRewriter for ImageSubstituter<'_> {
    fn rewrite(&self, element: ElementRef<'_>) -> Rewrite {
        if element.value().name() != "img" {
            return Rewrite::Keep;
        }

        match decide(self.index, image_source(&element), self.base) {
            Ok(ImageDecision::Matched(placeholder)) => {
                self.bump(|s| s.matched += 1);
                Rewrite::Replace(placeholder.to_string())
            }
            Ok(ImageDecision::UnmatchedUrl) => {
                self.bump(|s| s.removed += 1);
                Rewrite::Drop
            }
            Ok(ImageDecision::AbsentUrl) => {
                self.bump(|s| s.untouched += 1);
                Rewrite::Keep
            }
            Err(e) => {
                tracing::warn!(error = %e, "images.resolve_failed");
                self.bump(|s| s.errors += 1);
                Rewrite::Keep
            }
        }
    }
}

/// Replace `<img>` elements with their placeholder tokens.
///
/// Never fails: unparseable markup is handled by the HTML5 parser's error
/// recovery, and an image whose source cannot be resolved is left in place
/// with a warning. The result is pretty-printed HTML.
///
/// ```
/// use pagesplit_extract::images::{replace_images_with_placeholders, ImageInfo, PlaceholderIndex};
///
/// let index = PlaceholderIndex::from_image_info(&[ImageInfo::new("https://x/a.png", "[[IMAGE: a]]")]);
/// let html = r#"<p>Before <img src="a.png"> after <img src="other.png"></p>"#;
/// let out = replace_images_with_placeholders(&index, html, "https://x/index.html");
///
/// assert!(out.lines().any(|line| line.trim() == "[[IMAGE: a]]"));
/// assert!(!out.contains("<img"));
/// ```
pub fn replace_images_with_placeholders(
    index: &PlaceholderIndex,
    html: &str,
    base_url: &str,
) -> String {
    let (out, stats) = substitute_with_stats(index, html, base_url);
    tracing::debug!(
        matched = stats.matched,
        removed = stats.removed,
        untouched = stats.untouched,
        errors = stats.errors,
        "images.substituted"
    );
    out
}

/// Like [`replace_images_with_placeholders`], also returning the counts.
pub fn substitute_with_stats(
    index: &PlaceholderIndex,
    html: &str,
    base_url: &str,
) -> (String, SubstitutionStats) {
    let base = match Url::parse(base_url) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(base_url, error = %e, "images.base_url_invalid");
            None
        }
    };

    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        tracing::debug!(
            parse_errors = document.errors.len(),
            "images.markup_recovered"
        );
    }

    let substituter = ImageSubstituter {
        index,
        base: base.as_ref(),
        stats: Cell::new(SubstitutionStats::default()),
    };
    let out = prettify(&document, &substituter);
    (out, substituter.stats.get())
}
