//! HTML to span decomposition for one page.
//!
//! The stages, in pipeline order:
//!
//! - [`images`]: per-record [`PlaceholderIndex`] and `<img>` substitution
//! - [`extractor`]: main-content text extraction behind [`TextExtractor`]
//! - [`segment`]: placeholder-aware sentence segmentation into [`Span`]s
//!
//! [`html`] holds the pretty-printing serializer and the plain-text renderer
//! the stages share.
//!
//! ```
//! use pagesplit_extract::{
//!     replace_images_with_placeholders, ImageInfo, PlaceholderAwareSegmenter, PlaceholderIndex,
//!     Span,
//! };
//!
//! let index = PlaceholderIndex::from_image_info(&[ImageInfo::new("https://x/a.png", "[[IMAGE: a]]")]);
//! let html = replace_images_with_placeholders(&index, r#"<p><img src="/a.png"></p>"#, "https://x/");
//! assert!(html.contains("[[IMAGE: a]]"));
//!
//! let spans = PlaceholderAwareSegmenter::for_language("ja").split("前です。[[IMAGE: a]]後です。");
//! assert_eq!(spans[1], Span::Image("[[IMAGE: a]]".into()));
//! ```

pub mod extractor;
pub mod html;
pub mod images;
pub mod segment;

pub use extractor::{ReadabilityExtractor, TextExtractor};
pub use images::{replace_images_with_placeholders, ImageInfo, PlaceholderIndex};
pub use segment::{
    is_image_placeholder, split_text_by_image_placeholders, PlaceholderAwareSegmenter,
    SentenceSegmenter, Span, UnicodeSentenceSegmenter,
};
