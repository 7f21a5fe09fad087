//! Placeholder-aware sentence segmentation.
//!
//! Extracted text is first cut on image placeholder tokens (keeping the
//! tokens), then every stretch of prose between tokens goes through a
//! language-aware sentence segmenter.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Literal `[[IMAGE: <payload>]]`; the payload may hold anything except the
/// closing marker, newlines included.
pub static IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\[IMAGE: .*?\]\]").unwrap());

/// True when `segment` is exactly one placeholder token.
///
/// ```
/// use pagesplit_extract::segment::is_image_placeholder;
///
/// assert!(is_image_placeholder("[[IMAGE: cat.png]]"));
/// assert!(!is_image_placeholder(" [[IMAGE: cat.png]]"));
/// assert!(!is_image_placeholder("[[IMAGE: a]] and [[IMAGE: b]]"));
/// ```
pub fn is_image_placeholder(segment: &str) -> bool {
    IMAGE_PATTERN
        .find(segment)
        .is_some_and(|m| m.start() == 0 && m.end() == segment.len())
}

/// One piece of text after cutting on placeholder tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Placeholder(&'a str),
    Text(&'a str),
}

/// Capture-preserving split on placeholder tokens.
///
/// Tokens come back as their own pieces in original order; empty text
/// between adjacent tokens (or at either end) is dropped.
///
/// ```
/// use pagesplit_extract::segment::{split_text_by_image_placeholders, Segment};
///
/// let pieces = split_text_by_image_placeholders("a [[IMAGE: 1]][[IMAGE: 2]] b");
/// assert_eq!(
///     pieces,
///     vec![
///         Segment::Text("a "),
///         Segment::Placeholder("[[IMAGE: 1]]"),
///         Segment::Placeholder("[[IMAGE: 2]]"),
///         Segment::Text(" b"),
///     ]
/// );
/// ```
pub fn split_text_by_image_placeholders(text: &str) -> Vec<Segment<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in IMAGE_PATTERN.find_iter(text) {
        if m.start() > last {
            pieces.push(Segment::Text(&text[last..m.start()]));
        }
        pieces.push(Segment::Placeholder(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        pieces.push(Segment::Text(&text[last..]));
    }
    pieces
}

/// One element of a record's `text_list`.
///
/// Serialized as a bare string; deserializing classifies the string back
/// into an image marker or a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Span {
    Image(String),
    Sentence(String),
}

impl Span {
    pub fn as_str(&self) -> &str {
        match self {
            Span::Image(s) | Span::Sentence(s) => s,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Span::Image(_))
    }
}

impl From<String> for Span {
    fn from(value: String) -> Self {
        if is_image_placeholder(&value) {
            Span::Image(value)
        } else {
            Span::Sentence(value)
        }
    }
}

impl From<Span> for String {
    fn from(span: Span) -> Self {
        match span {
            Span::Image(s) | Span::Sentence(s) => s,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentence rules to apply on top of Unicode sentence boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
    Generic,
}

impl Language {
    /// Map a language tag (`ja`, `en-US`, `ja_JP`, ...) by its primary subtag.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "ja" | "jpn" => Language::Japanese,
            "en" | "eng" => Language::English,
            _ => Language::Generic,
        }
    }
}

/// Language-aware sentence splitting of plain text.
pub trait SentenceSegmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

const OPEN_BRACKETS: &[char] = &['「', '『', '（', '【', '〈', '《', '［', '(', '['];
const CLOSE_BRACKETS: &[char] = &['」', '』', '）', '】', '〉', '》', '］', ')', ']'];

/// Particles that attach a closed quotation to the clause reporting it.
const QUOTATIVE_PARTICLES: &[&str] = &["と", "って"];

const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "vs.", "no.", "fig.", "e.g.",
    "i.e.", "approx.", "dept.", "inc.", "ltd.", "co.", "jan.", "feb.", "aug.", "sept.", "oct.",
    "nov.", "dec.",
];

/// UAX #29 sentence boundaries refined per language.
///
/// Line breaks are always boundaries. Japanese keeps a bracketed quotation
/// together when its closing bracket follows on the same line, and joins
/// `「…」と` / `「…」って` to the reporting clause. English does not end a
/// sentence on a known abbreviation or an initial.
///
/// ```
/// use pagesplit_extract::segment::{Language, SentenceSegmenter, UnicodeSentenceSegmenter};
///
/// let en = UnicodeSentenceSegmenter::new(Language::English);
/// assert_eq!(
///     en.segment("Dr. Watson arrived. He sat down."),
///     vec!["Dr. Watson arrived.", "He sat down."]
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UnicodeSentenceSegmenter {
    language: Language,
}

impl UnicodeSentenceSegmenter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn for_tag(tag: &str) -> Self {
        Self::new(Language::from_tag(tag))
    }

    /// Whether a Unicode boundary between `sentence` and `next` should be
    /// ignored. `rest` is the remainder of the line, starting with `next`.
    fn continues(&self, sentence: &str, next: &str, rest: &str) -> bool {
        if next.trim().is_empty() {
            return true;
        }
        match self.language {
            Language::Japanese => {
                let sentence = sentence.trim_end();
                let quote_open = open_bracket(sentence)
                    .is_some_and(|close| rest.contains(close));
                let reported = sentence.ends_with(CLOSE_BRACKETS)
                    && QUOTATIVE_PARTICLES.iter().any(|p| next.starts_with(*p));
                quote_open || reported || next.starts_with(CLOSE_BRACKETS)
            }
            Language::English => {
                let last_word = sentence
                    .trim_end()
                    .rsplit(char::is_whitespace)
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches(OPEN_BRACKETS);
                is_abbreviation(last_word) || is_initial(last_word)
            }
            Language::Generic => false,
        }
    }
}

impl SentenceSegmenter for UnicodeSentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut current = String::new();
            for (offset, piece) in line.split_sentence_bound_indices() {
                if !current.is_empty() && !self.continues(&current, piece, &line[offset..]) {
                    sentences.push(current.trim_end().to_string());
                    current.clear();
                }
                current.push_str(piece);
            }
            if !current.trim().is_empty() {
                sentences.push(current.trim_end().to_string());
            }
        }
        sentences
    }
}

/// Closing bracket for the innermost bracket still open at the end of `text`.
fn open_bracket(text: &str) -> Option<char> {
    let mut expected = Vec::new();
    for ch in text.chars() {
        if let Some(i) = OPEN_BRACKETS.iter().position(|&o| o == ch) {
            expected.push(CLOSE_BRACKETS[i]);
        } else if expected.last() == Some(&ch) {
            expected.pop();
        }
    }
    expected.pop()
}

fn is_abbreviation(word: &str) -> bool {
    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

/// Splits extracted text into placeholder and sentence spans.
pub struct PlaceholderAwareSegmenter {
    sentences: Box<dyn SentenceSegmenter>,
}

impl PlaceholderAwareSegmenter {
    pub fn new(sentences: Box<dyn SentenceSegmenter>) -> Self {
        Self { sentences }
    }

    pub fn for_language(tag: &str) -> Self {
        Self::new(Box::new(UnicodeSentenceSegmenter::for_tag(tag)))
    }

    /// Ordered spans of `text`: whole placeholder tokens untouched, prose
    /// split into sentences with trailing whitespace stripped and blank
    /// sentences dropped.
    ///
    /// ```
    /// use pagesplit_extract::segment::{PlaceholderAwareSegmenter, Span};
    ///
    /// let segmenter = PlaceholderAwareSegmenter::for_language("en");
    /// let spans = segmenter.split("See below. [[IMAGE: a]] That was it.");
    /// assert_eq!(
    ///     spans,
    ///     vec![
    ///         Span::Sentence("See below.".into()),
    ///         Span::Image("[[IMAGE: a]]".into()),
    ///         Span::Sentence("That was it.".into()),
    ///     ]
    /// );
    /// ```
    pub fn split(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        for piece in split_text_by_image_placeholders(text) {
            match piece {
                Segment::Placeholder(token) => spans.push(Span::Image(token.to_string())),
                Segment::Text(prose) => spans.extend(
                    self.sentences
                        .segment(prose)
                        .into_iter()
                        .map(|s| s.trim_end().to_string())
                        .filter(|s| !s.trim().is_empty())
                        .map(Span::Sentence),
                ),
            }
        }
        spans
    }
}

impl fmt::Debug for PlaceholderAwareSegmenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderAwareSegmenter").finish_non_exhaustive()
    }
}
