//! Input and output record shapes, and the assembler joining them.

use pagesplit_extract::{ImageInfo, PlaceholderIndex, Span};
use serde::{Deserialize, Serialize};

/// One input line: a page to fetch plus the images already known on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub url: String,
    #[serde(default)]
    pub image_info: Vec<ImageInfo>,
}

impl Record {
    /// Index over `image_info`; relative entries resolve against `url`.
    pub fn placeholder_index(&self) -> PlaceholderIndex {
        PlaceholderIndex::with_base(&self.image_info, &self.url)
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub url: String,
    /// Full extracted text with placeholder tokens embedded verbatim.
    pub text: String,
    /// `text` decomposed into placeholder and sentence spans.
    pub text_list: Vec<Span>,
    pub image_info: Vec<ImageInfo>,
}

/// Combine a record with its extraction results. `image_info` is copied
/// through untouched.
///
/// ```
/// use pagesplit_pipeline::record::{assemble, Record};
/// use pagesplit_extract::Span;
///
/// let record = Record { doc_id: "d1".into(), url: "https://x/".into(), image_info: vec![] };
/// let out = assemble(&record, "文。".into(), vec![Span::Sentence("文。".into())]);
/// assert_eq!(out.doc_id, "d1");
/// assert_eq!(out.text_list.len(), 1);
/// ```
pub fn assemble(record: &Record, text: String, text_list: Vec<Span>) -> OutputRecord {
    OutputRecord {
        doc_id: record.doc_id.clone(),
        url: record.url.clone(),
        text,
        text_list,
        image_info: record.image_info.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reads_camel_case_doc_id_and_defaults_images() {
        let record: Record =
            serde_json::from_str(r#"{"docId":"abc","url":"https://x/"}"#).unwrap();
        assert_eq!(record.doc_id, "abc");
        assert!(record.image_info.is_empty());
        assert!(record.placeholder_index().is_empty());
    }

    #[test]
    fn relative_image_urls_are_keyed_by_the_record_url() {
        let record: Record = serde_json::from_str(
            r#"{"docId":"r","url":"https://x/news/a.html","image_info":[{"url":"../img/p.png","placeholder":"[[IMAGE: p]]"}]}"#,
        )
        .unwrap();
        let index = record.placeholder_index();
        let url = url::Url::parse("https://x/img/p.png").unwrap();
        assert_eq!(index.lookup(&url), Some("[[IMAGE: p]]"));
    }

    #[test]
    fn output_keeps_field_order_and_unicode() {
        let record = Record {
            doc_id: "d".into(),
            url: "https://x/".into(),
            image_info: vec![ImageInfo::new("https://x/a.png", "[[IMAGE: a]]")],
        };
        let out = assemble(
            &record,
            "猫。[[IMAGE: a]]".into(),
            vec![Span::Sentence("猫。".into()), Span::Image("[[IMAGE: a]]".into())],
        );
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(
            json,
            r#"{"docId":"d","url":"https://x/","text":"猫。[[IMAGE: a]]","text_list":["猫。","[[IMAGE: a]]"],"image_info":[{"url":"https://x/a.png","placeholder":"[[IMAGE: a]]"}]}"#
        );
    }
}
