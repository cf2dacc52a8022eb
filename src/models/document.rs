use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key for the publication date (e.g. "2023-05-17")
pub const META_PUBLISHED: &str = "Published";
/// Metadata key for the document title
pub const META_TITLE: &str = "Title";
/// Metadata key for the comma-separated author list
pub const META_AUTHORS: &str = "Authors";
/// Metadata key for the source identifier
pub const META_ENTRY_ID: &str = "Entry ID";

/// A document returned by the retrieval backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document body
    pub text: String,
    /// Optional structured metadata (see the `META_*` keys)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.meta(META_TITLE)
    }

    pub fn authors(&self) -> Option<&str> {
        self.meta(META_AUTHORS)
    }

    /// Publication year, taken from the leading digits of the published date
    pub fn year(&self) -> Option<&str> {
        let published = self.meta(META_PUBLISHED)?;
        let year = published.get(..4)?;
        year.chars().all(|c| c.is_ascii_digit()).then_some(year)
    }

    /// Format the document as a single context entry
    ///
    /// With `with_citation` the body is followed by the year, title and
    /// authors lines that are available; otherwise only the body is kept.
    pub fn to_context_entry(&self, with_citation: bool) -> String {
        let mut entry = self.text.trim().to_string();
        if !with_citation {
            return entry;
        }

        if let Some(year) = self.year() {
            entry.push_str(&format!("\nPublished: {}", year));
        }
        if let Some(title) = self.title() {
            entry.push_str(&format!("\nTitle: {}", title));
        }
        if let Some(authors) = self.authors() {
            entry.push_str(&format!("\nAuthors: {}", authors));
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> Document {
        Document::new("  Entanglement is a correlation.  ")
            .with_metadata(META_PUBLISHED, "2019-03-04")
            .with_metadata(META_TITLE, "On Entanglement")
            .with_metadata(META_AUTHORS, "A. Einstein, B. Podolsky")
    }

    #[test]
    fn test_plain_entry_is_text_only() {
        assert_eq!(paper().to_context_entry(false), "Entanglement is a correlation.");
    }

    #[test]
    fn test_citation_entry_appends_metadata() {
        assert_eq!(
            paper().to_context_entry(true),
            "Entanglement is a correlation.\nPublished: 2019\nTitle: On Entanglement\nAuthors: A. Einstein, B. Podolsky"
        );
    }

    #[test]
    fn test_citation_entry_skips_missing_or_malformed_fields() {
        let doc = Document::new("body")
            .with_metadata(META_PUBLISHED, "n/a")
            .with_metadata(META_TITLE, "   ");
        assert_eq!(doc.to_context_entry(true), "body");
        assert!(doc.year().is_none());
    }
}
