use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::RenderError;

/// Turns a title and body into a persisted document
pub trait DocumentRenderer: Send + Sync {
    /// Write the document and return where it was stored
    fn render(&self, title: &str, body: &str) -> Result<PathBuf, RenderError>;
}

/// Configuration for the Markdown renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory the documents are written to
    pub output_dir: PathBuf,
    /// Authorship line of every document
    pub author: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("answers"),
            author: "paperqa".to_string(),
        }
    }
}

/// An answer laid out as a titled document
#[derive(Debug, Clone)]
pub struct AnswerDocument<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub generated_at: DateTime<Utc>,
    pub body: &'a str,
}

impl AnswerDocument<'_> {
    /// Format as Markdown
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("# {}\n\n", self.title.trim()));
        output.push_str(&format!("Author: {}\n\n", self.author));
        output.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        output.push_str("## Answer\n\n");
        output.push_str(self.body.trim());
        output.push('\n');
        output
    }
}

/// Writes `<output_dir>/<slug>.md` documents
pub struct MarkdownRenderer {
    config: RenderConfig,
}

impl MarkdownRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Path the document for `title` is written to
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}.md", slugify(title)))
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, title: &str, body: &str) -> Result<PathBuf, RenderError> {
        let document = AnswerDocument {
            title,
            author: &self.config.author,
            generated_at: Utc::now(),
            body,
        };

        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| RenderError::Io {
            path: self.config.output_dir.clone(),
            source,
        })?;

        let path = self.path_for(title);
        write_text(&path, &document.format())?;
        Ok(path)
    }
}

/// Longest slug kept before the hash suffix, in bytes
const MAX_SLUG_BYTES: usize = 100;

/// Derive a filesystem-safe file stem from a title
///
/// Lower-cases, joins words with `_` and drops anything that is not a
/// letter, digit, `_` or `-`. A slug that comes out empty or has to be cut
/// to `MAX_SLUG_BYTES` gets a short hash of the full title appended.
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .split_whitespace()
        .map(|word| {
            word.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() {
        return format!("answer-{}", title_hash(title));
    }
    if slug.len() <= MAX_SLUG_BYTES {
        return slug;
    }

    let mut cut = MAX_SLUG_BYTES;
    while !slug.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}-{}", slug[..cut].trim_end_matches('_'), title_hash(title))
}

fn title_hash(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hex::encode(&hasher.finalize()[..4])
}

fn write_text(path: &Path, content: &str) -> Result<(), RenderError> {
    let mut file = std::fs::File::create(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Write any serializable value as pretty JSON
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), RenderError> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &json)
}
