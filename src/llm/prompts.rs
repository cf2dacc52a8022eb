use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prompt wording used for both the per-document and the final answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Plain summarized answers
    #[default]
    Summary,
    /// Scientific answers that keep citations and end with a bibliography
    Scientific,
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" | "general" => Ok(PromptStyle::Summary),
            "scientific" => Ok(PromptStyle::Scientific),
            other => Err(format!("unknown prompt style: {other} (expected summary or scientific)")),
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptStyle::Summary => f.write_str("summary"),
            PromptStyle::Scientific => f.write_str("scientific"),
        }
    }
}

/// Bibliography format requested from the scientific synthesis prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Ieee,
    Harvard,
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apa" => Ok(CitationStyle::Apa),
            "mla" => Ok(CitationStyle::Mla),
            "chicago" => Ok(CitationStyle::Chicago),
            "ieee" => Ok(CitationStyle::Ieee),
            "harvard" => Ok(CitationStyle::Harvard),
            other => Err(format!("unknown citation style: {other}")),
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CitationStyle::Apa => "APA",
            CitationStyle::Mla => "MLA",
            CitationStyle::Chicago => "Chicago",
            CitationStyle::Ieee => "IEEE",
            CitationStyle::Harvard => "Harvard",
        };
        f.write_str(name)
    }
}

/// Build the prompt that answers the question from a single document
pub fn build_document_prompt(style: PromptStyle, question: &str, context: &str) -> String {
    match style {
        PromptStyle::Summary => format!(
            "Answer the question {question} in a summarized form using this context: {context}"
        ),
        PromptStyle::Scientific => format!(
            "Answer the question {question} in a scientific form using this context: {context}\n\n\
             Keep the citation details of the source (authors, year and title) so the \
             answer can be cited later."
        ),
    }
}

/// Build the prompt that merges all per-document answers into one
pub fn build_synthesis_prompt(
    style: PromptStyle,
    citation_style: CitationStyle,
    question: &str,
    pre_answers: &[String],
) -> String {
    let answers = format_pre_answers(pre_answers);

    match style {
        PromptStyle::Summary => format!(
            "Write a final and unified answer to the question {question} following these pre-answers:\n{answers}"
        ),
        PromptStyle::Scientific => format!(
            "Write a final and unified answer to the question {question} as a single scientific \
             paragraph, using these pre-answers:\n{answers}\n\n\
             Preserve the in-text citations of the pre-answers and finish with a bibliography \
             of the cited works in {citation_style} style."
        ),
    }
}

/// Render pre-answers as a numbered list
fn format_pre_answers(pre_answers: &[String]) -> String {
    if pre_answers.is_empty() {
        return "(no partial answers were found; answer from general knowledge and say that no sources were available)".to_string();
    }

    pre_answers
        .iter()
        .enumerate()
        .map(|(i, answer)| format!("[{}] {}", i + 1, answer.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
