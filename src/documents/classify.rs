//! Document classification and patent metadata extraction.
//!
//! Classification is a keyword heuristic over the first page of text: any
//! marker from the US patent front page classifies the document as a patent,
//! everything else is treated as a research paper. Misclassification is
//! tolerated and only degrades metadata quality, it never fails ingestion.

use regex::Regex;
use std::sync::LazyLock;

use super::NOT_FOUND;

/// First-page markers that identify a US patent document. Matched
/// case-insensitively by containment.
const PATENT_KEYWORDS: &[&str] = &[
    "united states patent",
    "patent application publication",
    "patent no.",
    "(72) inventors",
    "(73) assignee",
];

/// Two-valued classification driving the metadata-extraction strategy.
/// Not persisted; only the extracted fields are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Patent,
    Paper,
}

impl DocumentType {
    /// Classify a document from its first page of text.
    pub fn classify(first_page_text: &str) -> Self {
        let lower = first_page_text.to_lowercase();
        if PATENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            DocumentType::Patent
        } else {
            DocumentType::Paper
        }
    }
}

/// Fields extracted from a US patent front page. A field whose structural
/// marker did not match holds the `"Not Found"` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct PatentMetadata {
    pub patent_id: String,
    pub title: String,
    pub inventors: String,
    pub assignee: String,
    pub publication_date: String,
}

// Patterns keyed to the numbered-section convention of the US patent front
// page: (54) title, (72) inventors, (73) assignee, (45) date of patent,
// (10)/(12) patent number. Free-text fields run until the next numbered
// section or end of input.
static PATENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(12\)\s*United States Patent.*?\(10\)\s*Patent No\.:\s*(US\s?[\d,]+)")
        .expect("patent id pattern is valid")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(54\)\s*(.*?)\(7[0-9]\)").expect("title pattern is valid")
});
static INVENTORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(72\)\s*Inventors?:\s*(.*?)(?:\n\s*\(|\z)")
        .expect("inventors pattern is valid")
});
static ASSIGNEE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(73\)\s*Assignee:\s*(.*?)(?:\n\s*\(|\z)").expect("assignee pattern is valid")
});
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(45\)\s*Date of Patent:\s*(.*?)(?:\n\s*\(|\z)")
        .expect("date pattern is valid")
});

/// Extract patent metadata from first-page text.
///
/// Each field is matched independently; a failed match yields `"Not Found"`
/// rather than an error. Multi-line matches are collapsed to a single line.
pub fn extract_patent_metadata(first_page_text: &str) -> PatentMetadata {
    PatentMetadata {
        patent_id: capture(&PATENT_ID_RE, first_page_text),
        title: capture(&TITLE_RE, first_page_text),
        inventors: capture(&INVENTORS_RE, first_page_text),
        assignee: capture(&ASSIGNEE_RE, first_page_text),
        publication_date: capture(&DATE_RE, first_page_text),
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| normalize(m.as_str()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Collapse line breaks and whitespace runs to single spaces and trim.
fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATENT_FRONT_PAGE: &str = "\
(12) United States Patent\n\
Milanese et al.\n\
(10) Patent No.: US 11,234,567\n\
(45) Date of Patent: Aug. 2, 2022\n\
(54) METHOD AND APPARATUS FOR\n\
     ADAPTIVE SIGNAL FILTERING\n\
(71) Applicant: Example Industries, Inc.\n\
(72) Inventors: Anna Milanese, Boston, MA (US);\n\
     Piotr Kowalski, Cambridge, MA (US)\n\
(73) Assignee: Example Industries, Inc.,\n\
     Wilmington, DE (US)\n";

    #[test]
    fn test_classifies_patent_any_case() {
        assert_eq!(
            DocumentType::classify("UNITED STATES PATENT application"),
            DocumentType::Patent
        );
        assert_eq!(
            DocumentType::classify("filed under Patent No. 1234"),
            DocumentType::Patent
        );
    }

    #[test]
    fn test_classifies_paper_without_keywords() {
        let text = "Abstract\nWe present a study of adaptive signal filtering.";
        assert_eq!(DocumentType::classify(text), DocumentType::Paper);
    }

    #[test]
    fn test_extracts_all_fields() {
        let meta = extract_patent_metadata(PATENT_FRONT_PAGE);
        assert_eq!(meta.patent_id, "US 11,234,567");
        assert_eq!(meta.title, "METHOD AND APPARATUS FOR ADAPTIVE SIGNAL FILTERING");
        assert_eq!(
            meta.inventors,
            "Anna Milanese, Boston, MA (US); Piotr Kowalski, Cambridge, MA (US)"
        );
        assert_eq!(meta.assignee, "Example Industries, Inc., Wilmington, DE (US)");
        assert_eq!(meta.publication_date, "Aug. 2, 2022");
    }

    #[test]
    fn test_unrecognizable_text_yields_sentinels() {
        let meta = extract_patent_metadata("nothing that looks like a patent");
        assert_eq!(meta.patent_id, NOT_FOUND);
        assert_eq!(meta.title, NOT_FOUND);
        assert_eq!(meta.inventors, NOT_FOUND);
        assert_eq!(meta.assignee, NOT_FOUND);
        assert_eq!(meta.publication_date, NOT_FOUND);
    }

    #[test]
    fn test_fields_are_independent() {
        let meta = extract_patent_metadata("(73) Assignee: Acme Corp.\n");
        assert_eq!(meta.assignee, "Acme Corp.");
        assert_eq!(meta.title, NOT_FOUND);
    }

    #[test]
    fn test_multiline_match_collapsed() {
        let meta = extract_patent_metadata(PATENT_FRONT_PAGE);
        assert!(!meta.title.contains('\n'));
        assert!(!meta.inventors.contains('\n'));
    }
}
