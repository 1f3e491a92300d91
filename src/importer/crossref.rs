// src/importer/crossref.rs
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{ImportError, PaperSeed};

// DOI の構文 (例: 10.1145/3297858.3304013)
static RE_DOI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("Failed to compile DOI regex"));

// Crossref の abstract は JATS マークアップを含むためタグを落とす
static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[^>]+>").expect("Failed to compile tag regex"));

pub(super) fn validate_doi(doi: &str) -> Result<(), ImportError> {
    if RE_DOI.is_match(doi) {
        Ok(())
    } else {
        Err(ImportError::InvalidDoi(doi.to_string()))
    }
}

// --- Crossref works API のレスポンス (使うフィールドのみ) ---

#[derive(Debug, Deserialize)]
pub(super) struct WorksReply {
    pub message: Work,
}

#[derive(Debug, Deserialize)]
pub(super) struct Work {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<Author>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    issued: Option<DateParts>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "is-referenced-by-count")]
    cited_by: Option<i64>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    // date-parts の要素は null を含むことがある
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

/// Crossref のレコードを DB 挿入用の形に変換する
pub(super) fn seed_from_work(doi: &str, work: Work) -> Result<PaperSeed, ImportError> {
    let title = work
        .title
        .first()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ImportError::Metadata(format!("No title in Crossref record for {}", doi))
        })?;

    let authors = work
        .author
        .iter()
        .filter_map(|author| match (&author.given, &author.family) {
            (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
            (None, Some(family)) => Some(family.clone()),
            (Some(given), None) => Some(given.clone()),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join(", ");
    let authors = if authors.is_empty() {
        "Unknown authors".to_string()
    } else {
        authors
    };

    let year = work
        .issued
        .as_ref()
        .and_then(|issued| issued.date_parts.first())
        .and_then(|parts| parts.first())
        .copied()
        .flatten()
        .unwrap_or_else(|| Utc::now().year() as i64);

    let journal = work
        .container_title
        .first()
        .map(|j| j.trim().to_string())
        .filter(|j| !j.is_empty());

    Ok(PaperSeed {
        title,
        authors,
        abstract_text: work
            .abstract_text
            .as_deref()
            .map(strip_jats)
            .unwrap_or_default(),
        journal,
        year,
        volume: work.volume,
        issue: work.issue,
        pages: work.page,
        doi: doi.to_string(),
        pdf_url: work.url,
        citation_count: work.cited_by.unwrap_or(0),
    })
}

fn strip_jats(text: &str) -> String {
    RE_TAG.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_dois() {
        assert!(validate_doi("10.1145/3297858.3304013").is_ok());
        assert!(validate_doi("10.48550/arXiv.2403.01234").is_ok());
    }

    #[test]
    fn rejects_malformed_dois() {
        assert!(validate_doi("").is_err());
        assert!(validate_doi("doi:10.1145/xyz").is_err());
        assert!(validate_doi("10.1145/with space").is_err());
        assert!(validate_doi("11.1145/not-a-doi-prefix").is_err());
    }

    #[test]
    fn jats_markup_is_stripped_from_abstracts() {
        let text = "<jats:p>We present <jats:italic>a system</jats:italic>.</jats:p>";
        assert_eq!(strip_jats(text), "We present a system.");
    }

    #[test]
    fn seed_is_extracted_from_a_works_reply() {
        let json = r#"{
            "message": {
                "title": ["A Measured Study of Something"],
                "author": [
                    {"given": "Ada", "family": "Lovelace"},
                    {"family": "Hopper"}
                ],
                "container-title": ["Journal of Examples"],
                "issued": {"date-parts": [[2021, 6]]},
                "volume": "12",
                "issue": "3",
                "page": "45-67",
                "abstract": "<jats:p>An abstract.</jats:p>",
                "is-referenced-by-count": 17,
                "URL": "https://doi.org/10.1000/example"
            }
        }"#;
        let reply: WorksReply = serde_json::from_str(json).expect("fixture should parse");
        let seed = seed_from_work("10.1000/example", reply.message).expect("seed extraction");

        assert_eq!(seed.title, "A Measured Study of Something");
        assert_eq!(seed.authors, "Ada Lovelace, Hopper");
        assert_eq!(seed.journal.as_deref(), Some("Journal of Examples"));
        assert_eq!(seed.year, 2021);
        assert_eq!(seed.pages.as_deref(), Some("45-67"));
        assert_eq!(seed.abstract_text, "An abstract.");
        assert_eq!(seed.citation_count, 17);
    }

    #[test]
    fn missing_title_is_a_metadata_error() {
        let json = r#"{"message": {"title": []}}"#;
        let reply: WorksReply = serde_json::from_str(json).expect("fixture should parse");
        assert!(seed_from_work("10.1000/untitled", reply.message).is_err());
    }
}
