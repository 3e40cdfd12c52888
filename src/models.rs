//! Data models shared across the chat and ingestion paths

use serde::Deserialize;
use serde::Serialize;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn of a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Review metadata stored alongside each vector.
///
/// Vectors written by the seed loader carry `professor`/`stars`; vectors
/// written by the scrape endpoint carry `professorName`/`overallRating`
/// (where the rating is whatever text the page showed). Both shapes load,
/// and when a record carries both keys the seed-side one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMetadata")]
pub struct ReviewMetadata {
    pub professor: String,
    pub subject: String,
    pub university: String,
    pub stars: f64,
    pub review: String,
}

/// Wire shape of index metadata before the two naming schemes are merged
#[derive(Deserialize)]
struct StoredMetadata {
    #[serde(default)]
    professor: Option<String>,
    #[serde(default, rename = "professorName")]
    professor_name: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    university: Option<String>,
    #[serde(default)]
    stars: Option<serde_json::Value>,
    #[serde(default, rename = "overallRating")]
    overall_rating: Option<serde_json::Value>,
    #[serde(default)]
    review: Option<String>,
}

impl From<StoredMetadata> for ReviewMetadata {
    fn from(stored: StoredMetadata) -> Self {
        let professor = stored
            .professor
            .filter(|name| !name.is_empty())
            .or(stored.professor_name)
            .unwrap_or_default();
        let stars = stored
            .stars
            .and_then(|value| lenient_stars(&value))
            .or_else(|| stored.overall_rating.and_then(|value| lenient_stars(&value)))
            .unwrap_or_default();

        Self {
            professor,
            subject: stored.subject.unwrap_or_default(),
            university: stored.university.unwrap_or_default(),
            stars,
            review: stored.review.unwrap_or_default(),
        }
    }
}

/// A nearest-neighbour hit returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: ReviewMetadata,
}

/// A vector plus metadata ready for upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Value,
}

fn lenient_stars(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_rating_text(s),
        _ => None,
    }
}

/// Pull the first decimal number out of free-form rating text such as "4.5 / 5".
pub fn parse_rating_text(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}
