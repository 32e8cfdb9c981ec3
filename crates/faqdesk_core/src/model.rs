use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Absent and `null` both become the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A curated question/answer pair as stored in the corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            tags: Vec::new(),
            category: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Snapshot of the entry a query matched, with the rounded score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedEntry {
    #[serde(flatten)]
    pub entry: FaqEntry,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    Escalate,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Resolved => "resolved",
            Resolution::Escalate => "escalate",
        }
    }
}

/// Where the answer text of a [`MatchResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    EmptyQuery,
    Faq,
    Completion,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub answer_text: String,
    pub matched_entry: Option<MatchedEntry>,
    pub confidence: f64,
    pub resolution: Resolution,
    pub source: AnswerSource,
}

impl MatchResult {
    pub fn is_resolved(&self) -> bool {
        self.resolution == Resolution::Resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u64,
    #[serde(alias = "lastAsked")]
    pub last_asked: DateTime<Utc>,
}

/// One audit entry in the escalation log. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(default)]
    pub matched: Option<MatchedEntry>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}
