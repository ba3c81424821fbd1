use serde::{Deserialize, Serialize};

/// A knowledge base entry backing retrieval-augmented answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub topic: String,
    pub content: String,
    /// Comma-separated tags for loose categorisation, e.g. "compliance,soc2".
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

impl KnowledgeEntry {
    /// True if this entry is tagged compliance/privacy/legal — suppresses
    /// the sales call-to-action suffix for answers grounded on it.
    pub fn is_sensitive_category(&self) -> bool {
        let tags = self.tags.to_lowercase();
        ["compliance", "privacy", "legal"]
            .iter()
            .any(|t| tags.contains(t))
    }
}

/// One scored retrieval hit.
#[derive(Debug, Clone)]
pub struct Hit {
    pub entry: KnowledgeEntry,
    pub score: f64,
}

/// Result of the Retrieval Answerer pipeline.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub confidence: f64,
    pub citations: Vec<String>,
    /// True when the underlying evidence is compliance/privacy/legal and the
    /// sales suffix must not be appended.
    pub suppress_suffix: bool,
}
