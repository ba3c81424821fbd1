use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Information,
    Scheduling,
    TechnicalSupport,
    SlotSelection,
    Abusive,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Information => "information",
            Intent::Scheduling => "scheduling",
            Intent::TechnicalSupport => "technical_support",
            Intent::SlotSelection => "slot_selection",
            Intent::Abusive => "abusive",
            Intent::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one user utterance.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    /// 1-based offer index, set only when `intent == SlotSelection`.
    pub slot_index: Option<u32>,
    pub reason: Option<String>,
}

impl Classification {
    pub fn pattern(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            slot_index: None,
            reason: None,
        }
    }
}
