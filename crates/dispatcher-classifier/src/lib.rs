pub mod error;
pub mod pattern;
pub mod semantic;
pub mod types;

pub use error::{ClassifierError, Result};
pub use types::{Classification, Intent};

use dispatcher_llm::LlmProvider;

/// Classifies a user utterance into one of the routing intents.
///
/// Layered: a deterministic pattern pass runs first and only falls through to
/// the LLM-backed semantic pass when the pattern pass is ambiguous or absent.
/// The classifier never makes routing decisions itself — it only reports.
pub struct IntentClassifier<'a> {
    llm: &'a dyn LlmProvider,
    model: String,
}

impl<'a> IntentClassifier<'a> {
    pub fn new(llm: &'a dyn LlmProvider, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// `pending_slots_len` lets the pattern pass special-case a bare digit as
    /// `SlotSelection` only when there is something to select from.
    /// `abuse_lexicon` is the configured list of terms that deterministically
    /// route to `Abusive` without ever reaching the semantic pass.
    pub async fn classify(
        &self,
        text: &str,
        pending_slots_len: usize,
        abuse_lexicon: &[String],
        recent_history: &[String],
    ) -> Result<Classification> {
        if let Some(c) = pattern::classify(text, pending_slots_len, abuse_lexicon) {
            return Ok(c);
        }

        semantic::classify(self.llm, &self.model, text, recent_history).await
    }
}
