use crate::types::{Classification, Intent};

const SCHEDULING_VERBS: &[&str] = &["book", "schedule", "demo", "meeting", "reserve", "set up a call"];

/// Phrases that look like a scheduling request but are actually asking
/// *about* demos, not asking *for* one. Checked before the scheduling-verb
/// match so "what is a demo" never falls into `Scheduling`.
const DISAMBIGUATION_QUALIFIERS: &[&str] = &[
    "what is",
    "what's",
    "tell me about",
    "how long is",
    "how long does",
    "explain",
    "describe",
];

const ERROR_KEYWORDS: &[&str] = &["500", "error", "failing", "down", "outage", "crash", "broken"];

/// Deterministic, high-precision classification. Returns `None` when the
/// utterance doesn't match a pattern confidently, so the caller can fall
/// through to the semantic (LLM) pass.
pub fn classify(text: &str, pending_slots_len: usize, abuse_lexicon: &[String]) -> Option<Classification> {
    let lower = text.trim().to_lowercase();

    if pending_slots_len > 0 {
        if let Some(index) = parse_slot_selection(&lower) {
            return Some(Classification {
                intent: Intent::SlotSelection,
                confidence: 0.95,
                slot_index: Some(index),
                reason: Some("digit or ordinal selection with pending offers".to_string()),
            });
        }
    }

    if contains_any_string(&lower, abuse_lexicon) {
        return Some(Classification::pattern(Intent::Abusive, 0.90));
    }

    // Disambiguation rule: a descriptive/interrogative qualifier overrides
    // scheduling verbs — "what is a demo" is Information, not Scheduling.
    if contains_any(&lower, DISAMBIGUATION_QUALIFIERS) && lower.contains("demo") {
        return Some(Classification::pattern(Intent::Information, 0.85));
    }

    if contains_any(&lower, SCHEDULING_VERBS) {
        return Some(Classification::pattern(Intent::Scheduling, 0.85));
    }

    if contains_any(&lower, ERROR_KEYWORDS) {
        return Some(Classification::pattern(Intent::TechnicalSupport, 0.80));
    }

    None
}

/// Recognises a bare digit ("3") or "option N" / "offer N" as a 1-based
/// slot selection. Words like "three" are left to the semantic pass.
fn parse_slot_selection(lower: &str) -> Option<u32> {
    if let Ok(n) = lower.parse::<u32>() {
        return Some(n);
    }
    for prefix in ["option ", "offer ", "slot ", "#"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            if let Ok(n) = rest.trim().parse::<u32>() {
                return Some(n);
            }
        }
    }
    None
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn contains_any_string(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Vec<String> {
        vec!["idiot".to_string(), "useless".to_string(), "screw you".to_string()]
    }

    #[test]
    fn demo_question_is_information_not_scheduling() {
        let c = classify("What is a demo?", 0, &lexicon()).unwrap();
        assert_eq!(c.intent, Intent::Information);
    }

    #[test]
    fn book_a_demo_is_scheduling() {
        let c = classify("Can I book a demo?", 0, &lexicon()).unwrap();
        assert_eq!(c.intent, Intent::Scheduling);
    }

    #[test]
    fn bare_digit_without_pending_slots_is_not_slot_selection() {
        assert!(classify("3", 0, &lexicon()).is_none());
    }

    #[test]
    fn bare_digit_with_pending_slots_is_slot_selection() {
        let c = classify("3", 6, &lexicon()).unwrap();
        assert_eq!(c.intent, Intent::SlotSelection);
        assert_eq!(c.slot_index, Some(3));
    }

    #[test]
    fn error_keyword_is_technical_support() {
        let c = classify("our checkout is failing with a 500", 0, &lexicon()).unwrap();
        assert_eq!(c.intent, Intent::TechnicalSupport);
    }

    #[test]
    fn unrecognised_text_falls_through() {
        assert!(classify("hello there", 0, &lexicon()).is_none());
    }

    #[test]
    fn abuse_lexicon_term_is_abusive() {
        let c = classify("you are all useless", 0, &lexicon()).unwrap();
        assert_eq!(c.intent, Intent::Abusive);
    }

    #[test]
    fn empty_lexicon_never_matches_abusive() {
        assert!(classify("you are all useless", 0, &[]).is_none());
    }
}
