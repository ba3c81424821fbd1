use dispatcher_llm::{ChatRequest, LlmProvider, Message, Role};

use crate::error::Result;
use crate::store::KnowledgeStore;
use crate::types::{Answer, Hit};

const SYSTEM_PROMPT: &str = "You answer customer questions using only the provided context. \
If the context does not contain the answer, say \"I don't have that information.\" Cite the \
topics you used. End your reply with a line: CONFIDENCE: <0.0-1.0>.";

/// Minimum number of hits clearing the similarity floor before the answerer
/// will treat its own output as trustworthy.
const KMIN: usize = 1;
const SIMILARITY_FLOOR: f64 = 0.15;
/// Confidence ceiling forced when evidence is too thin, regardless of what
/// the model claims — pushes the Orchestrator to escalate.
const LOW_CONFIDENCE_CEIL: f64 = 0.50;
const NEAREST_K: usize = 8;
const MMR_LAMBDA: f64 = 0.7;

pub struct Answerer<'a> {
    store: &'a KnowledgeStore,
    llm: &'a dyn LlmProvider,
    model: String,
}

impl<'a> Answerer<'a> {
    pub fn new(store: &'a KnowledgeStore, llm: &'a dyn LlmProvider, model: impl Into<String>) -> Self {
        Self {
            store,
            llm,
            model: model.into(),
        }
    }

    /// `recent_ai_turns` are the last K AI messages in the session, used to
    /// avoid repeating a fact already stated.
    pub async fn answer(&self, query: &str, recent_ai_turns: &[String]) -> Result<Answer> {
        let hits = self.store.search(query, NEAREST_K)?;
        let above_floor = hits.iter().filter(|h| h.score >= SIMILARITY_FLOOR).count();

        if hits.is_empty() {
            return Ok(Answer {
                text: "I don't have that information.".to_string(),
                confidence: 0.0,
                citations: Vec::new(),
                suppress_suffix: false,
            });
        }

        let diversified = mmr_select(&hits, MMR_LAMBDA, 4);
        let suppress_suffix = diversified.iter().any(|h| h.entry.is_sensitive_category());
        let citations: Vec<String> = diversified.iter().map(|h| h.entry.topic.clone()).collect();

        let context = diversified
            .iter()
            .map(|h| format!("[{}]\n{}", h.entry.topic, h.entry.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let req = ChatRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: Role::User,
                content: format!("Context:\n{context}\n\nQuestion: {query}"),
            }],
            max_tokens: 512,
        };

        let resp = self
            .llm
            .send(&req)
            .await
            .map_err(|e| crate::error::RetrievalError::LlmUnavailable(e.to_string()))?;

        let (text, mut confidence) = split_confidence(&resp.content);

        if above_floor < KMIN {
            confidence = confidence.min(LOW_CONFIDENCE_CEIL);
        }

        let text = dedup_against_recent(&text, recent_ai_turns);

        Ok(Answer {
            text,
            confidence,
            citations,
            suppress_suffix,
        })
    }
}

/// Maximal-marginal-relevance style selection: greedily pick the
/// highest-scoring hit, then repeatedly pick the hit that maximises
/// `lambda * relevance - (1 - lambda) * similarity_to_already_picked`,
/// using token-overlap as a cheap stand-in for embedding similarity.
fn mmr_select(hits: &[Hit], lambda: f64, limit: usize) -> Vec<Hit> {
    let mut remaining: Vec<&Hit> = hits.iter().collect();
    let mut picked: Vec<Hit> = Vec::new();

    while !remaining.is_empty() && picked.len() < limit {
        let (idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let redundancy = picked
                    .iter()
                    .map(|p| token_overlap(&p.entry.content, &h.entry.content))
                    .fold(0.0_f64, f64::max);
                let mmr_score = lambda * h.score - (1.0 - lambda) * redundancy;
                (i, mmr_score)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        picked.push(remaining.remove(idx).clone());
    }

    picked
}

fn token_overlap(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    intersection / union
}

fn split_confidence(text: &str) -> (String, f64) {
    let mut body_lines = Vec::new();
    let mut confidence = 0.5;
    for line in text.lines() {
        if let Some(rest) = line.trim().strip_prefix("CONFIDENCE:") {
            confidence = rest.trim().parse::<f64>().unwrap_or(0.5).clamp(0.0, 1.0);
        } else {
            body_lines.push(line);
        }
    }
    (body_lines.join("\n").trim().to_string(), confidence)
}

/// Drop the answer entirely in favour of a pointer if it is near-identical
/// to something already said in the last K AI turns.
fn dedup_against_recent(text: &str, recent_ai_turns: &[String]) -> String {
    for prior in recent_ai_turns {
        if token_overlap(text, prior) > 0.8 {
            return "As I mentioned, ".to_string() + &first_sentence(prior);
        }
    }
    text.to_string()
}

fn first_sentence(s: &str) -> String {
    s.split('.').next().unwrap_or(s).trim().to_string() + "."
}
