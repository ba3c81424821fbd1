use dispatcher_llm::{ChatRequest, LlmProvider, Message, ProviderError, Role};

use crate::error::{ClassifierError, Result};
use crate::types::{Classification, Intent};

const SYSTEM_PROMPT: &str = "You classify a customer support message into exactly one \
category: information, scheduling, technical_support, abusive, or unknown. Respond with \
two lines only:\nINTENT: <category>\nCONFIDENCE: <0.0-1.0>";

pub async fn classify(
    llm: &dyn LlmProvider,
    model: &str,
    text: &str,
    recent_history: &[String],
) -> Result<Classification> {
    let mut messages = Vec::new();
    for turn in recent_history {
        messages.push(Message {
            role: Role::User,
            content: turn.clone(),
        });
    }
    messages.push(Message {
        role: Role::User,
        content: text.to_string(),
    });

    let req = ChatRequest {
        model: model.to_string(),
        system: SYSTEM_PROMPT.to_string(),
        messages,
        max_tokens: 64,
    };

    let resp = llm.send(&req).await.map_err(|e| match e {
        ProviderError::RateLimited { .. } | ProviderError::Unavailable(_) => {
            ClassifierError::LlmUnavailable(e.to_string())
        }
        other => ClassifierError::LlmUnavailable(other.to_string()),
    })?;

    parse_response(&resp.content)
}

fn parse_response(text: &str) -> Result<Classification> {
    let mut intent = None;
    let mut confidence = None;

    for line in text.lines() {
        if let Some(rest) = line.trim().strip_prefix("INTENT:") {
            intent = parse_intent(rest.trim());
        } else if let Some(rest) = line.trim().strip_prefix("CONFIDENCE:") {
            confidence = rest.trim().parse::<f64>().ok();
        }
    }

    let intent = intent.ok_or_else(|| ClassifierError::Parse(text.to_string()))?;
    let confidence = confidence.unwrap_or(0.5).clamp(0.0, 1.0);

    Ok(Classification {
        intent,
        confidence,
        slot_index: None,
        reason: None,
    })
}

fn parse_intent(s: &str) -> Option<Intent> {
    match s.to_lowercase().as_str() {
        "information" => Some(Intent::Information),
        "scheduling" => Some(Intent::Scheduling),
        "technical_support" => Some(Intent::TechnicalSupport),
        "abusive" => Some(Intent::Abusive),
        "unknown" => Some(Intent::Unknown),
        _ => None,
    }
}
