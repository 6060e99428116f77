use std::sync::OnceLock;

use async_trait::async_trait;
use curator_core::{PostRecord, Score};
use curator_logging::{curator_debug, curator_info, curator_warn};
use regex::Regex;

use crate::diagnostics::{DiagnosticEntry, Diagnostics};
use crate::llm::{Completion, MessagesClient};
use crate::types::ServiceError;
use crate::Clock;

/// Inputs to scoring that are not part of the post itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreContext {
    /// Free-text description of what the reader wants to see.
    pub preference: Option<String>,
}

impl ScoreContext {
    pub fn with_preference(preference: impl Into<String>) -> Self {
        let preference = preference.into();
        let trimmed = preference.trim();
        Self {
            preference: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub score: Score,
    pub reasoning: String,
    /// Set when the external call failed and the default score was substituted.
    pub failure: Option<ServiceError>,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Never fails: any problem degrades to [`Score::DEFAULT`].
    async fn score(&self, record: &PostRecord, context: &ScoreContext) -> ScoreOutcome;
}

/// Scores posts through the messages API and records every decision.
pub struct LlmScorer {
    client: MessagesClient,
    api_key: Option<String>,
    diagnostics: Diagnostics,
    clock: Clock,
}

impl LlmScorer {
    pub fn new(
        client: MessagesClient,
        api_key: Option<String>,
        diagnostics: Diagnostics,
        clock: Clock,
    ) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self {
            client,
            api_key,
            diagnostics,
            clock,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    async fn evaluate(&self, record: &PostRecord, context: &ScoreContext) -> ScoreOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            curator_debug!("no API key configured, using default score");
            return ScoreOutcome {
                score: Score::DEFAULT,
                reasoning: "No API key configured".to_string(),
                failure: None,
            };
        };

        let prompt = build_prompt(record, context);
        let settings = self.client.settings();
        let completion = Completion {
            model: &settings.scoring_model,
            max_tokens: settings.scoring_max_tokens,
            prompt: &prompt,
            timeout: settings.request_timeout,
        };
        match self.client.complete(api_key, completion).await {
            Ok(text) => {
                let score = parse_score_text(&text).unwrap_or(Score::DEFAULT);
                curator_info!("{} scored {} (response {:?})", record.identity, score, text);
                ScoreOutcome {
                    score,
                    reasoning: format!("Full response: \"{text}\" | Extracted: {score}"),
                    failure: None,
                }
            }
            Err(err) => {
                curator_warn!("scoring {} failed: {}", record.identity, err);
                ScoreOutcome {
                    score: Score::DEFAULT,
                    reasoning: format!("API Error: {err}"),
                    failure: Some(err),
                }
            }
        }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, record: &PostRecord, context: &ScoreContext) -> ScoreOutcome {
        let outcome = self.evaluate(record, context).await;
        self.diagnostics.record(DiagnosticEntry::new(
            (self.clock)(),
            record,
            outcome.score,
            outcome.reasoning.clone(),
        ));
        outcome
    }
}

/// First ASCII integer token in `text`, clamped into the score range.
/// Digits from other scripts are not numbers here.
pub fn parse_score_text(text: &str) -> Option<Score> {
    static INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
    let integer = INTEGER
        .get_or_init(|| Regex::new(r"(?-u:\b)([0-9]+)(?-u:\b)").ok())
        .as_ref()?;
    let digits = integer.captures(text)?.get(1)?.as_str();
    // Only overflow can fail on an all-ASCII-digit token.
    let raw = match digits.parse::<i64>() {
        Ok(value) => value,
        Err(_) => i64::MAX,
    };
    Some(Score::clamped(raw))
}

pub fn build_prompt(record: &PostRecord, context: &ScoreContext) -> String {
    let mut prompt = format!(
        "Rate this LinkedIn post quality from 1-50. Be balanced - not everything is spam.\n\
         \n\
         POST DATA:\n\
         - Text: \"{}\"\n\
         - Author: {} ({})\n\
         - Length: {} chars\n\
         - Media: {}\n\
         - Engagement: {} likes, {} comments, {} shares",
        record.text_content,
        record.author_name,
        record.author_title,
        record.content_length(),
        record.has_media,
        record.engagement.likes,
        record.engagement.comments,
        record.engagement.shares,
    );

    if let Some(preference) = &context.preference {
        prompt.push_str(&format!(
            "\n\nUSER PREFERENCES:\n\
             The user wants to see content that: {preference}\n\
             \n\
             Please give HIGHER scores (35-50) to posts that match these preferences and LOWER \
             scores (1-25) to posts that don't align with what the user wants to see."
        ));
    }

    prompt.push_str(
        "\n\nSCORING GUIDELINES:\n\
         \u{1f525} EXCELLENT (40-50): \n\
         - Unique insights, valuable expertise\n\
         - Thought leadership, industry analysis\n\
         - Helpful tutorials, genuine knowledge sharing\n\
         \n\
         \u{2705} GOOD (30-39):\n\
         - Solid professional content\n\
         - Meaningful discussions, good engagement\n\
         - Career advice, industry news with insight\n\
         \n\
         \u{26a1} AVERAGE (20-29):\n\
         - Standard professional posts\n\
         - Basic insights, moderate value\n\
         - Personal updates with professional relevance\n\
         \n\
         \u{26a0}\u{fe0f} POOR (10-19):\n\
         - Generic content, low effort\n\
         - Mild self-promotion mixed with value\n\
         - Basic announcements, simple updates\n\
         \n\
         \u{1f6ab} TERRIBLE (1-9):\n\
         - Heavy sales pitches, obvious ads\n\
         - Pure self-promotion with no value\n\
         - Spam, irrelevant, or harmful content\n\
         \n\
         CONSIDER:\n\
         - Does this help other professionals?\n\
         - Is there genuine insight vs. just promotion?\n\
         - Quality of writing and engagement",
    );

    if context.preference.is_some() {
        prompt.push_str("\n- Does this match the user's specific interests and preferences?");
    }

    prompt.push_str("\n\nReply with ONLY the numerical score (1-50). Example: 35");
    prompt
}
