//! Newsreader-style summaries of the kept posts, optionally voiced through a
//! text-to-speech service.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use curator_core::ScoredPost;
use curator_logging::{curator_info, curator_warn};
use serde::{Deserialize, Serialize};

use crate::llm::{Completion, MessagesClient};
use crate::types::{map_reqwest_error, FailureKind, ServiceError};
use crate::Clock;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("no kept posts to summarize")]
    NoPosts,
    #[error("{0} credential not configured")]
    MissingCredential(&'static str),
    #[error("{service} request failed: {source}")]
    Service {
        service: &'static str,
        #[source]
        source: ServiceError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSummary {
    pub created_at: String,
    pub post_count: usize,
    pub text: String,
    /// `audio/mpeg` bytes, base64 encoded. `None` when no speech credential is configured.
    pub audio_base64: Option<String>,
}

impl AudioSummary {
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_base64.is_some()
    }

    pub fn audio_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.audio_base64.as_deref().map(|encoded| STANDARD.decode(encoded))
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

pub struct SummaryService {
    client: MessagesClient,
    api_key: Option<String>,
    speech_api_key: Option<String>,
    clock: Clock,
}

impl SummaryService {
    pub fn new(
        client: MessagesClient,
        api_key: Option<String>,
        speech_api_key: Option<String>,
        clock: Clock,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            speech_api_key: speech_api_key.filter(|key| !key.trim().is_empty()),
            clock,
        }
    }

    pub async fn summarize(&self, posts: &[ScoredPost]) -> Result<AudioSummary, SummaryError> {
        if posts.is_empty() {
            return Err(SummaryError::NoPosts);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SummaryError::MissingCredential("messages API"))?;

        curator_info!("generating summary for {} posts", posts.len());
        let prompt = build_summary_prompt(posts);
        let settings = self.client.settings();
        let completion = Completion {
            model: &settings.summary_model,
            max_tokens: settings.summary_max_tokens,
            prompt: &prompt,
            timeout: settings.summary_timeout,
        };
        let text = self
            .client
            .complete(api_key, completion)
            .await
            .map_err(|source| SummaryError::Service {
                service: "summary",
                source,
            })?;

        let audio_base64 = match self.speech_api_key.as_deref() {
            Some(speech_key) => {
                let audio = self
                    .synthesize_speech(&text, speech_key)
                    .await
                    .map_err(|source| SummaryError::Service {
                        service: "speech",
                        source,
                    })?;
                Some(STANDARD.encode(audio))
            }
            None => {
                curator_info!("no speech credential configured, returning text only");
                None
            }
        };

        Ok(AudioSummary {
            created_at: (self.clock)(),
            post_count: posts.len(),
            text,
            audio_base64,
        })
    }

    async fn synthesize_speech(&self, text: &str, api_key: &str) -> Result<Vec<u8>, ServiceError> {
        let settings = self.client.settings();
        let url = format!(
            "{}/v1/text-to-speech/{}",
            settings.speech_base_url.trim_end_matches('/'),
            settings.voice_id
        );
        let body = SpeechRequest {
            text,
            model_id: &settings.speech_model,
            voice_settings: VoiceSettings::default(),
        };
        let response = self
            .client
            .http()
            .post(url)
            .timeout(settings.summary_timeout)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            curator_warn!("speech service returned {}: {}", status, message);
            return Err(ServiceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

pub fn build_summary_prompt(posts: &[ScoredPost]) -> String {
    let posts_text = posts
        .iter()
        .enumerate()
        .map(|(index, post)| {
            let record = &post.record;
            format!(
                "Post {}:\nAuthor: {} ({})\nContent: {}\nEngagement: {} likes, {} comments, {} shares\n{}\n---",
                index + 1,
                record.author_name,
                record.author_title,
                record.text_content,
                record.engagement.likes,
                record.engagement.comments,
                record.engagement.shares,
                if record.has_media { "Includes media content" } else { "" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a professional news presenter creating a concise, engaging summary of LinkedIn \
         posts for audio consumption. \n\
         \n\
         Here are {count} high-quality LinkedIn posts that have been curated and filtered:\n\
         \n\
         {posts_text}\n\
         \n\
         Create a newsreader-style summary that:\n\
         - Starts with a brief overview of the key themes and trends\n\
         - Highlights the most valuable insights and professional perspectives\n\
         - Groups related content together logically\n\
         - Uses conversational, flowing language suitable for audio\n\
         - Keeps each post summary to 1-2 sentences maximum\n\
         - Ends with a brief conclusion about overall themes\n\
         - Aim for 2-3 minutes of speaking time (roughly 300-450 words)\n\
         \n\
         Write in a professional but accessible tone, as if you're presenting the morning business \
         news. Use transition phrases like \"Meanwhile,\" \"In related news,\" \"Another interesting \
         perspective comes from...\" to create smooth flow.\n\
         \n\
         Do not include any formatting, just pure text ready for text-to-speech conversion.",
        count = posts.len(),
    )
}
