//! Question source backed by the Gemini `generateContent` REST endpoint.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    source::{
        GeneratedQuestion, GenerationRequest, QuestionSource, SourceError, SourceResult,
        response::parse_questions,
    },
    state::room::Citation,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini-backed [`QuestionSource`].
#[derive(Clone)]
pub struct GeminiSource {
    client: Client,
    url: Arc<str>,
    api_key: Arc<str>,
}

impl GeminiSource {
    /// Build a client for `model` under `endpoint`.
    pub fn new(endpoint: &str, model: &str, api_key: String) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;
        let url = format!(
            "{}/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            url: Arc::from(url),
            api_key: Arc::from(api_key),
        })
    }

    async fn call(&self, request: GenerationRequest) -> SourceResult<Vec<GeneratedQuestion>> {
        let body = GenerateContentRequest::new(build_prompt(&request), request.grounding);
        let response = self
            .client
            .post(self.url.as_ref())
            .header(API_KEY_HEADER, self.api_key.as_ref())
            .json(&body)
            .send()
            .await
            .map_err(|err| SourceError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| SourceError::Malformed(err.to_string()))?;
        let (text, citations) = payload.into_text_and_citations()?;
        debug!(
            chars = text.len(),
            citations = citations.len(),
            "received Gemini response"
        );
        parse_questions(&text, &citations, request.count)
    }
}

impl QuestionSource for GeminiSource {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, SourceResult<Vec<GeneratedQuestion>>> {
        let source = self.clone();
        Box::pin(async move { source.call(request).await })
    }
}

/// Prompt asking for a JSON array of short Japanese questions with hiragana answers.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let difficulty = request.difficulty.clamp(1, 10);
    let genre = if request.genre.trim().is_empty() {
        String::new()
    } else {
        format!("ジャンル: {}\n", request.genre.trim())
    };
    format!(
        "早押しクイズの問題を{count}問作成してください。\n\
         テーマ: {topic}\n\
         {genre}\
         難易度: {difficulty}（1=小学生レベル、10=大学の専門レベル）\n\
         \n\
         条件:\n\
         - 問題文は日本語の短い1文にしてください。\n\
         - 答えが一つに定まる、事実に基づいた問題だけを出してください。\n\
         - 答えは日本語で最も一般的な呼び方にしてください。\n\
         - \"answer\" はひらがなのみで書いてください（漢字・カタカナ・ローマ字は使わない）。\n\
         \n\
         JSON配列だけを返し、説明文は付けないでください。\n\
         形式: [{{\"text\": \"問題文\", \"answer\": \"こたえ\"}}]\n\
         例: [{{\"text\": \"日本の首都はどこですか？\", \"answer\": \"とうきょう\"}}]",
        count = request.count,
        topic = request.topic.trim(),
    )
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

impl GenerateContentRequest {
    fn new(prompt: String, grounding: bool) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            tools: if grounding {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl GenerateContentResponse {
    fn into_text_and_citations(self) -> SourceResult<(String, Vec<Citation>)> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Malformed("response has no candidates".into()))?;

        let text: String = candidate
            .content
            .unwrap_or_default()
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            return Err(SourceError::Malformed("response has no text content".into()));
        }

        let citations = candidate
            .grounding_metadata
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| {
                        let uri = web.uri.filter(|uri| !uri.is_empty())?;
                        Some(Citation {
                            title: web.title.unwrap_or_else(|| "Unknown".into()),
                            uri,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok((text, citations))
    }
}
