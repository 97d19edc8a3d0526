//! Gemini API連携
//!
//! 1. 所見検出: 画像 + 指示文 + 応答スキーマ → `Vec<DetectionResult>`
//! 2. レポート生成: 所見JSONを埋め込んだテキストのみのプロンプト → 本文

use super::VisionModel;
use crate::config::Config;
use crate::error::AnalysisError;
use base64::Engine;
use endo_lens_common::{
    build_report_prompt, findings_response_schema, parse_findings_response, DetectionResult,
    NormalizedDetection, FINDINGS_PROMPT,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストを連結（空なら `None`）
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolve_api_key(), config.model.clone(), config.api_base_url.clone())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }

    async fn call(&self, request: &GeminiRequest) -> Result<String, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;

        log::debug!("calling Gemini model {}", self.model);
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status { status: status.as_u16(), body });
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;
        payload.text().ok_or(AnalysisError::EmptyResponse)
    }

    async fn detect_findings(&self, image: &[u8], mime_type: &str) -> Result<Vec<DetectionResult>, AnalysisError> {
        let request = findings_request(image, mime_type);
        let text = self.call(&request).await?;
        parse_findings_response(&text).map_err(|e| AnalysisError::Parse(e.to_string()))
    }

    async fn generate_report(
        &self,
        findings: &[DetectionResult],
        supporting: &[NormalizedDetection],
    ) -> Result<String, AnalysisError> {
        let request = text_request(build_report_prompt(findings, supporting));
        self.call(&request).await
    }
}

fn findings_request(image: &[u8], mime_type: &str) -> GeminiRequest {
    let parts = vec![
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(image),
            },
        },
        Part::Text { text: FINDINGS_PROMPT.to_string() },
    ];

    GeminiRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(findings_response_schema()),
        },
    }
}

fn text_request(prompt: String) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content { parts: vec![Part::Text { text: prompt }] }],
        generation_config: GenerationConfig::default(),
    }
}

impl VisionModel for GeminiClient {
    fn find_lesions<'a>(
        &'a self,
        image: &'a [u8],
        mime_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DetectionResult>, AnalysisError>> {
        self.detect_findings(image, mime_type).boxed()
    }

    fn write_report<'a>(
        &'a self,
        findings: &'a [DetectionResult],
        supporting: &'a [NormalizedDetection],
    ) -> BoxFuture<'a, Result<String, AnalysisError>> {
        self.generate_report(findings, supporting).boxed()
    }
}
