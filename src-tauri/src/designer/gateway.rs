//! Generative-model gateway for design suggestions and image edits.
//!
//! Two operations, both stateless request/response wrappers: analyze a set
//! of room photos into a suggestion list, and edit the photos according to
//! a free-form prompt. One attempt per call; the caller decides whether the
//! user retries.

use std::time::Duration;

use tracing::{error, info};

use super::prompts::{build_suggestion_prompt, suggestions_json_schema};
use super::types::{EditOutcome, ImagePart};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Boundary trait through which all generative-model requests are issued.
/// The session state machine is generic over this so tests can substitute
/// a scripted implementation.
pub trait DesignGateway {
    /// Analyze the room photos and return an ordered suggestion list.
    /// A response without a suggestions array yields an empty list.
    fn analyze(
        &self,
        images: &[ImagePart],
    ) -> impl std::future::Future<Output = Result<Vec<String>, String>> + Send;

    /// Edit the photos according to the prompt. Either field of the outcome
    /// may be absent; upstream failure is an error.
    fn edit(
        &self,
        images: &[ImagePart],
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<EditOutcome, String>> + Send;
}

/// Gateway backed by a hosted provider, selected by user preference.
///
/// Suggestion analysis works with any supported provider; image editing
/// needs a model that can return image parts, which only Gemini offers
/// among the supported set.
pub struct LiveGateway {
    provider: String,
    model: String,
    image_model: String,
    api_key: String,
}

impl LiveGateway {
    pub fn new(provider: String, model: String, image_model: String, api_key: String) -> Self {
        Self {
            provider,
            model,
            image_model,
            api_key,
        }
    }
}

impl DesignGateway for LiveGateway {
    async fn analyze(&self, images: &[ImagePart]) -> Result<Vec<String>, String> {
        let prompt = build_suggestion_prompt();

        info!(
            "Requesting design suggestions for {} image(s) via provider '{}' model '{}'",
            images.len(),
            self.provider,
            self.model
        );

        let response_text = match self.provider.as_str() {
            "gemini" => call_gemini_analyze(&self.api_key, &self.model, images, &prompt).await?,
            "claude" => call_claude_analyze(&self.api_key, &self.model, images, &prompt).await?,
            "openai" => call_openai_analyze(&self.api_key, &self.model, images, &prompt).await?,
            other => {
                let msg = format!(
                    "Unsupported AI provider: '{}'. Supported: gemini, claude, openai",
                    other
                );
                error!("{}", msg);
                return Err(msg);
            }
        };

        let suggestions = parse_suggestions(&response_text)?;
        info!("Received {} suggestion(s)", suggestions.len());
        Ok(suggestions)
    }

    async fn edit(&self, images: &[ImagePart], prompt: &str) -> Result<EditOutcome, String> {
        if self.provider != "gemini" {
            let msg = format!(
                "Image editing is only available with the Gemini provider (current: '{}'). \
                 Switch providers in Settings.",
                self.provider
            );
            error!("{}", msg);
            return Err(msg);
        }

        info!(
            "Requesting image edit for {} image(s) via model '{}'",
            images.len(),
            self.image_model
        );

        let outcome = call_gemini_edit(&self.api_key, &self.image_model, images, prompt).await?;
        info!(
            "Edit response: image={}, text={}",
            outcome.new_image.is_some(),
            outcome.text.is_some()
        );
        Ok(outcome)
    }
}

/// Build a reqwest client with a 60-second timeout for model API calls.
fn build_api_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Handle API response: check status and extract body text.
async fn handle_api_response(
    response: reqwest::Response,
    provider: &str,
) -> Result<String, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        let truncated = if body.len() > 1024 {
            format!("{}...", &body[..1024])
        } else {
            body
        };
        let msg = format!("Model API error: {} from {} - {}", status, provider, truncated);
        error!("{}", msg);
        return Err(msg);
    }
    response
        .text()
        .await
        .map_err(|e| format!("Failed to read API response body from {}: {}", provider, e))
}

fn request_error(provider: &str, e: reqwest::Error) -> String {
    let msg = if e.is_timeout() {
        format!("Model API timeout after 60s for provider '{}'", provider)
    } else {
        format!("Model API request failed for {}: {}", provider, e)
    };
    error!("{}", msg);
    msg
}

/// Call Gemini generateContent with a structured JSON suggestion response.
async fn call_gemini_analyze(
    api_key: &str,
    model: &str,
    images: &[ImagePart],
    prompt: &str,
) -> Result<String, String> {
    let client = build_api_client()?;

    let mut parts: Vec<serde_json::Value> = images.iter().map(gemini_image_part).collect();
    parts.push(serde_json::json!({ "text": prompt }));

    let body = serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": suggestions_json_schema()
        }
    });

    let url = format!("{}/{}:generateContent?key={}", GEMINI_BASE_URL, model, api_key);
    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("gemini", e))?;

    let body_text = handle_api_response(response, "gemini").await?;

    // Response shape: { "candidates": [{"content": {"parts": [{"text": "..."}]}}] }
    let resp_json: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
        let msg = format!("Failed to parse Gemini API response wrapper: {}", e);
        error!("{}", msg);
        msg
    })?;

    resp_json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let msg = "No text content in Gemini API response".to_string();
            error!("{}", msg);
            msg
        })
}

/// Call Gemini generateContent in image+text modality for an edit.
async fn call_gemini_edit(
    api_key: &str,
    model: &str,
    images: &[ImagePart],
    prompt: &str,
) -> Result<EditOutcome, String> {
    let client = build_api_client()?;

    let mut parts: Vec<serde_json::Value> = images.iter().map(gemini_image_part).collect();
    parts.push(serde_json::json!({ "text": prompt }));

    let body = serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"]
        }
    });

    let url = format!("{}/{}:generateContent?key={}", GEMINI_BASE_URL, model, api_key);
    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("gemini", e))?;

    let body_text = handle_api_response(response, "gemini").await?;

    let resp_json: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
        let msg = format!("Failed to parse Gemini API response wrapper: {}", e);
        error!("{}", msg);
        msg
    })?;

    parse_edit_parts(&resp_json)
}

/// Call the Anthropic Claude API with image blocks and a JSON-only system
/// instruction. Structured output is enforced by prompt, not schema mode.
async fn call_claude_analyze(
    api_key: &str,
    model: &str,
    images: &[ImagePart],
    prompt: &str,
) -> Result<String, String> {
    let client = build_api_client()?;

    let mut content: Vec<serde_json::Value> = images
        .iter()
        .map(|img| {
            serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": img.mime_type,
                    "data": img.data
                }
            })
        })
        .collect();
    content.push(serde_json::json!({ "type": "text", "text": prompt }));

    let body = serde_json::json!({
        "model": model,
        "max_tokens": 1024,
        "system": "You are an interior-design assistant. Always respond with valid JSON only, no markdown formatting or code blocks.",
        "messages": [
            {"role": "user", "content": content}
        ]
    });

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("claude", e))?;

    let body_text = handle_api_response(response, "claude").await?;

    // Response shape: { "content": [{"type": "text", "text": "..."}] }
    let resp_json: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
        let msg = format!("Failed to parse Claude API response wrapper: {}", e);
        error!("{}", msg);
        msg
    })?;

    resp_json["content"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let msg = "No text content in Claude API response".to_string();
            error!("{}", msg);
            msg
        })
}

/// Call the OpenAI API with image_url parts and strict json_schema output.
async fn call_openai_analyze(
    api_key: &str,
    model: &str,
    images: &[ImagePart],
    prompt: &str,
) -> Result<String, String> {
    let client = build_api_client()?;

    let mut content: Vec<serde_json::Value> = images
        .iter()
        .map(|img| {
            serde_json::json!({
                "type": "image_url",
                "image_url": { "url": img.to_data_url() }
            })
        })
        .collect();
    content.push(serde_json::json!({ "type": "text", "text": prompt }));

    let body = serde_json::json!({
        "model": model,
        "max_tokens": 1024,
        "messages": [
            {"role": "user", "content": content}
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "design_suggestions",
                "strict": true,
                "schema": suggestions_json_schema()
            }
        }
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("openai", e))?;

    let body_text = handle_api_response(response, "openai").await?;

    // Response shape: { "choices": [{"message": {"content": "..."}}] }
    let resp_json: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
        let msg = format!("Failed to parse OpenAI API response wrapper: {}", e);
        error!("{}", msg);
        msg
    })?;

    resp_json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let msg = "No content in OpenAI API response".to_string();
            error!("{}", msg);
            msg
        })
}

/// Render an ImagePart as a Gemini inline_data request part.
fn gemini_image_part(img: &ImagePart) -> serde_json::Value {
    serde_json::json!({
        "inline_data": {
            "mime_type": img.mime_type,
            "data": img.data
        }
    })
}

/// Parse a suggestion response body into an ordered list.
///
/// The model is asked for `{"suggestions": [...]}`; a missing array is an
/// empty result, anything that is not a JSON object is an error.
fn parse_suggestions(response_text: &str) -> Result<Vec<String>, String> {
    let cleaned = strip_markdown_json(response_text);
    let json: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        let truncated = if cleaned.len() > 500 {
            format!("{}...", &cleaned[..500])
        } else {
            cleaned.clone()
        };
        format!(
            "Failed to parse suggestion response as JSON: {}. Raw response (first 500 chars): {}",
            e, truncated
        )
    })?;

    if !json.is_object() {
        return Err("Suggestion response is not a JSON object".to_string());
    }

    let suggestions = json["suggestions"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(suggestions)
}

/// Walk the parts of a Gemini edit response, collecting the last text part
/// and the last inline image payload.
fn parse_edit_parts(resp_json: &serde_json::Value) -> Result<EditOutcome, String> {
    let parts = resp_json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| "No content parts in Gemini edit response".to_string())?;

    let mut outcome = EditOutcome::default();
    for part in parts {
        if let Some(text) = part["text"].as_str() {
            outcome.text = Some(text.to_string());
        }
        // The REST API returns camelCase; accept snake_case too.
        let inline = if part["inlineData"].is_object() {
            &part["inlineData"]
        } else {
            &part["inline_data"]
        };
        if let Some(data) = inline["data"].as_str() {
            outcome.new_image = Some(data.to_string());
        }
    }

    Ok(outcome)
}

/// Strip markdown code fences from a model response if present.
/// Some providers wrap JSON in ```json ... ``` despite instructions.
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let after_open = if let Some(pos) = trimmed.find('\n') {
            &trimmed[pos + 1..]
        } else {
            trimmed
        };
        let cleaned = after_open.trim_end();
        if cleaned.ends_with("```") {
            cleaned[..cleaned.len() - 3].trim().to_string()
        } else {
            cleaned.to_string()
        }
    } else {
        trimmed.to_string()
    }
}
