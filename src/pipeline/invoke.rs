//! Model invocation: build the Nova request body and call Bedrock.
//!
//! The network call sits behind [`InferenceClient`] so the worker pool can be
//! driven by a stub in tests. [`BedrockClient`] is the production
//! implementation on top of `aws-sdk-bedrockruntime`.
//!
//! ## Single attempt
//!
//! The SDK's built-in retry is disabled. A throttled or failed call becomes
//! a [`TaskError::Invoke`], is logged, and the worker moves on.

use crate::config::InferenceParams;
use crate::error::TaskError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// JSON pointer to the generated text inside a Nova response.
pub const TEXT_POINTER: &str = "/output/message/content/0/text";

/// Sends one serialised request body to a model and returns the raw response body.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, TaskError>;
}

/// [`InferenceClient`] backed by the Bedrock runtime `InvokeModel` API.
#[derive(Debug, Clone)]
pub struct BedrockClient {
    inner: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    /// Build a client for `region`. Credentials come from the standard AWS
    /// provider chain (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// `AWS_SESSION_TOKEN`, profiles, instance metadata, ...).
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        Self {
            inner: aws_sdk_bedrockruntime::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl InferenceClient for BedrockClient {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, TaskError> {
        let response = self
            .inner
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| TaskError::Invoke {
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(response.body.into_inner())
    }
}

// ── Request body ─────────────────────────────────────────────────────────

/// Nova `messages-v1` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaRequest<'a> {
    pub schema_version: &'static str,
    pub messages: Vec<NovaMessage<'a>>,
    pub inference_config: InferenceParams,
}

#[derive(Debug, Serialize)]
pub struct NovaMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentBlock<'a> {
    Image {
        format: &'a str,
        source: ImageSource<'a>,
    },
    Text(&'a str),
}

#[derive(Debug, Serialize)]
pub struct ImageSource<'a> {
    pub bytes: &'a str,
}

/// Build the request for one image: the image block first, then the prompt.
pub fn build_request<'a>(
    image: &'a EncodedImage,
    prompt: &'a str,
    params: InferenceParams,
) -> NovaRequest<'a> {
    NovaRequest {
        schema_version: "messages-v1",
        messages: vec![NovaMessage {
            role: "user",
            content: vec![
                ContentBlock::Image {
                    format: image.format,
                    source: ImageSource { bytes: &image.data },
                },
                ContentBlock::Text(prompt),
            ],
        }],
        inference_config: params,
    }
}

// ── Response ─────────────────────────────────────────────────────────────

/// Parsed model reply: the generated text plus the full response document.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub text: String,
    pub raw: Value,
}

/// Parse a raw response body and pull out the generated text.
pub fn parse_response(body: &[u8]) -> Result<InferenceResponse, TaskError> {
    let raw: Value = serde_json::from_slice(body).map_err(|e| TaskError::InvalidResponse {
        detail: e.to_string(),
    })?;

    let text = raw
        .pointer(TEXT_POINTER)
        .and_then(Value::as_str)
        .ok_or(TaskError::MissingText {
            pointer: TEXT_POINTER,
        })?
        .to_string();

    if let Some(usage) = raw.get("usage") {
        debug!("Token usage: {}", usage);
    }

    Ok(InferenceResponse { text, raw })
}

/// Build the request for an encoded image, call the model and parse the reply.
pub async fn infer(
    client: &dyn InferenceClient,
    model_id: &str,
    image: &EncodedImage,
    prompt: &str,
    params: InferenceParams,
) -> Result<InferenceResponse, TaskError> {
    let request = build_request(image, prompt, params);
    let body = serde_json::to_vec(&request).map_err(|e| TaskError::Request {
        detail: e.to_string(),
    })?;
    let reply = client.invoke(model_id, body).await?;
    parse_response(&reply)
}
