// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gemini `generateContent` client and the diagram requester built on it.
//!
//! Wire shapes:
//!
//! - request: `{"contents":[{"parts":[{"text": <prompt>}]}]}`, key passed as `?key=`
//! - response: `{"candidates":[{"content":{"parts":[{"text": <reply>}]}}]}`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::credential::{Credential, CredentialError, CredentialStore};
use crate::diagram::DiagramKind;

/// Prompt used by the settings screen to check a key.
pub const KEY_CHECK_PROMPT: &str = "Hello";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_prompt(prompt: &'a str) -> Self {
        Self {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Gemini API request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Gemini API error: {status}")]
    Status { status: u16 },
    #[error("unexpected response from the Gemini API ({detail})")]
    MalformedResponse { detail: String },
}

impl GeminiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Thin client for one `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    /// `endpoint` is the full `…/models/<model>:generateContent` URL.
    ///
    /// `timeout` bounds the whole request; `None` waits indefinitely.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, GeminiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| GeminiError::Client(err.without_url()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeminiError> {
        Self::new(config.generate_content_url(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        &self,
        key: &Credential,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            key = %key,
            prompt_chars = prompt.chars().count(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", key.expose())])
            .json(&GenerateContentRequest::single_prompt(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "generateContent returned non-success status");
            return Err(GeminiError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|err| GeminiError::MalformedResponse {
            detail: format!("body is not valid JSON: {err}"),
        })
    }

    /// Returns the first candidate's first text part, verbatim.
    pub async fn generate(&self, key: &Credential, prompt: &str) -> Result<String, GeminiError> {
        let response = self.send(key, prompt).await?;
        first_candidate_text(response)
    }
}

/// The request URL carries the key as `?key=`, so it never reaches the error text.
fn transport_error(err: reqwest::Error) -> GeminiError {
    GeminiError::Transport(err.without_url())
}

fn first_candidate_text(response: GenerateContentResponse) -> Result<String, GeminiError> {
    let Some(content) = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
    else {
        return Err(GeminiError::MalformedResponse {
            detail: "missing candidates[0].content".to_owned(),
        });
    };

    content
        .parts
        .into_iter()
        .next()
        .and_then(|part| part.text)
        .ok_or_else(|| GeminiError::MalformedResponse {
            detail: "missing candidates[0].content.parts[0].text".to_owned(),
        })
}

/// Builds the single instruction sent to the model.
pub fn build_prompt(text: &str, kind: DiagramKind) -> String {
    format!(
        "Summarize and structure the following text as a Mermaid.js {label}. \
Start the diagram with `{keyword}`. Keep node labels short and write them in the same language \
as the text. Reply with a single ```mermaid code block and nothing else.\n\nText:\n{text}",
        label = kind.label(),
        keyword = kind.mermaid_keyword(),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(
        "Gemini API key is not set. Open settings (press `s`, or run `zukai settings set-key <KEY>`) to add one."
    )]
    MissingCredential,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

/// Turns selected text into a diagram description.
#[async_trait]
pub trait DiagramRequester: Send + Sync {
    async fn request_diagram(&self, text: &str, kind: DiagramKind) -> Result<String, RequestError>;
}

/// [`DiagramRequester`] backed by Gemini and a stored credential.
pub struct GeminiRequester<S> {
    client: GeminiClient,
    store: Arc<S>,
}

impl<S: CredentialStore> GeminiRequester<S> {
    pub fn new(client: GeminiClient, store: Arc<S>) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> DiagramRequester for GeminiRequester<S> {
    async fn request_diagram(&self, text: &str, kind: DiagramKind) -> Result<String, RequestError> {
        let Some(key) = self.store.load()? else {
            return Err(RequestError::MissingCredential);
        };

        let prompt = build_prompt(text, kind);
        let reply = self.client.generate(&key, &prompt).await?;
        tracing::info!(kind = %kind, reply_chars = reply.chars().count(), "received diagram reply");
        Ok(reply)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyValidationError {
    #[error("API key is invalid. Check the key and try again.")]
    Invalid,
    #[error("API key lacks permission for this model.")]
    Forbidden,
    #[error("API test failed ({status})")]
    Failed { status: u16 },
    #[error("API response had an unexpected shape.")]
    UnexpectedShape,
    #[error(transparent)]
    Transport(GeminiError),
}

/// Low-cost liveness check for a candidate key.
#[async_trait]
pub trait KeyValidator: Send + Sync {
    async fn validate_key(&self, key: &Credential) -> Result<(), KeyValidationError>;
}

#[async_trait]
impl KeyValidator for GeminiClient {
    async fn validate_key(&self, key: &Credential) -> Result<(), KeyValidationError> {
        match self.send(key, KEY_CHECK_PROMPT).await {
            Ok(response) => {
                let has_candidate = response
                    .candidates
                    .as_ref()
                    .is_some_and(|candidates| !candidates.is_empty());
                if has_candidate {
                    Ok(())
                } else {
                    Err(KeyValidationError::UnexpectedShape)
                }
            }
            Err(GeminiError::Status { status: 400 }) => Err(KeyValidationError::Invalid),
            Err(GeminiError::Status { status: 403 }) => Err(KeyValidationError::Forbidden),
            Err(GeminiError::Status { status }) => Err(KeyValidationError::Failed { status }),
            Err(GeminiError::MalformedResponse { .. }) => Err(KeyValidationError::UnexpectedShape),
            Err(err) => Err(KeyValidationError::Transport(err)),
        }
    }
}
