// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed reply provider.
//!
//! Posts the bounded context to an opaque JSON endpoint and reads back
//! `{"reply": "..."}`. The API key travels only in the default headers;
//! it never appears in logs or error strings.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use chowkidar_core::traits::reply::{ReplyContext, ReplyProvider};
use chowkidar_core::ChowkidarError;

/// Reply provider speaking a minimal JSON protocol over HTTP.
pub struct HttpReplyProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ReplyResponse {
    reply: String,
}

impl HttpReplyProvider {
    pub fn new(endpoint: String, api_key: Option<&str>) -> Result<Self, ChowkidarError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ChowkidarError::Config("invalid reply provider key".into()))?;
            value.set_sensitive(true);
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChowkidarError::TransientProvider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ReplyProvider for HttpReplyProvider {
    async fn generate(&self, context: &ReplyContext) -> Result<String, ChowkidarError> {
        let body = json!({
            "system": context.system_prompt,
            "messages": context
                .turns
                .iter()
                .map(|(role, content)| json!({"role": role.to_string(), "content": content}))
                .collect::<Vec<_>>(),
            "context": context.perception_summary,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChowkidarError::TransientProvider {
                message: format!("reply request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "reply provider response received");

        if !status.is_success() {
            return Err(ChowkidarError::TransientProvider {
                message: format!("reply provider returned {status}"),
                source: None,
            });
        }

        let parsed: ReplyResponse =
            response
                .json()
                .await
                .map_err(|e| ChowkidarError::ContractViolation {
                    message: format!("malformed reply provider response: {e}"),
                })?;
        Ok(parsed.reply)
    }
}
