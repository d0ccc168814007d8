//! HTTP invoker - one POST per skill call
//!
//! Body: `{"skill_id": ..., "payload": {...}}`. A 2xx response body is the
//! output; when the body is a JSON object with an `output` string, that
//! field is used instead.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use super::{SkillInvoker, SkillRequest};
use crate::ast::Payload;

pub struct HttpInvoker {
    client: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpInvoker {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull the output text out of a response body
fn output_text(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => match map.get("output") {
            Some(Value::String(s)) => s.clone(),
            _ => body,
        },
        _ => body,
    }
}

#[async_trait]
impl SkillInvoker for HttpInvoker {
    fn name(&self) -> &str {
        "http"
    }

    async fn invoke(&self, skill_id: &str, payload: &Payload) -> Result<String> {
        debug!(endpoint = %self.endpoint, skill = skill_id, "posting skill request");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&SkillRequest { skill_id, payload });
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                endpoint = %self.endpoint,
                skill = skill_id,
                status = %status,
                "skill endpoint returned error"
            );
            bail!("Skill endpoint error ({}): {}", status, error_text);
        }

        let body = response
            .text()
            .await
            .context("Failed to read skill response")?;
        Ok(output_text(body))
    }
}
