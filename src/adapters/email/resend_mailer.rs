//! Resend bulk mailer adapter.
//!
//! Renders each destination's message locally and submits them through the
//! batch endpoint with permissive validation, so one bad address does not
//! sink the whole call. Per-index errors come back as rejected destinations.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ports::{
    BulkMailer, BulkSendReport, BulkTemplatedMessage, MailError, RejectedDestination,
};

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    base_url: String,
}

impl ResendConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: "https://api.resend.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Subject and body text with `{{key}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplate {
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct ResendEmail {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResendBatchResponse {
    #[serde(default)]
    errors: Vec<ResendBatchError>,
}

#[derive(Debug, Deserialize)]
struct ResendBatchError {
    index: usize,
    message: String,
}

pub struct ResendMailer {
    config: ResendConfig,
    templates: HashMap<String, MailTemplate>,
    http_client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: ResendConfig, templates: HashMap<String, MailTemplate>) -> Self {
        Self {
            config,
            templates,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Replaces every `{{key}}` whose key is present in `data`. Unknown
/// placeholders are left as written.
fn render(text: &str, data: &Map<String, Value>) -> String {
    let mut out = text.to_string();
    for (key, value) in data {
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("{{{{{}}}}}", key), &replacement);
    }
    out
}

/// Per-destination data merged over the defaults.
fn merged_data(defaults: &Value, overrides: &Value) -> Map<String, Value> {
    let mut data = defaults.as_object().cloned().unwrap_or_default();
    if let Some(extra) = overrides.as_object() {
        for (k, v) in extra {
            data.insert(k.clone(), v.clone());
        }
    }
    data
}

fn build_batch(message: &BulkTemplatedMessage, template: &MailTemplate) -> Vec<ResendEmail> {
    message
        .destinations
        .iter()
        .map(|destination| {
            let data = merged_data(&message.default_data, &destination.replacement_data);
            ResendEmail {
                from: message.source.clone(),
                to: vec![destination.address.clone()],
                subject: render(&template.subject, &data),
                html: render(&template.html, &data),
            }
        })
        .collect()
}

fn split_report(message: &BulkTemplatedMessage, errors: Vec<ResendBatchError>) -> BulkSendReport {
    let mut failed: HashMap<usize, String> =
        errors.into_iter().map(|e| (e.index, e.message)).collect();
    let mut report = BulkSendReport::default();
    for (index, destination) in message.destinations.iter().enumerate() {
        match failed.remove(&index) {
            Some(reason) => report.rejected.push(RejectedDestination {
                address: destination.address.clone(),
                reason,
            }),
            None => report.accepted.push(destination.address.clone()),
        }
    }
    report
}

#[async_trait]
impl BulkMailer for ResendMailer {
    async fn send_bulk_templated(
        &self,
        message: BulkTemplatedMessage,
    ) -> Result<BulkSendReport, MailError> {
        let template = self
            .templates
            .get(&message.template)
            .ok_or_else(|| MailError::UnknownTemplate(message.template.clone()))?;

        let url = format!("{}/emails/batch", self.config.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header("x-batch-validation", "permissive")
            .json(&build_batch(&message, template))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %message, "Resend batch send failed");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ResendBatchResponse = response
            .json()
            .await
            .map_err(|e| MailError::InvalidResponse(e.to_string()))?;

        let report = split_report(&message, body.errors);
        tracing::info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Resend batch sent"
        );
        Ok(report)
    }
}
