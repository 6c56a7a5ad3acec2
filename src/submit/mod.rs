//! Visit submission
//!
//! Validates an (optionally edited) record plus the visit purpose and POSTs it
//! to the visit-logging service. Duplicate visitors are the service's concern.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SubmissionConfig;
use crate::error::{SubmissionError, ValidationError};
use crate::extract::{ExtractedRecord, RecordField};

const DEFAULT_SUCCESS_MESSAGE: &str = "Visit recorded.";

/// Request body understood by the visit service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitSubmission {
    #[serde(rename = "nik")]
    id_number: String,
    #[serde(rename = "nama")]
    full_name: String,
    #[serde(rename = "tempatLahir")]
    birthplace: Option<String>,
    #[serde(rename = "tanggalLahir")]
    birth_date: Option<String>,
    #[serde(rename = "alamat")]
    address: Option<String>,
    purpose: String,
}

impl VisitSubmission {
    /// Check required fields before anything touches the network
    pub fn new(record: &ExtractedRecord, purpose: &str) -> Result<Self, ValidationError> {
        let required = [
            (RecordField::IdNumber.label(), record.id_number.trim()),
            (RecordField::FullName.label(), record.full_name.trim()),
            ("Tujuan", purpose.trim()),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::new(missing));
        }

        Ok(Self {
            id_number: record.id_number.trim().to_string(),
            full_name: record.full_name.trim().to_string(),
            birthplace: optional(&record.birthplace),
            birth_date: optional(&record.birth_date),
            address: optional(&record.address),
            purpose: purpose.trim().to_string(),
        })
    }

    pub fn id_number(&self) -> &str {
        &self.id_number
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Response body; success carries `message`, failure carries `error`
#[derive(Debug, Default, Deserialize)]
struct VisitResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the visit service
pub struct VisitClient {
    client: reqwest::Client,
    endpoint: String,
}

impl VisitClient {
    pub fn new(config: &SubmissionConfig) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one visit. Returns the service's confirmation message.
    pub async fn submit(&self, visit: &VisitSubmission) -> Result<String, SubmissionError> {
        debug!("Submitting visit for {} to {}", visit.id_number, self.endpoint);

        let response = self.client.post(&self.endpoint).json(visit).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body: VisitResponse = serde_json::from_str(&text).unwrap_or_else(|e| {
            debug!("Visit service returned non-JSON body: {}", e);
            VisitResponse::default()
        });

        if !status.is_success() {
            let detail = body
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| status.to_string());
            warn!("Visit rejected with {}: {}", status, detail);
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let message = body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        info!("Visit recorded for {}", visit.id_number);
        Ok(message)
    }
}
