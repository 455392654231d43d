//! AWS IoT fleet provisioning (Identity) records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Request for a new key pair and certificate. Sent as an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateKeysAndCertificateRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateFromCsrRequest {
    /// PEM-encoded certificate signing request.
    pub certificate_signing_request: String,
}

impl CreateCertificateFromCsrRequest {
    pub fn new(certificate_signing_request: impl Into<String>) -> Self {
        Self {
            certificate_signing_request: certificate_signing_request.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterThingRequest {
    #[serde(skip)]
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ownership_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, String>>,
}

impl RegisterThingRequest {
    pub fn new(
        template_name: impl Into<String>,
        certificate_ownership_token: impl Into<String>,
    ) -> Self {
        Self {
            template_name: template_name.into(),
            certificate_ownership_token: Some(certificate_ownership_token.into()),
            parameters: None,
        }
    }
}

// ─── Subscription requests ───

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CreateKeysAndCertificateSubscriptionRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CreateCertificateFromCsrSubscriptionRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RegisterThingSubscriptionRequest {
    pub template_name: String,
}

impl RegisterThingSubscriptionRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
        }
    }
}

// ─── Responses ───

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateKeysAndCertificateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_ownership_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_pem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCertificateFromCsrResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_ownership_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_pem: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterThingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_configuration: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thing_name: Option<String>,
}

/// Body of every provisioning `/rejected` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(default, rename_all = "camelCase")]
#[error(
    "provisioning request rejected ({}, status {}): {}",
    .error_code.as_deref().unwrap_or("unknown"),
    .status_code.map_or_else(|| "?".to_string(), |c| c.to_string()),
    .error_message.as_deref().unwrap_or("no message")
)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
}
