//! AWS IoT Device Shadow records.
//!
//! Requests carry their topic parameters (`thing_name`, `shadow_name`) as
//! `#[serde(skip)]` fields: they select the topic and never appear in the
//! payload. Responses tolerate missing fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Keep an explicit JSON `null` as `Some(Value::Null)` instead of folding it
/// into `None`. Absent fields still fall back to `None` via `#[serde(default)]`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

// ─── State documents ───

/// Desired and reported sections of a shadow document.
///
/// `Some(Value::Null)` serializes as `"desired": null`, which tells the
/// service to delete that section. `None` leaves the field out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowState {
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub desired: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported: Option<serde_json::Value>,
}

impl ShadowState {
    pub fn reported(reported: serde_json::Value) -> Self {
        Self {
            desired: None,
            reported: Some(reported),
        }
    }

    pub fn desired(desired: serde_json::Value) -> Self {
        Self {
            desired: Some(desired),
            reported: None,
        }
    }

    /// True when `desired` was sent (or is to be sent) as an explicit null.
    pub fn desired_is_null(&self) -> bool {
        matches!(self.desired, Some(serde_json::Value::Null))
    }

    /// True when `reported` was sent (or is to be sent) as an explicit null.
    pub fn reported_is_null(&self) -> bool {
        matches!(self.reported, Some(serde_json::Value::Null))
    }
}

/// Shadow state as returned by a get, including the computed delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowStateWithDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<serde_json::Value>,
}

/// Per-field update timestamps for the desired and reported sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported: Option<serde_json::Value>,
}

/// One side (previous or current) of a `/update/documents` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowUpdatedSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ShadowMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ShadowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

// ─── Requests ───

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl GetShadowRequest {
    pub fn new(thing_name: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            client_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNamedShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(skip)]
    pub shadow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl GetNamedShadowRequest {
    pub fn new(thing_name: impl Into<String>, shadow_name: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            shadow_name: shadow_name.into(),
            client_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl DeleteShadowRequest {
    pub fn new(thing_name: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            client_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNamedShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(skip)]
    pub shadow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl DeleteNamedShadowRequest {
    pub fn new(thing_name: impl Into<String>, shadow_name: impl Into<String>) -> Self {
        Self {
            thing_name: thing_name.into(),
            shadow_name: shadow_name.into(),
            client_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ShadowState>,
    /// Expected current version; the update is rejected on mismatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdateShadowRequest {
    pub fn new(thing_name: impl Into<String>, state: ShadowState) -> Self {
        Self {
            thing_name: thing_name.into(),
            client_token: None,
            state: Some(state),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNamedShadowRequest {
    #[serde(skip)]
    pub thing_name: String,
    #[serde(skip)]
    pub shadow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ShadowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl UpdateNamedShadowRequest {
    pub fn new(
        thing_name: impl Into<String>,
        shadow_name: impl Into<String>,
        state: ShadowState,
    ) -> Self {
        Self {
            thing_name: thing_name.into(),
            shadow_name: shadow_name.into(),
            client_token: None,
            state: Some(state),
            version: None,
        }
    }
}

// ─── Subscription requests ───

/// Subscription request addressing a classic (unnamed) shadow topic.
macro_rules! thing_subscription_request {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
            pub struct $name {
                pub thing_name: String,
            }

            impl $name {
                pub fn new(thing_name: impl Into<String>) -> Self {
                    Self { thing_name: thing_name.into() }
                }
            }
        )+
    };
}

/// Subscription request addressing a named shadow topic.
macro_rules! named_shadow_subscription_request {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
            pub struct $name {
                pub thing_name: String,
                pub shadow_name: String,
            }

            impl $name {
                pub fn new(thing_name: impl Into<String>, shadow_name: impl Into<String>) -> Self {
                    Self {
                        thing_name: thing_name.into(),
                        shadow_name: shadow_name.into(),
                    }
                }
            }
        )+
    };
}

thing_subscription_request!(
    GetShadowSubscriptionRequest,
    UpdateShadowSubscriptionRequest,
    DeleteShadowSubscriptionRequest,
    ShadowDeltaUpdatedSubscriptionRequest,
    ShadowUpdatedSubscriptionRequest,
);

named_shadow_subscription_request!(
    GetNamedShadowSubscriptionRequest,
    UpdateNamedShadowSubscriptionRequest,
    DeleteNamedShadowSubscriptionRequest,
    NamedShadowDeltaUpdatedSubscriptionRequest,
    NamedShadowUpdatedSubscriptionRequest,
);

// ─── Responses & events ───

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetShadowResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ShadowMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ShadowStateWithDelta>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateShadowResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ShadowMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ShadowState>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteShadowResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// Published on `/update/delta` when desired diverges from reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShadowDeltaUpdatedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// Published on `/update/documents` after every accepted update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowUpdatedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ShadowUpdatedSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<ShadowUpdatedSnapshot>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Body of every shadow `/rejected` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(default, rename_all = "camelCase")]
#[error(
    "shadow request rejected (code {}): {}",
    .code.map_or_else(|| "?".to_string(), |c| c.to_string()),
    .message.as_deref().unwrap_or("no message")
)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    /// HTTP-style status code (400, 404, 409, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}
