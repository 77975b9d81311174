//! Bus event envelope - the wrapper the event bus delivers to rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EventError, ObjectOperation, API_CALL_EVENT_VERSION, DETAIL_TYPE_API_CALL, EVENT_SOURCE_S3,
    SOURCE_S3,
};

/// The envelope every bus event shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Envelope schema version (always "0").
    pub version: String,

    /// Unique event identifier.
    pub id: Uuid,

    /// Kind of event, e.g. [`DETAIL_TYPE_API_CALL`].
    #[serde(rename = "detail-type")]
    pub detail_type: String,

    /// Emitting service, e.g. [`SOURCE_S3`].
    pub source: String,

    /// Account the event belongs to.
    pub account: String,

    /// When the event occurred.
    pub time: DateTime<Utc>,

    /// Region the event was emitted in.
    pub region: String,

    /// ARNs of resources involved.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Source-specific payload.
    pub detail: serde_json::Value,
}

/// Audit-trail record of an API call, carried in [`BusEvent::detail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallDetail {
    pub event_version: String,
    pub event_source: String,
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    pub aws_region: String,
    #[serde(rename = "eventID")]
    pub event_id: Uuid,
    pub read_only: bool,
    #[serde(default)]
    pub request_parameters: serde_json::Value,
}

impl BusEvent {
    /// An audit-trail event for an object-level API call.
    pub fn object_api_call(
        operation: ObjectOperation,
        bucket: &str,
        key: &str,
        region: &str,
        account: &str,
    ) -> Self {
        let now = Utc::now();
        let detail = ApiCallDetail {
            event_version: API_CALL_EVENT_VERSION.to_string(),
            event_source: EVENT_SOURCE_S3.to_string(),
            event_name: operation.event_name().to_string(),
            event_time: now,
            aws_region: region.to_string(),
            event_id: Uuid::new_v4(),
            read_only: operation.is_read_only(),
            request_parameters: serde_json::json!({
                "bucketName": bucket,
                "key": key,
            }),
        };

        Self {
            version: "0".to_string(),
            id: Uuid::new_v4(),
            detail_type: DETAIL_TYPE_API_CALL.to_string(),
            source: SOURCE_S3.to_string(),
            account: account.to_string(),
            time: now,
            region: region.to_string(),
            resources: Vec::new(),
            // Infallible: plain data with string keys.
            detail: serde_json::to_value(detail).unwrap_or_default(),
        }
    }

    /// Decode the detail as an audit-trail API call record.
    pub fn api_call(&self) -> Result<ApiCallDetail, EventError> {
        Ok(serde_json::from_value(self.detail.clone())?)
    }

    /// `detail.requestParameters.bucketName`, if present.
    pub fn bucket_name(&self) -> Option<&str> {
        self.detail
            .get("requestParameters")?
            .get("bucketName")?
            .as_str()
    }

    /// `detail.requestParameters.key`, if present.
    pub fn object_key(&self) -> Option<&str> {
        self.detail.get("requestParameters")?.get("key")?.as_str()
    }

    pub fn to_value(&self) -> Result<serde_json::Value, EventError> {
        Ok(serde_json::to_value(self)?)
    }
}
