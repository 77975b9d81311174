//! Event source, detail-type, and API operation names.

use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope Constants
// =============================================================================

/// Bus source for object-storage events.
pub const SOURCE_S3: &str = "aws.s3";

/// Detail-type of audit-trail API call events.
pub const DETAIL_TYPE_API_CALL: &str = "AWS API Call via CloudTrail";

/// `detail.eventSource` for object-storage API calls.
pub const EVENT_SOURCE_S3: &str = "s3.amazonaws.com";

/// Audit record version carried in `detail.eventVersion`.
pub const API_CALL_EVENT_VERSION: &str = "1.08";

// =============================================================================
// Object Operations
// =============================================================================

/// Object-level API operations recorded by the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectOperation {
    PutObject,
    CopyObject,
    CompleteMultipartUpload,
    DeleteObject,
    GetObject,
    HeadObject,
}

impl ObjectOperation {
    /// The `eventName` recorded for this operation.
    pub fn event_name(&self) -> &'static str {
        match self {
            ObjectOperation::PutObject => "PutObject",
            ObjectOperation::CopyObject => "CopyObject",
            ObjectOperation::CompleteMultipartUpload => "CompleteMultipartUpload",
            ObjectOperation::DeleteObject => "DeleteObject",
            ObjectOperation::GetObject => "GetObject",
            ObjectOperation::HeadObject => "HeadObject",
        }
    }

    /// Whether the trail records this as a read-only call.
    pub fn is_read_only(&self) -> bool {
        matches!(self, ObjectOperation::GetObject | ObjectOperation::HeadObject)
    }
}

impl std::fmt::Display for ObjectOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}
