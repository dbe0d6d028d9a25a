//! Inbound workflow events
//!
//! One request type per operation kind. Field names follow the studio
//! workflow's JSON payloads.

use chrono::{DateTime, Utc};
use mdb_common::registry::OperationKind;
use serde::{Deserialize, Serialize};

use super::CITMetadata;

/// Who performed an operation, and where
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OperationInfo {
    /// Acting station name
    pub station: String,
    /// Acting user's email
    pub user: String,
    /// Correlation token shared by matching capture_start / capture_stop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

/// Producer-side description of a file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileDescriptor {
    /// Hex encoded SHA-1 content hash
    pub sha1: String,
    pub file_name: String,
    #[serde(default)]
    pub size: i64,
    /// Creation time on the producing device
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub language: String,
}

/// File with a media duration (seconds)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AVFile {
    #[serde(flatten)]
    pub file: FileDescriptor,
    pub duration: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureStartRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    pub file_name: String,
    pub capture_source: String,
    pub collection_uid: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureStopRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    #[serde(flatten)]
    pub file: FileDescriptor,
    pub capture_source: String,
    /// Capture id of the owning lesson (or of the program itself)
    pub collection_uid: String,
    pub part: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemuxRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    /// Hash of the demuxed capture
    pub sha1: String,
    pub original: AVFile,
    pub proxy: AVFile,
    pub capture_source: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrimRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    pub original_sha1: String,
    pub proxy_sha1: String,
    pub original: AVFile,
    pub proxy: AVFile,
    pub capture_source: String,
    #[serde(rename = "in")]
    pub in_points: Vec<f64>,
    #[serde(rename = "out")]
    pub out_points: Vec<f64>,
}

/// One side of a send: an already known file, possibly renamed or reclassified
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SendFile {
    pub sha1: String,
    pub file_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SendFile {
    /// Whether any classification field accompanies the name
    pub fn reclassifies(&self) -> bool {
        self.file_type.is_some()
            || self.sub_type.is_some()
            || self.mime_type.is_some()
            || self.language.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    pub original: SendFile,
    pub proxy: SendFile,
    #[serde(default)]
    pub metadata: Option<CITMetadata>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    pub sha1: String,
    pub output: Vec<AVFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadRequest {
    #[serde(flatten)]
    pub operation: OperationInfo,
    #[serde(flatten)]
    pub file: AVFile,
    /// Public URL of the uploaded file
    pub url: String,
}

/// Closed set of pipeline events
#[derive(Debug, Clone)]
pub enum OperationRequest {
    CaptureStart(CaptureStartRequest),
    CaptureStop(CaptureStopRequest),
    Demux(DemuxRequest),
    Trim(TrimRequest),
    Send(SendRequest),
    Convert(ConvertRequest),
    Upload(UploadRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::CaptureStart(_) => OperationKind::CaptureStart,
            OperationRequest::CaptureStop(_) => OperationKind::CaptureStop,
            OperationRequest::Demux(_) => OperationKind::Demux,
            OperationRequest::Trim(_) => OperationKind::Trim,
            OperationRequest::Send(_) => OperationKind::Send,
            OperationRequest::Convert(_) => OperationKind::Convert,
            OperationRequest::Upload(_) => OperationKind::Upload,
        }
    }

    pub fn info(&self) -> &OperationInfo {
        match self {
            OperationRequest::CaptureStart(r) => &r.operation,
            OperationRequest::CaptureStop(r) => &r.operation,
            OperationRequest::Demux(r) => &r.operation,
            OperationRequest::Trim(r) => &r.operation,
            OperationRequest::Send(r) => &r.operation,
            OperationRequest::Convert(r) => &r.operation,
            OperationRequest::Upload(r) => &r.operation,
        }
    }
}
