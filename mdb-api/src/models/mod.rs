//! Request types for the operation pipeline

pub mod metadata;
pub mod requests;

pub use metadata::CITMetadata;
pub use requests::{
    AVFile, CaptureStartRequest, CaptureStopRequest, ConvertRequest, DemuxRequest,
    FileDescriptor, OperationInfo, OperationRequest, SendFile, SendRequest, TrimRequest,
    UploadRequest,
};
