//! Media type table: mime type → (type, sub_type)

use std::collections::HashMap;

/// File classification derived from a mime type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    pub extension: &'static str,
    pub file_type: &'static str,
    pub sub_type: &'static str,
    pub mime_type: &'static str,
}

const fn mt(
    extension: &'static str,
    file_type: &'static str,
    mime_type: &'static str,
) -> MediaType {
    MediaType {
        extension,
        file_type,
        sub_type: "",
        mime_type,
    }
}

const MEDIA_TYPES: &[MediaType] = &[
    mt("mp4", "video", "video/mp4"),
    mt("wmv", "video", "video/x-ms-wmv"),
    mt("flv", "video", "video/x-flv"),
    mt("mov", "video", "video/quicktime"),
    mt("asf", "video", "video/x-ms-asf"),
    mt("mpg", "video", "video/mpeg"),
    mt("avi", "video", "video/x-msvideo"),
    mt("mp3", "audio", "audio/mpeg"),
    mt("wma", "audio", "audio/x-ms-wma"),
    mt("mid", "audio", "audio/midi"),
    mt("wav", "audio", "audio/x-wav"),
    mt("aac", "audio", "audio/aac"),
    mt("jpg", "image", "image/jpeg"),
    mt("gif", "image", "image/gif"),
    mt("bmp", "image", "image/bmp"),
    mt("tif", "image", "image/tiff"),
    mt("zip", "image", "application/zip"),
    mt("7z", "image", "application/x-7z-compressed"),
    mt("rar", "image", "application/x-rar-compressed"),
    mt("doc", "text", "application/msword"),
    mt(
        "docx",
        "text",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    mt("pdf", "text", "application/pdf"),
    mt("rtf", "text", "application/rtf"),
    mt("txt", "text", "text/plain"),
    mt("html", "text", "text/html"),
    mt("epub", "text", "application/epub+zip"),
    mt("xls", "sheet", "application/vnd.ms-excel"),
    mt("swf", "banner", "application/x-shockwave-flash"),
    mt("ppt", "presentation", "application/vnd.ms-powerpoint"),
    mt(
        "pptx",
        "presentation",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
];

/// Immutable mime type lookup table
#[derive(Debug, Clone)]
pub struct MediaTypeTable {
    by_mime: HashMap<&'static str, MediaType>,
}

impl Default for MediaTypeTable {
    fn default() -> Self {
        Self {
            by_mime: MEDIA_TYPES.iter().map(|m| (m.mime_type, *m)).collect(),
        }
    }
}

impl MediaTypeTable {
    /// Case-insensitive lookup by mime type
    pub fn by_mime(&self, mime_type: &str) -> Option<&MediaType> {
        self.by_mime.get(mime_type.to_ascii_lowercase().as_str())
    }
}
