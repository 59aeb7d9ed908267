//! MIME type detection based on file extensions.

use std::path::Path;

/// Returned when the extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Maps an extension (with or without the leading dot) to a MIME type.
pub fn mime_type_by_extension(ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        return DEFAULT_MIME_TYPE.to_string();
    }
    mime_guess::from_ext(ext).first_or_octet_stream().to_string()
}

/// MIME type for the file at `path`, judged by its extension only.
pub fn mime_type_for_path(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => mime_type_by_extension(ext),
        None => DEFAULT_MIME_TYPE.to_string(),
    }
}
