//! Content type classification
//!
//! Maps filenames to MIME types and decides whether a browser may render
//! them inline.

use mime_guess::mime;

/// Exact types that are safe to preview even though they are not `text/*`
/// or `image/*`.
const PREVIEWABLE_TYPES: [&str; 6] = [
    "application/pdf",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/x-httpd-php",
    "application/x-php",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub mime: String,
    pub previewable: bool,
}

/// Classify a filename by its extension.
///
/// Unknown extensions are reported as `application/octet-stream` and are
/// never previewable.
pub fn classify(filename: &str) -> ContentType {
    let guessed = mime_guess::from_path(filename).first_or_octet_stream();
    let previewable = guessed.type_() == mime::TEXT
        || guessed.type_() == mime::IMAGE
        || PREVIEWABLE_TYPES.contains(&guessed.essence_str());

    ContentType {
        mime: guessed.essence_str().to_string(),
        previewable,
    }
}

/// Shortcut for listings, which only need the preview flag.
pub fn is_previewable(filename: &str) -> bool {
    classify(filename).previewable
}
