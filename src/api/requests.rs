//! Request payloads
//!
//! Query strings and bodies accepted by the HTTP endpoints, plus the body
//! parser for bulk downloads which accepts both JSON and HTML forms.

use serde::Deserialize;

use crate::error::StorageError;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub download: Option<String>,
}

impl DownloadQuery {
    /// `?download=true` forces an attachment even for previewable files.
    pub fn as_attachment(&self) -> bool {
        self.download
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectoryRequest {
    /// Parent directory, empty for the root
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkPathsRequest {
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkMoveRequest {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub target: String,
}

/// Extract the `paths` list of a bulk download body.
///
/// JSON bodies carry `{"paths": [...]}`. Form bodies carry either repeated
/// `paths` fields or a single field holding a JSON array.
pub fn parse_bulk_paths(content_type: &str, body: &[u8]) -> Result<Vec<String>, StorageError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let paths = match mime.as_str() {
        "application/json" => {
            let request: BulkPathsRequest = serde_json::from_slice(body)
                .map_err(|e| StorageError::BadRequest(format!("invalid JSON body: {}", e)))?;
            request.paths
        }
        "application/x-www-form-urlencoded" => {
            let values: Vec<String> = url::form_urlencoded::parse(body)
                .filter(|(key, _)| key == "paths" || key == "paths[]")
                .map(|(_, value)| value.into_owned())
                .collect();

            match values.as_slice() {
                [single] if single.trim_start().starts_with('[') => {
                    serde_json::from_str(single).map_err(|e| {
                        StorageError::BadRequest(format!("invalid paths field: {}", e))
                    })?
                }
                _ => values,
            }
        }
        other => {
            return Err(StorageError::BadRequest(format!(
                "unsupported content type {:?}",
                other
            )));
        }
    };

    require_paths(paths)
}

/// Reject an empty path list.
pub fn require_paths(paths: Vec<String>) -> Result<Vec<String>, StorageError> {
    if paths.is_empty() {
        return Err(StorageError::BadRequest("No paths provided".into()));
    }
    Ok(paths)
}
