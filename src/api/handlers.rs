//! Endpoint handlers
//!
//! Each handler resolves its input through the root, runs the blocking
//! filesystem work on the blocking pool and maps failures through
//! [`StorageError`]'s status table.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::{debug, info};
use std::io;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::api::requests::{
    BulkMoveRequest, BulkPathsRequest, CreateDirectoryRequest, DeleteRequest, DownloadQuery,
    ListQuery, parse_bulk_paths, require_paths,
};
use crate::api::responses::{BulkResponse, MessageResponse};
use crate::error::StorageError;
use crate::navigate::{Listing, list_directory};
use crate::server::AppState;
use crate::storage::operations;
use crate::system::{self, SystemStats};
use crate::transfer::{
    ARCHIVE_NAME, StagedUpload, UploadResult, build_zip, commit_upload, prepare_download,
    save_upload, stage_upload,
};

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StorageError::Io(io::Error::other(e)))?
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing>, StorageError> {
    let root = Arc::clone(&state.root);
    let listing = blocking(move || {
        let dir = root.resolve(&query.path)?;
        list_directory(&root, &dir)
    })
    .await?;
    Ok(Json(listing))
}

/// POST /api/upload
///
/// Multipart form with a `file` field and an optional `path` field naming
/// the target directory. When `path` arrives after the file, the body is
/// staged under the root and moved once the target is known.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, StorageError> {
    let mut multipart = multipart?;
    let max_bytes = state.max_upload_bytes();

    let mut target: Option<String> = None;
    let mut uploaded: Option<UploadResult> = None;
    let mut staged: Option<(StagedUpload, String)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("path") => target = Some(field.text().await?),
            Some("file") if uploaded.is_none() && staged.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    return Err(StorageError::BadRequest("No file selected".into()));
                }

                match target.as_deref() {
                    Some(path) => {
                        let dir = state.root.resolve(path)?;
                        let result =
                            save_upload(&state.root, &dir, &filename, field, max_bytes).await?;
                        uploaded = Some(result);
                    }
                    None => {
                        let staging = state.root.resolve("")?;
                        let upload = stage_upload(&staging, field, max_bytes).await?;
                        staged = Some((upload, filename));
                    }
                }
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let result = match (uploaded, staged) {
        (Some(result), _) => result,
        (None, Some((upload, filename))) => {
            let dir = state.root.resolve(target.as_deref().unwrap_or_default())?;
            commit_upload(&state.root, upload, &dir, &filename).await?
        }
        (None, None) => return Err(StorageError::BadRequest("No file part".into())),
    };

    Ok(Json(MessageResponse::new(format!(
        "File uploaded successfully: {}",
        result.virtual_path
    ))))
}

/// POST /api/delete
pub async fn delete_path(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, StorageError> {
    let Json(request) = payload?;
    if request.path.is_empty() {
        return Err(StorageError::BadRequest("No path specified".into()));
    }

    let root = Arc::clone(&state.root);
    blocking(move || {
        let resolved = root.resolve_entry(&request.path)?;
        operations::delete_one(&root, &resolved)
    })
    .await?;

    Ok(Json(MessageResponse::new("Deleted successfully")))
}

/// GET /api/download/{*path}
pub async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, StorageError> {
    let root = Arc::clone(&state.root);
    let as_attachment = query.as_attachment();
    let plan = blocking(move || {
        let resolved = root.resolve(&path)?;
        prepare_download(&root, &resolved, as_attachment)
    })
    .await?;

    let file = File::open(&plan.file_path).await?;
    debug!(
        "Streaming {} ({} bytes, {})",
        plan.file_path.display(),
        plan.size,
        plan.mime
    );
    Ok(file_response(
        file,
        plan.mime.clone(),
        plan.size,
        plan.content_disposition(),
    ))
}

/// POST /api/create-directory
pub async fn create_directory(
    State(state): State<AppState>,
    payload: Result<Json<CreateDirectoryRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, StorageError> {
    let Json(request) = payload?;

    let root = Arc::clone(&state.root);
    let created = blocking(move || {
        let parent = root.resolve(&request.path)?;
        let created = operations::create_directory(&root, &parent, &request.name)?;
        Ok(root.relative_display(&created))
    })
    .await?;

    Ok(Json(MessageResponse::new(format!(
        "Directory created successfully: {}",
        created
    ))))
}

/// POST /api/bulk-delete
pub async fn bulk_delete(
    State(state): State<AppState>,
    payload: Result<Json<BulkPathsRequest>, JsonRejection>,
) -> Result<Json<BulkResponse>, StorageError> {
    let Json(request) = payload?;
    let paths = require_paths(request.paths)?;

    let root = Arc::clone(&state.root);
    let results = blocking(move || Ok(operations::bulk_delete(&root, &paths))).await?;
    Ok(Json(BulkResponse { results }))
}

/// POST /api/bulk-move
pub async fn bulk_move(
    State(state): State<AppState>,
    payload: Result<Json<BulkMoveRequest>, JsonRejection>,
) -> Result<Json<BulkResponse>, StorageError> {
    let Json(request) = payload?;
    let paths = require_paths(request.paths)?;

    let root = Arc::clone(&state.root);
    let target = request.target;
    let results = blocking(move || operations::bulk_move(&root, &paths, &target)).await?;
    Ok(Json(BulkResponse { results }))
}

/// POST /api/bulk-download
///
/// Accepts a JSON body or an HTML form and answers with `download.zip`.
pub async fn bulk_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StorageError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let paths = parse_bulk_paths(content_type, &body)?;

    let root = Arc::clone(&state.root);
    let job = blocking(move || build_zip(&root, &paths)).await?;

    let file = File::open(job.zip_path()).await?;
    let size = file.metadata().await?.len();
    info!(
        "Sending archive with {} entries ({} bytes)",
        job.entries().len(),
        size
    );

    // The open handle keeps the archive readable after the directory is removed
    state.cleanup.schedule(job);

    Ok(file_response(
        file,
        "application/zip".to_string(),
        size,
        format!("attachment; filename=\"{}\"", ARCHIVE_NAME),
    ))
}

/// GET /api/system-stats
pub async fn system_stats(State(state): State<AppState>) -> Result<Json<SystemStats>, StorageError> {
    let root = Arc::clone(&state.root);
    let stats = blocking(move || Ok(system::collect(&root))).await?;
    Ok(Json(stats))
}

fn file_response(file: File, mime: String, size: u64, disposition: String) -> Response {
    let body = Body::from_stream(ReaderStream::new(file));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
