//! File transfer endpoints: upload, folder upload, download.
//!
//! Uploaded bodies are streamed to a request-scoped scratch directory and
//! handed to the remote client from there. Downloads are fetched into a
//! scratch directory that lives until the response body has been sent.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use protocol::{entry_name, MessageResponse, PathRequest};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{json_body, AppState};
use crate::archive::top_level_entries;
use crate::error::{ApiError, ApiResult};
use crate::remote_path::{join_remote, sanitize_filename};

const MISSING_FILE_OR_PATH: &str = "Missing file or path parameter";

/// Name of the uploaded body inside the scratch directory.
const UPLOAD_NAME: &str = "upload";

/// Name of the fetched file inside the scratch directory.
const DOWNLOAD_NAME: &str = "download";

/// Used when the remote path has no final segment.
const FALLBACK_FILENAME: &str = "download";

/// A file part saved to local disk.
#[derive(Debug)]
struct SavedFile {
    /// Filename as sent by the client.
    client_name: String,
    local: PathBuf,
}

/// The `file` and `path` parts of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<SavedFile>,
    path: Option<String>,
}

impl UploadForm {
    /// Both parts, or a validation error. A file part without a filename
    /// counts as missing.
    fn require(&self) -> ApiResult<(&SavedFile, &str)> {
        let file = self.file.as_ref().filter(|f| !f.client_name.is_empty());
        let path = self.path.as_deref().filter(|p| !p.is_empty());
        match (file, path) {
            (Some(file), Some(path)) => Ok((file, path)),
            _ => Err(ApiError::validation(MISSING_FILE_OR_PATH)),
        }
    }
}

/// Read the multipart form, streaming the `file` part into `scratch`.
/// Unknown parts are skipped.
async fn read_upload_form(mut multipart: Multipart, scratch: &Path) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let client_name = field.file_name().unwrap_or_default().to_string();
                let local = scratch.join(UPLOAD_NAME);
                let mut out = tokio::fs::File::create(&local)
                    .await
                    .map_err(|e| ApiError::io("Failed to store upload", e))?;
                let mut written = 0u64;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::validation(e.body_text()))?
                {
                    out.write_all(&chunk)
                        .await
                        .map_err(|e| ApiError::io("Failed to store upload", e))?;
                    written += chunk.len() as u64;
                }
                out.flush()
                    .await
                    .map_err(|e| ApiError::io("Failed to store upload", e))?;
                debug!(filename = %client_name, bytes = written, "Upload stored");
                form.file = Some(SavedFile { client_name, local });
            }
            Some("path") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.body_text()))?;
                form.path = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /upload`: store one file at `<base>/<path>/<filename>`.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let multipart = multipart.map_err(|_| ApiError::validation(MISSING_FILE_OR_PATH))?;
    let scratch = state.scratch_dir().await?;
    let form = read_upload_form(multipart, scratch.path()).await?;
    let (file, path) = form.require()?;

    let filename = sanitize_filename(&file.client_name)
        .ok_or_else(|| ApiError::validation("Invalid file name"))?;
    let remote = join_remote(&state.remote_path(path), filename);

    let occupied = state
        .fs
        .is_dir(&remote)
        .await
        .map_err(|e| ApiError::command("Failed to upload to HDFS", e))?;
    if occupied {
        return Err(ApiError::postcondition("File upload failed"));
    }

    state
        .fs
        .put(&file.local, &remote)
        .await
        .map_err(|e| ApiError::command("Failed to upload to HDFS", e))?;
    drop(scratch);

    let stored = state
        .fs
        .exists(&remote)
        .await
        .map_err(|e| ApiError::command("File upload failed", e))?;
    if !stored {
        return Err(ApiError::postcondition("File upload failed"));
    }

    info!(path = %remote, "File uploaded");
    Ok(Json(MessageResponse::with_path(
        "File uploaded to HDFS successfully",
        remote,
    )))
}

/// `POST /uploadFolder`: unpack a zip archive and copy its top-level
/// entries into `<base>/<path>`.
pub async fn upload_folder(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<MessageResponse>> {
    const FAILED: &str = "Folder upload failed";

    let multipart = multipart.map_err(|_| ApiError::validation(MISSING_FILE_OR_PATH))?;
    let scratch = state.scratch_dir().await?;
    let form = read_upload_form(multipart, scratch.path()).await?;
    let (file, path) = form.require()?;

    let unzipped = scratch.path().join("unzipped");
    tokio::fs::create_dir(&unzipped)
        .await
        .map_err(|e| ApiError::io("Unzipping failed", e))?;
    state
        .extractor
        .extract(&file.local, &unzipped)
        .await
        .map_err(|e| ApiError::command("Unzipping failed", e))?;

    let entries = top_level_entries(&unzipped)
        .await
        .map_err(|e| ApiError::io("Unzipping failed", e))?;
    if entries.is_empty() {
        return Err(ApiError::validation("Archive is empty"));
    }

    let remote = state.remote_path(path);
    state
        .fs
        .mkdir(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;

    let mut uploaded = Vec::with_capacity(entries.len());
    for entry in &entries {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // An existing directory target receives the entry under its own name.
        state
            .fs
            .put(entry, &remote)
            .await
            .map_err(|e| ApiError::command(FAILED, e))?;
        let target = join_remote(&remote, &name);
        debug!(path = %target, "Entry uploaded");
        uploaded.push(target);
    }
    drop(scratch);

    for target in std::iter::once(&remote).chain(uploaded.iter()) {
        let present = state
            .fs
            .exists(target)
            .await
            .map_err(|e| ApiError::command(FAILED, e))?;
        if !present {
            return Err(ApiError::postcondition(FAILED));
        }
    }

    info!(path = %remote, entries = uploaded.len(), "Folder uploaded");
    Ok(Json(MessageResponse::with_path(
        "Folder uploaded to HDFS successfully",
        remote,
    )))
}

/// `POST /download`: fetch a remote file and stream it as an attachment.
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Response> {
    const FAILED: &str = "File download failed";

    let request = json_body(body)?;
    let remote = state.remote_path(request.require_path()?);

    let scratch = state.scratch_dir().await?;
    let local = scratch.path().join(DOWNLOAD_NAME);
    state
        .fs
        .get(&remote, &local)
        .await
        .map_err(|e| ApiError::command("Failed to download from HDFS", e))?;

    let file = match tokio::fs::File::open(&local).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::postcondition(FAILED));
        }
        Err(e) => return Err(ApiError::io(FAILED, e)),
    };
    let metadata = file.metadata().await.map_err(|e| ApiError::io(FAILED, e))?;
    if !metadata.is_file() {
        return Err(ApiError::postcondition(FAILED));
    }

    let filename = match entry_name(&remote) {
        "" => FALLBACK_FILENAME,
        name => name,
    };
    info!(path = %remote, bytes = metadata.len(), "Sending file");

    let stream = ReaderStream::new(ScopedFile {
        file,
        _scratch: scratch,
    });
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition(filename))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(metadata.len())),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// An open file that keeps its scratch directory alive until dropped.
struct ScopedFile {
    file: tokio::fs::File,
    _scratch: TempDir,
}

impl AsyncRead for ScopedFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

/// RFC 5987 `attr-char`: alphanumerics and `-._~` pass through.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `Content-Disposition` value for an attachment. Names that are not plain
/// ASCII get an RFC 5987 `filename*` alongside an ASCII fallback.
fn content_disposition(filename: &str) -> String {
    if filename.chars().all(is_plain) {
        return format!("attachment; filename=\"{filename}\"");
    }

    let fallback: String = filename
        .chars()
        .map(|c| if is_plain(c) { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

/// Characters that can appear unescaped inside a quoted header parameter.
fn is_plain(c: char) -> bool {
    c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\')
}
