//! Directory and path management: mkdir, list, delete, rename.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use protocol::{ListResponse, MessageResponse, PathRequest, RenameRequest, RenameResponse};
use tracing::{debug, info};

use super::{json_body, AppState};
use crate::error::{ApiError, ApiResult};
use crate::remote_path::list_target;

/// `POST /mkdir`: create a directory and its parents.
pub async fn mkdir(
    State(state): State<AppState>,
    body: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    const FAILED: &str = "Directory creation failed";

    let request = json_body(body)?;
    let remote = state.remote_path(request.require_path()?);

    state
        .fs
        .mkdir(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;

    let created = state
        .fs
        .is_dir(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if !created {
        return Err(ApiError::postcondition(FAILED));
    }

    info!(path = %remote, "Directory created");
    Ok(Json(MessageResponse::with_path(
        "Directory created in HDFS",
        remote,
    )))
}

/// `POST /list`: list the children of a directory. A missing path lists the
/// base directory.
pub async fn list(
    State(state): State<AppState>,
    body: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Json<ListResponse>> {
    const FAILED: &str = "Failed to list HDFS path";

    let request = json_body(body)?;
    let target = list_target(&state.config.hdfs.base_dir, request.path_or_base());
    debug!(path = %target, "Listing contents");

    let exists = state
        .fs
        .exists(&target)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if !exists {
        return Err(ApiError::validation("Path does not exist"));
    }

    let contents = state
        .fs
        .list(&target)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;

    debug!(path = %target, count = contents.len(), "Entries found");
    Ok(Json(ListResponse { contents }))
}

/// `POST /delete`: recursively remove a file or directory.
pub async fn delete(
    State(state): State<AppState>,
    body: Result<Json<PathRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    const FAILED: &str = "Deletion failed";

    let request = json_body(body)?;
    let remote = state.remote_path(request.require_path()?);

    let exists = state
        .fs
        .exists(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if !exists {
        return Err(ApiError::validation("Path does not exist"));
    }

    state
        .fs
        .remove(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;

    let still_there = state
        .fs
        .exists(&remote)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if still_there {
        return Err(ApiError::postcondition(FAILED));
    }

    info!(path = %remote, "Deleted");
    Ok(Json(MessageResponse::with_path("Deleted from HDFS", remote)))
}

/// `POST /rename`: move a path. The response echoes the request paths.
pub async fn rename(
    State(state): State<AppState>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> ApiResult<Json<RenameResponse>> {
    const FAILED: &str = "Rename failed";

    let request = json_body(body)?;
    let (old_path, new_path) = request.require_paths()?;
    let from = state.remote_path(old_path);
    let to = state.remote_path(new_path);

    let exists = state
        .fs
        .exists(&from)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if !exists {
        return Err(ApiError::validation("Source path does not exist"));
    }

    state
        .fs
        .rename(&from, &to)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;

    let moved = state
        .fs
        .exists(&to)
        .await
        .map_err(|e| ApiError::command(FAILED, e))?;
    if !moved {
        return Err(ApiError::postcondition(FAILED));
    }

    info!(from = %from, to = %to, "Renamed");
    Ok(Json(RenameResponse {
        message: "Renamed in HDFS".to_string(),
        old_path: old_path.to_string(),
        new_path: new_path.to_string(),
    }))
}
