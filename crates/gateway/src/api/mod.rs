//! HTTP routes.
//!
//! Every handler follows the same shape: validate the request, run one or
//! more remote operations through [`RemoteFs`], then read the result back
//! before reporting success.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /health` | [`admin::health`] |
//! | `GET /removeSafeMode` | [`admin::remove_safe_mode`] |
//! | `POST /upload` | [`transfer::upload`] |
//! | `POST /uploadFolder` | [`transfer::upload_folder`] |
//! | `POST /download` | [`transfer::download`] |
//! | `POST /mkdir` | [`namespace::mkdir`] |
//! | `POST /list` | [`namespace::list`] |
//! | `POST /delete` | [`namespace::delete`] |
//! | `POST /rename` | [`namespace::rename`] |

pub mod admin;
pub mod namespace;
pub mod transfer;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tempfile::TempDir;
use tower_http::trace::TraceLayer;

use crate::archive::ArchiveExtractor;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::hdfs::RemoteFs;
use crate::remote_path::join_remote;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fs: Arc<dyn RemoteFs>,
    pub extractor: Arc<dyn ArchiveExtractor>,
}

impl AppState {
    pub fn new(
        config: Config,
        fs: Arc<dyn RemoteFs>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fs,
            extractor,
        }
    }

    /// Absolute remote path for a path given in a request.
    pub fn remote_path(&self, relative: &str) -> String {
        join_remote(&self.config.hdfs.base_dir, relative)
    }

    /// A fresh scratch directory under `upload.temp_dir`, removed on drop.
    async fn scratch_dir(&self) -> ApiResult<TempDir> {
        let root = &self.config.upload.temp_dir;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| ApiError::io("Failed to prepare temporary directory", e))?;
        tempfile::Builder::new()
            .prefix("request-")
            .tempdir_in(root)
            .map_err(|e| ApiError::io("Failed to prepare temporary directory", e))
    }
}

/// Build the router with all routes and layers.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.upload.max_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(admin::health))
        .route("/removeSafeMode", get(admin::remove_safe_mode))
        .route("/upload", post(transfer::upload))
        .route("/uploadFolder", post(transfer::upload_folder))
        .route("/download", post(transfer::download))
        .route("/mkdir", post(namespace::mkdir))
        .route("/list", post(namespace::list))
        .route("/delete", post(namespace::delete))
        .route("/rename", post(namespace::rename))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unwrap a JSON body, turning a malformed or missing body into a 400.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}
