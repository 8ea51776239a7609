//! Server lifecycle: build the backends, bind, serve until cancelled.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{self, AppState};
use crate::archive::{ArchiveExtractor, UnzipCommand};
use crate::config::Config;
use crate::hdfs::{HdfsCli, RemoteFs};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to create temporary directory {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// The HTTP gateway.
pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    /// Build a server backed by the `hdfs` and `unzip` executables named in
    /// the configuration. Creates `upload.temp_dir` if needed.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.upload.temp_dir).map_err(|source| {
            ServerError::TempDir {
                path: config.upload.temp_dir.clone(),
                source,
            }
        })?;

        let fs = Arc::new(HdfsCli::from_config(&config.hdfs));
        let extractor = Arc::new(UnzipCommand::new(
            config.upload.unzip_bin.clone(),
            config.hdfs.command_timeout(),
        ));
        Ok(Self::with_backends(config, fs, extractor))
    }

    /// Build a server over the given backends.
    pub fn with_backends(
        config: Config,
        fs: Arc<dyn RemoteFs>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            state: AppState::new(config, fs, extractor),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Bind `server.bind_addr` and serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = self.state.config.server.bind_addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled.
    /// In-flight requests are drained before this returns.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            base_dir = %self.state.config.hdfs.base_dir,
            "HDFS gateway listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("HDFS gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdfs::MemoryFs;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_temp_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.upload.temp_dir = dir.path().join("nested").join("scratch");

        let server = GatewayServer::new(config).unwrap();

        assert!(dir.path().join("nested/scratch").is_dir());
        assert_eq!(server.state().config.server.bind_addr, "0.0.0.0:5000");
    }

    #[tokio::test]
    async fn test_run_rejects_bad_address() {
        let mut config = Config::default();
        config.server.bind_addr = "not-an-address".to_string();
        let server = GatewayServer::with_backends(
            config,
            Arc::new(MemoryFs::new()),
            Arc::new(UnzipCommand::new("unzip", std::time::Duration::from_secs(1))),
        );

        let err = server.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
