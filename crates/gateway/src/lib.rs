//! # HDFS Gateway Library
//!
//! A REST service that fronts the `hdfs` command-line client. Each endpoint
//! validates its request, runs one or more `hdfs` commands, and reads the
//! result back before answering.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               GatewayServer (axum)            │
//! ├───────────────────────────────────────────────┤
//! │  api::admin   api::transfer   api::namespace  │
//! ├───────────────────────────────────────────────┤
//! │   RemoteFs (HdfsCli)   ArchiveExtractor       │
//! ├───────────────────────────────────────────────┤
//! │          process (bounded commands)           │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gateway::{Config, GatewayServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let shutdown = CancellationToken::new();
//!     GatewayServer::new(config)?.run(shutdown).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`hdfs`]: Remote filesystem trait, CLI adapter, in-memory double
//! - [`process`]: External commands with a bounded wait
//! - [`archive`]: Zip extraction for folder uploads
//! - [`remote_path`]: Remote path joining and filename sanitization
//! - [`api`]: HTTP handlers and router
//! - [`error`]: HTTP error mapping
//! - [`server`]: Bind, serve, graceful shutdown

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod hdfs;
pub mod process;
pub mod remote_path;
pub mod server;

// Re-export protocol for convenience
pub use protocol;

pub use api::{router, AppState};
pub use archive::{ArchiveExtractor, UnzipCommand};
pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use hdfs::{CommandError, HdfsCli, MemoryFs, RemoteFs};
pub use server::{GatewayServer, ServerError};
