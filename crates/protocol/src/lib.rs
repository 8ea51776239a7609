//! # HDFS Gateway Protocol Library
//!
//! Wire types shared by the gateway server and its clients.
//!
//! ## Overview
//!
//! - **Messages**: JSON request and response bodies for every endpoint
//! - **Listing**: parsing of `hdfs dfs -ls` output into [`DirectoryEntry`] records
//! - **Errors**: request validation failures
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{parse_listing, EntryType, ListResponse};
//!
//! let output = "Found 1 items\n\
//!     drwxr-xr-x - user group 0 2024-01-01 10:00 /base/dir1\n";
//!
//! let contents = parse_listing(output);
//! assert_eq!(contents[0].name, "dir1");
//! assert_eq!(contents[0].entry_type, EntryType::Directory);
//!
//! let body = serde_json::to_string(&ListResponse { contents }).unwrap();
//! assert!(body.contains("\"type\":\"DIRECTORY\""));
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Request and response bodies
//! - [`listing`]: Listing formatter
//! - [`error`]: Error types

pub mod error;
pub mod listing;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use listing::{entry_name, parse_line, parse_listing, DirectoryEntry, EntryType};
pub use messages::{
    ErrorResponse, ListResponse, MessageResponse, PathRequest, RenameRequest, RenameResponse,
};
