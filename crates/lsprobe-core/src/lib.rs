//! # lsprobe-core
//!
//! A reusable LSP client transport and request/response correlation layer.
//!
//! The crate is organized in three layers, leaves first:
//!
//! - [`framing`] - Content-Length delimited frames over a byte stream
//! - [`rpc`] - JSON-RPC 2.0 envelope codec and classification
//! - [`session`] - identifier allocation, pending-call correlation and the
//!   initialize/shutdown/exit lifecycle
//!
//! plus [`handshake`] for initialize-parameter construction, [`config`] for
//! endpoint settings and [`error`] for the failure taxonomy.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use lsprobe_core::{handshake, Session};
//!
//! #[tokio::main]
//! async fn main() -> lsprobe_core::Result<()> {
//!     let session = Session::new();
//!     session.connect("127.0.0.1:9999").await?;
//!
//!     let params = handshake::initialize_params(&["/proj".into()], None)?;
//!     session.initialize(params, Duration::from_secs(30)).await?;
//!     session.notify("initialized", Some(serde_json::json!({}))).await?;
//!     // ... textDocument/* traffic ...
//!     session.shutdown(Duration::from_secs(5)).await?;
//!     session.exit().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod rpc;
pub mod session;

pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use session::{Session, SessionState};
