//! Rust client for Orchestrix resource services.
//!
//! This crate holds the wire contract (response envelopes), an HTTP client
//! per resource collection, and the generic CLI commands built on top of it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use orchestrix_client::{ResourceApi, ResourceClient};
//! use serde_json::json;
//!
//! async fn example() -> orchestrix_client::Result<()> {
//!     let tenants = ResourceClient::new("http://localhost:8000", "tenants")?;
//!     tenants.create(&json!({ "name": "acme" })).await?;
//!
//!     // Any of URN, surrogate id or name resolves
//!     let acme = tenants.get("urn:orchestrix:tenant:acme").await?;
//!     println!("{:?}", acme.record);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod command;
pub mod document;
pub mod envelope;
pub mod error;
pub mod output;
pub mod traits;

pub use client::ResourceClient;
pub use command::{report_error, run, ResourceCommand};
pub use envelope::{BaseResult, ErrorDetail, ListResult, RecordResult, Status};
pub use error::{ClientError, Result};
pub use traits::{ListQuery, ResourceApi};
