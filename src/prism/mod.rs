//! Prism API interaction module
//!
//! This module provides the request pipeline every API call goes through.
//!
//! # Module Structure
//!
//! - [`client`] - Main Prism client: URL resolution, send, status routing
//! - [`http`] - Request/response envelopes and transport construction
//! - [`filter`] - Client-side filtering of list responses
//!
//! # Example
//!
//! ```ignore
//! use prism_client::{Config, PrismClient, WaitConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example(config: &Config) -> prism_client::Result<()> {
//!     let client = PrismClient::json(config)?;
//!     let req = client.new_request("delete_vm", reqwest::Method::DELETE, "/vms/1234", None::<&()>)?;
//!     let resp: serde_json::Value = client.send(&req).await?;
//!     let task_uuid = resp["status"]["execution_context"]["task_uuid"].as_str().unwrap_or_default();
//!     let wait = WaitConfig::for_delete(std::time::Duration::from_secs(600));
//!     client.wait_for_task(task_uuid, &wait, &CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod filter;
pub mod http;
