//! Codec-pluggable REST client and task poller for Prism-style APIs.
//!
//! Two entry points are meant for resource code:
//!
//! - [`PrismClient::send`] - build, send and decode one request through the
//!   client's [`Codec`]
//! - [`PrismClient::wait_for_task`] - block until an asynchronous server task
//!   reaches a terminal state

pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod prism;
pub mod task;

pub use codec::{build_url_encoded_request, Codec, JsonCodec, UrlEncodedCodec, XmlCodec};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use model::{ExecutionContext, Reference, Task, TaskStatus};
pub use prism::client::PrismClient;
pub use prism::filter::AdditionalFilter;
pub use prism::http::{RequestEnvelope, ResponseEnvelope};
pub use task::{wait_for_state, WaitConfig};
