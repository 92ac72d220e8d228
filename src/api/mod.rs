//! Purpose: Public Rust API for publishing resources to CSW catalogues.
//! Exports: Publisher, capability traits with default implementations, errors and request types.
//! Role: Stable surface used by the CLI and by embedders wiring their own inputs.
//! Invariants: Capabilities are injected; the API holds no global state.

mod form;
mod notify;
mod publisher;
mod transport;

pub type ApiResult<T> = Result<T, Error>;

pub use crate::core::endpoint::parse_endpoint;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::harvest::{HarvestRequest, gen_harvest_request};
pub use form::{FormSource, StaticForm};
pub use notify::{Notifier, StdoutNotifier};
pub use publisher::{PendingPublish, PublishOptions, PublishOutcome, Publisher};
pub use transport::{HttpTransport, TEXT_ACCEPT, Transport, XML_CONTENT_TYPE};
