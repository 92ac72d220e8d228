//! Purpose: Publish flow: read inputs, render the Harvest body, POST once, surface the response.
//! Exports: `Publisher`, `PublishOptions`, `PublishOutcome`, `PendingPublish`.
//! Role: Stateless handler wired from injected form, transport and notifier capabilities.
//! Invariants: Construction sends nothing; each `publish` issues exactly one request.
//! Invariants: The notifier only sees successful response text, unchanged.
//! Invariants: A notifier failure fails the publish even though the request was delivered.
//! Invariants: Failures are returned to the caller, never swallowed.
#![allow(clippy::result_large_err)]

use super::ApiResult;
use super::form::FormSource;
use super::notify::Notifier;
use super::transport::Transport;
use crate::core::endpoint::parse_endpoint;
use crate::core::error::{Error, ErrorKind};
use crate::core::harvest::HarvestRequest;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PublishOptions {
    /// Escape markup characters in the interpolated values. Off by default.
    pub escape: bool,
}

#[derive(Clone, Debug)]
pub struct PublishOutcome {
    pub endpoint: Url,
    pub request: HarvestRequest,
    pub request_body: String,
    pub response_text: String,
}

#[derive(Clone)]
pub struct Publisher {
    form: Arc<dyn FormSource>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    options: PublishOptions,
}

/// A publish running on a background thread.
pub struct PendingPublish {
    handle: JoinHandle<ApiResult<PublishOutcome>>,
}

impl Publisher {
    pub fn new(
        form: Arc<dyn FormSource>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            form,
            transport,
            notifier,
            options: PublishOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PublishOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self, request: &HarvestRequest) -> String {
        if self.options.escape {
            request.to_xml_escaped()
        } else {
            request.to_xml()
        }
    }

    pub fn publish(&self) -> ApiResult<PublishOutcome> {
        let request = HarvestRequest::new(self.form.resource_type(), self.form.source_url());
        let endpoint_raw = self.form.endpoint_url();
        let request_body = self.render(&request);
        let endpoint = parse_endpoint(&endpoint_raw)?;

        debug!(
            endpoint = %endpoint,
            resource_type = %request.resource_type,
            source = %request.source,
            bytes = request_body.len(),
            "sending harvest request"
        );
        let response_text = self
            .transport
            .post_text(&endpoint, &request_body)
            .inspect_err(|err| warn!(endpoint = %endpoint, error = %err, "harvest request failed"))?;
        info!(
            endpoint = %endpoint,
            bytes = response_text.len(),
            "harvest response received"
        );

        self.notifier.notify(&response_text).inspect_err(
            |err| warn!(endpoint = %endpoint, error = %err, "harvest response not delivered"),
        )?;
        Ok(PublishOutcome {
            endpoint,
            request,
            request_body,
            response_text,
        })
    }

    /// Starts `publish` on a worker thread and returns without waiting.
    pub fn spawn(&self) -> ApiResult<PendingPublish> {
        let publisher = self.clone();
        let handle = thread::Builder::new()
            .name("csw-publish".to_string())
            .spawn(move || publisher.publish())
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start publish worker")
                    .with_source(err)
            })?;
        Ok(PendingPublish { handle })
    }
}

impl PendingPublish {
    pub fn wait(self) -> ApiResult<PublishOutcome> {
        self.handle.join().unwrap_or_else(|_| {
            Err(Error::new(ErrorKind::Internal).with_message("publish worker panicked"))
        })
    }
}
