//! Interface to the rendering engine.
//!
//! The worker code is generic over these traits; [`crate::browser`] provides
//! the Chromium implementation and tests plug in fakes.

use std::future::Future;

use futures::stream::BoxStream;
use serde_json::Value;

use crate::exchange::InterceptedExchange;
use crate::Result;

/// Commands addressed to one paused request.
pub trait RequestControl: Send + Sync {
    /// Lets the paused request continue to the page.
    fn release(&self, request_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Full response body of a paused request.
    fn fetch_body(&self, request_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// One tab, owned by a single job.
///
/// Clones share the same tab; handler tasks hold a clone so they can release
/// requests while the worker keeps driving navigation.
pub trait PageSession: RequestControl + Clone + Send + Sync + 'static {
    /// Pauses every request at the response stage.
    fn enable_interception(&self) -> impl Future<Output = Result<()>> + Send;

    /// Paused-request events for this tab, in arrival order.
    fn paused_requests(
        &self,
    ) -> impl Future<Output = Result<BoxStream<'static, InterceptedExchange>>> + Send;

    fn navigate(&self, url: &str) -> impl Future<Output = Result<()>> + Send;

    /// Evaluates `expression` in the page and returns its value.
    fn evaluate(&self, expression: &str) -> impl Future<Output = Result<Value>> + Send;

    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Source of fresh sessions. Sessions are never reused across jobs.
pub trait RenderingEngine: Send + Sync + 'static {
    type Session: PageSession;

    fn open_session(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}
