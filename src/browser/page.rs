//! Chrome tabs as [`PageSession`]s, with Fetch-domain interception.

use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EnableParams, EventRequestPaused, GetResponseBodyParams,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::PostDataEntry;
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::engine::{PageSession, RequestControl};
use crate::exchange::{HeaderEntry, InterceptedExchange};
use crate::{FetchError, Result};

/// One tab. Clones drive the same tab.
#[derive(Clone)]
pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

impl RequestControl for ChromiumSession {
    async fn release(&self, request_id: &str) -> Result<()> {
        self.page
            .execute(ContinueRequestParams::new(fetch::RequestId::new(request_id)))
            .await
            .map_err(|e| FetchError::release(request_id, e.to_string()))?;
        Ok(())
    }

    async fn fetch_body(&self, request_id: &str) -> Result<Vec<u8>> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(fetch::RequestId::new(request_id)))
            .await
            .map_err(|e| FetchError::BodyFetch(e.to_string()))?;

        let body = &response.result;
        if body.base64_encoded {
            BASE64_STANDARD
                .decode(&body.body)
                .map_err(|e| FetchError::BodyFetch(format!("invalid base64 body: {e}")))
        } else {
            Ok(body.body.clone().into_bytes())
        }
    }
}

impl PageSession for ChromiumSession {
    async fn enable_interception(&self) -> Result<()> {
        let pattern = RequestPattern::builder()
            .request_stage(RequestStage::Response)
            .build();
        self.page
            .execute(EnableParams::builder().pattern(pattern).build())
            .await?;
        Ok(())
    }

    async fn paused_requests(&self) -> Result<BoxStream<'static, InterceptedExchange>> {
        let events = self.page.event_listener::<EventRequestPaused>().await?;
        Ok(events.map(|ev| exchange_from_event(&ev)).boxed())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self.page.evaluate(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

fn exchange_from_event(ev: &Arc<EventRequestPaused>) -> InterceptedExchange {
    InterceptedExchange {
        request_id: ev.request_id.inner().clone(),
        url: ev.request.url.clone(),
        method: ev.request.method.clone(),
        request_headers: headers_from_json(ev.request.headers.inner()),
        request_body: ev
            .request
            .post_data_entries
            .as_deref()
            .and_then(request_body),
        resource_type: ev.resource_type.as_ref().to_string(),
        status: ev.response_status_code,
        response_headers: ev
            .response_headers
            .iter()
            .flatten()
            .map(|h| HeaderEntry::new(h.name.clone(), h.value.clone()))
            .collect(),
    }
}

/// Joins the base64 chunks of a request body. Chunks that fail to decode are
/// dropped; an empty result counts as no body.
fn request_body(entries: &[PostDataEntry]) -> Option<String> {
    let mut body = Vec::new();
    for bytes in entries.iter().filter_map(|entry| entry.bytes.as_ref()) {
        match BASE64_STANDARD.decode(AsRef::<str>::as_ref(bytes)) {
            Ok(chunk) => body.extend_from_slice(&chunk),
            Err(err) => debug!("skipping undecodable post data chunk: {err}"),
        }
    }
    if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Request headers arrive as a JSON object of name to value.
fn headers_from_json(headers: &Value) -> Vec<HeaderEntry> {
    let Some(map) = headers.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            HeaderEntry::new(name.clone(), value)
        })
        .collect()
}
