//! In-memory rendering engine for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use page_fetch_lib::{
    FetchError, HeaderEntry, InterceptedExchange, PageSession, RenderingEngine, RequestControl,
    Result,
};
use serde_json::Value;

/// A response the fake page triggers.
#[derive(Debug, Clone)]
pub struct FakeExchange {
    pub exchange: InterceptedExchange,
    /// `None` makes the body fetch fail.
    pub body: Option<Vec<u8>>,
}

impl FakeExchange {
    pub fn new(url: &str, content_type: &str, body: &[u8]) -> Self {
        Self {
            exchange: InterceptedExchange {
                request_id: String::new(),
                url: url.to_string(),
                method: "GET".to_string(),
                request_headers: vec![HeaderEntry::new("Accept", "*/*")],
                request_body: None,
                resource_type: "Other".to_string(),
                status: Some(200),
                response_headers: vec![HeaderEntry::new("Content-Type", content_type)],
            },
            body: Some(body.to_vec()),
        }
    }

    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

/// What loading one URL does.
#[derive(Debug, Clone)]
pub struct FakePage {
    pub exchanges: Vec<FakeExchange>,
    /// Extra time navigation takes after every exchange was released.
    pub delay: Duration,
    pub fail_navigation: bool,
    pub script_value: Value,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            exchanges: Vec::new(),
            delay: Duration::ZERO,
            fail_navigation: false,
            script_value: Value::Bool(false),
        }
    }
}

impl FakePage {
    pub fn with(exchanges: Vec<FakeExchange>) -> Self {
        Self {
            exchanges,
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct FakeState {
    releases: Mutex<HashMap<String, usize>>,
    bodies: Mutex<HashMap<String, Option<Vec<u8>>>>,
    next_request: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeState {
    fn release(&self, request_id: &str) {
        let mut releases = self.releases.lock().expect("releases lock");
        *releases.entry(request_id.to_string()).or_default() += 1;
    }

    fn released(&self, request_id: &str) -> bool {
        self.releases
            .lock()
            .expect("releases lock")
            .get(request_id)
            .is_some_and(|n| *n > 0)
    }
}

/// Engine handing out fake tabs that replay [`FakePage`]s by URL.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pages: Arc<HashMap<String, FakePage>>,
    state: Arc<FakeState>,
}

impl FakeEngine {
    pub fn new(pages: impl IntoIterator<Item = (&'static str, FakePage)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            ),
            state: Arc::default(),
        }
    }

    /// Release count per request id.
    pub fn releases(&self) -> HashMap<String, usize> {
        self.state.releases.lock().expect("releases lock").clone()
    }

    /// Number of paused requests handed out so far.
    pub fn paused(&self) -> usize {
        self.state.next_request.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_sessions(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }
}

impl RenderingEngine for FakeEngine {
    type Session = FakeSession;

    async fn open_session(&self) -> Result<FakeSession> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded();
        Ok(FakeSession {
            pages: Arc::clone(&self.pages),
            state: Arc::clone(&self.state),
            tab: Arc::new(Tab {
                events_tx: tx,
                events_rx: Mutex::new(Some(rx)),
                intercepting: Mutex::new(false),
                current_url: Mutex::new(None),
            }),
        })
    }
}

struct Tab {
    events_tx: mpsc::UnboundedSender<InterceptedExchange>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<InterceptedExchange>>>,
    intercepting: Mutex<bool>,
    current_url: Mutex<Option<String>>,
}

#[derive(Clone)]
pub struct FakeSession {
    pages: Arc<HashMap<String, FakePage>>,
    state: Arc<FakeState>,
    tab: Arc<Tab>,
}

impl RequestControl for FakeSession {
    async fn release(&self, request_id: &str) -> Result<()> {
        self.state.release(request_id);
        Ok(())
    }

    async fn fetch_body(&self, request_id: &str) -> Result<Vec<u8>> {
        let bodies = self.state.bodies.lock().expect("bodies lock");
        match bodies.get(request_id) {
            Some(Some(body)) => Ok(body.clone()),
            _ => Err(FetchError::BodyFetch(format!("no body for {request_id}"))),
        }
    }
}

impl PageSession for FakeSession {
    async fn enable_interception(&self) -> Result<()> {
        *self.tab.intercepting.lock().expect("tab lock") = true;
        Ok(())
    }

    async fn paused_requests(&self) -> Result<BoxStream<'static, InterceptedExchange>> {
        let rx = self
            .tab
            .events_rx
            .lock()
            .expect("tab lock")
            .take()
            .ok_or_else(|| FetchError::session("already subscribed"))?;
        Ok(rx.boxed())
    }

    /// Pauses every exchange of the page, then waits, like a real page load,
    /// until all of them were released.
    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.pages.get(url).cloned().unwrap_or_default();
        *self.tab.current_url.lock().expect("tab lock") = Some(url.to_string());
        let intercepting = *self.tab.intercepting.lock().expect("tab lock");

        let mut pending = Vec::new();
        if intercepting {
            for fake in page.exchanges {
                let n = self.state.next_request.fetch_add(1, Ordering::SeqCst);
                let mut exchange = fake.exchange;
                exchange.request_id = format!("req-{n}");
                self.state
                    .bodies
                    .lock()
                    .expect("bodies lock")
                    .insert(exchange.request_id.clone(), fake.body);
                pending.push(exchange.request_id.clone());
                let _ = self.tab.events_tx.unbounded_send(exchange);
            }
        }

        while !pending.iter().all(|id| self.state.released(id)) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(page.delay).await;

        if page.fail_navigation {
            return Err(FetchError::session(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
        }
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value> {
        let url = self.tab.current_url.lock().expect("tab lock").clone();
        Ok(url
            .and_then(|url| self.pages.get(&url).map(|page| page.script_value.clone()))
            .unwrap_or(Value::Bool(false)))
    }

    async fn close(self) -> Result<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
