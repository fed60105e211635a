//! Navigation watcher: turns page-changed events into scheduled extractions.
//!
//! The page source reports address changes as [`PageEvent`]s. Each change to a
//! new address is classified; person and company pages get one extraction
//! after the settle delay, so client-side rendering has time to finish.
//! Scheduled extractions are never cancelled: two quick navigations schedule
//! two passes, and both run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::parser::{self, PageSnapshot, ProfileKind};
use crate::sink::{self, Sink};

/// Whatever can tell us where the page is and what it currently contains.
pub trait PageSource: Send + Sync {
    fn current_url(&self) -> String;
    /// The document as it is right now; `None` until the page has reported.
    fn snapshot(&self) -> Option<PageSnapshot>;
}

/// Page source fed by reports pushed from outside (the browser bridge).
#[derive(Default)]
pub struct ReportedPage {
    latest: Mutex<Option<PageSnapshot>>,
}

impl ReportedPage {
    pub fn report(&self, snapshot: PageSnapshot) {
        let mut latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        *latest = Some(snapshot);
    }
}

impl PageSource for ReportedPage {
    fn current_url(&self) -> String {
        self.snapshot().map(|s| s.url).unwrap_or_default()
    }

    fn snapshot(&self) -> Option<PageSnapshot> {
        self.latest.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The DOM changed; `url` is the address at that moment.
    Mutated { url: String },
    /// Someone pressed the scrape control.
    ManualTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Pending,
}

pub struct NavigationWatcher {
    page: Arc<dyn PageSource>,
    sink: Arc<dyn Sink>,
    settle_delay: Duration,
    last_url: String,
    pending: Arc<AtomicUsize>,
}

impl NavigationWatcher {
    pub fn new(page: Arc<dyn PageSource>, sink: Arc<dyn Sink>, settle_delay: Duration) -> Self {
        let last_url = page.current_url();
        NavigationWatcher {
            page,
            sink,
            settle_delay,
            last_url,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> WatcherState {
        if self.pending.load(Ordering::SeqCst) == 0 {
            WatcherState::Idle
        } else {
            WatcherState::Pending
        }
    }

    /// Classify the last observed address and schedule the matching
    /// extractor after the settle delay.
    pub fn detect(&self) -> Option<JoinHandle<()>> {
        let kind = ProfileKind::classify(&self.last_url)?;
        info!(url = %self.last_url, "checking {}", kind.label());
        Some(self.schedule(kind, self.settle_delay))
    }

    /// Classify the page's current address and extract right away.
    pub fn trigger_now(&self) -> Option<JoinHandle<()>> {
        let url = self.page.current_url();
        let Some(kind) = ProfileKind::classify(&url) else {
            info!(%url, "manual scrape ignored, not a profile page");
            return None;
        };
        info!(%url, "manual scrape triggered");
        Some(self.schedule(kind, Duration::ZERO))
    }

    pub fn handle(&mut self, event: PageEvent) -> Option<JoinHandle<()>> {
        match event {
            PageEvent::Mutated { url } => {
                if url == self.last_url {
                    return None;
                }
                debug!(from = %self.last_url, to = %url, "address changed");
                self.last_url = url;
                self.detect()
            }
            PageEvent::ManualTrigger => self.trigger_now(),
        }
    }

    /// Detect once for the initial page, then follow the event stream until it
    /// closes. Extractions still in flight are awaited before returning.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) {
        let mut in_flight: Vec<JoinHandle<()>> = self.detect().into_iter().collect();

        while let Some(event) = events.recv().await {
            in_flight.retain(|h| !h.is_finished());
            in_flight.extend(self.handle(event));
            debug!(state = ?self.state(), in_flight = in_flight.len(), "page event handled");
        }

        info!(remaining = in_flight.len(), "page event stream closed");
        for handle in in_flight {
            if let Err(e) = handle.await {
                warn!("extraction task failed: {}", e);
            }
        }
    }

    fn schedule(&self, kind: ProfileKind, delay: Duration) -> JoinHandle<()> {
        let page = Arc::clone(&self.page);
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        let deferred = !delay.is_zero();
        if deferred {
            pending.fetch_add(1, Ordering::SeqCst);
        }

        tokio::spawn(async move {
            if deferred {
                tokio::time::sleep(delay).await;
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            extract_and_deliver(kind, page.as_ref(), sink.as_ref()).await;
        })
    }
}

async fn extract_and_deliver(kind: ProfileKind, page: &dyn PageSource, sink: &dyn Sink) {
    let Some(snapshot) = page.snapshot() else {
        warn!("{} extraction skipped, page has not reported yet", kind.label());
        return;
    };
    let record = parser::process_page(kind, &snapshot);
    sink::dispatch(sink, &record).await;
}
