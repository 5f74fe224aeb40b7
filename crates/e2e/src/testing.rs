//! Scripted page driver and in-memory sink for unit tests

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::browser::{PageDriver, PageSnapshot, SessionProvider};
use crate::error::{E2eError, E2eResult};
use crate::report::{EvidenceKind, ReportSink};

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub href: Option<String>,
    pub navigates_to: Option<String>,
    /// Only returned once the selector has been queried more than this many times
    pub after_polls: usize,
    pub broken_visibility: bool,
}

impl FakeElement {
    pub fn visible(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: true,
            enabled: true,
            href: None,
            navigates_to: None,
            after_polls: 0,
            broken_visibility: false,
        }
    }

    pub fn hidden(text: &str) -> Self {
        Self {
            visible: false,
            ..Self::visible(text)
        }
    }

    pub fn link(text: &str, href: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            navigates_to: Some(href.to_string()),
            ..Self::visible(text)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn after(mut self, polls: usize) -> Self {
        self.after_polls = polls;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken_visibility = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDom {
    pub title: String,
    pub source: String,
    pub elements: HashMap<String, Vec<FakeElement>>,
    pub broken: HashSet<String>,
    pub on_enter: Option<String>,
}

impl FakeDom {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// Queries for `selector` fail
    pub fn broken(mut self, selector: &str) -> Self {
        self.broken.insert(selector.to_string());
        self
    }

    pub fn on_enter(mut self, url: &str) -> Self {
        self.on_enter = Some(url.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: HashMap<String, FakeDom>,
    current: String,
    history: Vec<String>,
    find_counts: HashMap<(String, String), usize>,
    actions: Vec<String>,
    screenshot_fails: bool,
    query_delay: Option<Duration>,
}

impl FakeState {
    fn dom(&self) -> Option<&FakeDom> {
        self.pages.get(&self.current)
    }

    fn navigate(&mut self, url: &str) {
        let previous = std::mem::replace(&mut self.current, url.to_string());
        self.history.push(previous);
    }
}

/// A page whose DOM is scripted per URL
#[derive(Debug)]
pub(crate) struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                current: "about:blank".to_string(),
                ..FakeState::default()
            }),
        }
    }

    pub fn page(self, url: &str, dom: FakeDom) -> Self {
        self.state.lock().pages.insert(url.to_string(), dom);
        self
    }

    pub fn at(self, url: &str) -> Self {
        self.state.lock().current = url.to_string();
        self
    }

    pub fn without_screenshots(self) -> Self {
        self.state.lock().screenshot_fails = true;
        self
    }

    /// Every `find_all` takes `delay` before answering
    pub fn slow_queries(self, delay: Duration) -> Self {
        self.state.lock().query_delay = Some(delay);
        self
    }

    /// Every goto/click/type/enter/back, in order
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().actions.clone()
    }

    pub fn current_url(&self) -> String {
        self.state.lock().current.clone()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.actions.push(format!("goto {}", url));
        state.navigate(url);
        Ok(())
    }

    async fn find_all(&self, css: &str) -> E2eResult<Vec<FakeElement>> {
        let delay = self.state.lock().query_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let key = (state.current.clone(), css.to_string());
        let polls = {
            let count = state.find_counts.entry(key).or_insert(0);
            *count += 1;
            *count
        };

        let Some(dom) = state.dom() else {
            return Ok(Vec::new());
        };
        if dom.broken.contains(css) {
            return Err(E2eError::Browser(format!("invalid selector {}", css)));
        }
        Ok(dom
            .elements
            .get(css)
            .map(|els| els.iter().filter(|e| polls > e.after_polls).cloned().collect())
            .unwrap_or_default())
    }

    async fn is_displayed(&self, element: &FakeElement) -> E2eResult<bool> {
        if element.broken_visibility {
            return Err(E2eError::Browser("stale element".to_string()));
        }
        Ok(element.visible)
    }

    async fn is_enabled(&self, element: &FakeElement) -> E2eResult<bool> {
        Ok(element.enabled)
    }

    async fn text(&self, element: &FakeElement) -> E2eResult<String> {
        Ok(element.text.clone())
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> E2eResult<Option<String>> {
        Ok(match name {
            "href" => element.href.clone(),
            _ => None,
        })
    }

    async fn click(&self, element: &FakeElement) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.actions.push(format!("click {}", element.text));
        if let Some(target) = &element.navigates_to {
            state.navigate(target);
        }
        Ok(())
    }

    async fn replace_text(&self, _element: &FakeElement, text: &str) -> E2eResult<()> {
        self.state.lock().actions.push(format!("type {}", text));
        Ok(())
    }

    async fn press_enter(&self, _element: &FakeElement) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.actions.push("enter".to_string());
        if let Some(target) = state.dom().and_then(|d| d.on_enter.clone()) {
            state.navigate(&target);
        }
        Ok(())
    }

    async fn snapshot(&self) -> E2eResult<PageSnapshot> {
        let state = self.state.lock();
        Ok(PageSnapshot {
            url: state.current.clone(),
            title: state.dom().map(|d| d.title.clone()).unwrap_or_default(),
        })
    }

    async fn page_source(&self) -> E2eResult<String> {
        let state = self.state.lock();
        Ok(state.dom().map(|d| d.source.clone()).unwrap_or_default())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        if self.state.lock().screenshot_fails {
            return Err(E2eError::Browser("screenshot unavailable".to_string()));
        }
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn back(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.actions.push("back".to_string());
        if let Some(previous) = state.history.pop() {
            state.current = previous;
        }
        Ok(())
    }
}

/// Hands out fresh fake pages and counts acquire/release
#[derive(Clone)]
pub(crate) struct FakeProvider {
    build: Arc<dyn Fn() -> FakePage + Send + Sync>,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn new(build: impl Fn() -> FakePage + Send + Sync + 'static) -> Self {
        Self {
            build: Arc::new(build),
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    type Session = FakePage;

    async fn acquire(&self) -> E2eResult<FakePage> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok((self.build)())
    }

    async fn release(&self, _session: FakePage) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps evidence in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    pub items: Mutex<Vec<(String, String, EvidenceKind, Vec<u8>)>>,
}

impl MemorySink {
    pub fn names(&self, check: &str) -> Vec<String> {
        self.items
            .lock()
            .iter()
            .filter(|(c, ..)| c == check)
            .map(|(_, name, ..)| name.clone())
            .collect()
    }

    pub fn text(&self, check: &str, name: &str) -> Option<String> {
        self.items
            .lock()
            .iter()
            .find(|(c, n, kind, _)| c == check && n == name && *kind != EvidenceKind::Png)
            .map(|(.., content)| String::from_utf8_lossy(content).into_owned())
    }
}

impl ReportSink for MemorySink {
    fn attach(
        &self,
        check: &str,
        name: &str,
        kind: EvidenceKind,
        content: &[u8],
    ) -> Option<PathBuf> {
        self.items
            .lock()
            .push((check.to_string(), name.to_string(), kind, content.to_vec()));
        Some(PathBuf::from(format!("{}/{}", check, name)))
    }
}
