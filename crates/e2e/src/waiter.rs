//! Bounded page-readiness waits
//!
//! WAITING polls the condition chain; on timeout the URL and title are
//! read once and checked against the fallback heuristics (HEURISTIC_CHECK);
//! if none holds the wait FAILS with a screenshot attached.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use kinocheck_common::{ProbeResult, SelectorStrategy};

use crate::browser::{PageDriver, PageSnapshot};
use crate::error::{E2eError, E2eResult};
use crate::locator::ResilientLocator;
use crate::report::ReportSink;

/// Fallback check applied once a wait times out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Heuristic {
    UrlContains(String),
    UrlContainsIgnoreCase(String),
    TitleContainsIgnoreCase(String),
}

impl Heuristic {
    pub fn matches(&self, snapshot: &PageSnapshot) -> bool {
        match self {
            Heuristic::UrlContains(needle) => snapshot.url.contains(needle.as_str()),
            Heuristic::UrlContainsIgnoreCase(needle) => {
                snapshot.url.to_lowercase().contains(&needle.to_lowercase())
            }
            Heuristic::TitleContainsIgnoreCase(needle) => {
                snapshot.title.to_lowercase().contains(&needle.to_lowercase())
            }
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::UrlContains(n) => write!(f, "url contains '{}'", n),
            Heuristic::UrlContainsIgnoreCase(n) => write!(f, "url contains '{}' (ignore case)", n),
            Heuristic::TitleContainsIgnoreCase(n) => {
                write!(f, "title contains '{}' (ignore case)", n)
            }
        }
    }
}

pub struct PageStateWaiter<'a, D: PageDriver> {
    driver: &'a D,
    sink: &'a dyn ReportSink,
    check: &'a str,
    poll_interval: Duration,
}

impl<'a, D: PageDriver> PageStateWaiter<'a, D> {
    pub fn new(
        driver: &'a D,
        sink: &'a dyn ReportSink,
        check: &'a str,
        poll_interval: Duration,
    ) -> Self {
        Self {
            driver,
            sink,
            check,
            poll_interval,
        }
    }

    /// Wait until any of `conditions` is matched.
    ///
    /// One timeout window per call, covering the driver queries as well as
    /// the sleeps between them. A heuristic match is READY with
    /// `degraded = true`; no match is `PageLoadFailure`.
    pub async fn await_ready(
        &self,
        conditions: &[SelectorStrategy],
        timeout: Duration,
        heuristics: &[Heuristic],
    ) -> E2eResult<ProbeResult> {
        let locator = ResilientLocator::new(self.driver);
        let polling = async {
            loop {
                let ready = locator.locate(conditions).await;
                if ready.found {
                    return ready;
                }
                sleep(self.poll_interval).await;
            }
        };

        if let Ok(ready) = tokio::time::timeout(timeout, polling).await {
            if let Some(condition) = ready.strategy_index.and_then(|i| conditions.get(i)) {
                debug!("Page ready: '{}' matched", condition);
            }
            return Ok(ready);
        }

        let snapshot = self.driver.snapshot().await?;

        if let Some(heuristic) = heuristics.iter().find(|h| h.matches(&snapshot)) {
            warn!(
                "No ready condition after {:?}; accepting page by heuristic: {}",
                timeout, heuristic
            );
            return Ok(ProbeResult::degraded(format!("ready by heuristic: {}", heuristic)));
        }

        let evidence = match self.driver.screenshot().await {
            Ok(png) => self.sink.attach_png(self.check, "page_load_timeout", &png),
            Err(e) => {
                warn!("Could not capture timeout screenshot: {}", e);
                None
            }
        };

        Err(E2eError::PageLoadFailure {
            url: snapshot.url,
            title: snapshot.title,
            evidence,
        })
    }
}
