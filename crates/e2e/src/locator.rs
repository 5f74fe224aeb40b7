//! Ordered fallback element lookup
//!
//! A chain of [`SelectorStrategy`] values is tried strictly in order. Every
//! attempt is isolated: a query that throws, or an element whose visibility or
//! text cannot be read, is treated as a non-match and logged at debug level.

use tracing::debug;

use kinocheck_common::{MatchPredicate, ProbeResult, SelectorStrategy};

use crate::browser::PageDriver;
use crate::error::{E2eError, E2eResult};

/// An element together with the strategy that produced it
#[derive(Debug, Clone)]
pub struct LocatedElement<E> {
    pub element: E,
    pub strategy_index: usize,

    /// Trimmed inner text; empty when the predicate did not need it
    pub text: String,
}

pub struct ResilientLocator<'a, D: PageDriver> {
    driver: &'a D,
}

impl<'a, D: PageDriver> ResilientLocator<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Index of the first strategy with a matching element
    pub async fn locate(&self, strategies: &[SelectorStrategy]) -> ProbeResult {
        match self.locate_element(strategies).await {
            Some(hit) => ProbeResult::found(hit.strategy_index),
            None => ProbeResult::not_found(format!(
                "none of {} strategies matched a visible element",
                strategies.len()
            )),
        }
    }

    /// First matching element of the first matching strategy
    pub async fn locate_element(
        &self,
        strategies: &[SelectorStrategy],
    ) -> Option<LocatedElement<D::Element>> {
        for (index, strategy) in strategies.iter().enumerate() {
            let elements = match self.driver.find_all(&strategy.query).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Strategy #{} '{}' failed: {}", index, strategy, e);
                    continue;
                }
            };

            for element in elements {
                if let Some(text) = self.accept(&element, &strategy.predicate).await {
                    debug!("Strategy #{} '{}' matched", index, strategy);
                    return Some(LocatedElement {
                        element,
                        strategy_index: index,
                        text,
                    });
                }
            }
            debug!("Strategy #{} '{}' matched nothing", index, strategy);
        }
        None
    }

    /// Every matching element across all strategies, in chain order, up to `limit`
    pub async fn collect_visible(
        &self,
        strategies: &[SelectorStrategy],
        limit: usize,
    ) -> Vec<LocatedElement<D::Element>> {
        let mut hits = Vec::new();

        for (index, strategy) in strategies.iter().enumerate() {
            let elements = match self.driver.find_all(&strategy.query).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Strategy #{} '{}' failed: {}", index, strategy, e);
                    continue;
                }
            };

            for element in elements {
                if hits.len() >= limit {
                    return hits;
                }
                if let Some(text) = self.accept(&element, &strategy.predicate).await {
                    hits.push(LocatedElement {
                        element,
                        strategy_index: index,
                        text,
                    });
                }
            }
        }
        hits
    }

    /// `Some(text)` when the element is displayed and passes the predicate
    async fn accept(&self, element: &D::Element, predicate: &MatchPredicate) -> Option<String> {
        if *predicate == MatchPredicate::Present {
            return Some(String::new());
        }

        match self.driver.is_displayed(element).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                debug!("Visibility check failed: {}", e);
                return None;
            }
        }

        if !predicate.needs_text() {
            return Some(String::new());
        }

        match self.driver.text(element).await {
            Ok(text) if predicate.accepts_text(&text) => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("Text read failed: {}", e);
                None
            }
        }
    }
}

/// Escalate absence into an error for callers that need the element
pub trait RequireFound: Sized {
    fn require(self, what: &str, strategies: usize) -> E2eResult<Self>;
}

impl RequireFound for ProbeResult {
    fn require(self, what: &str, strategies: usize) -> E2eResult<Self> {
        if self.found {
            Ok(self)
        } else {
            Err(E2eError::ElementNotFound {
                what: what.to_string(),
                strategies,
            })
        }
    }
}
