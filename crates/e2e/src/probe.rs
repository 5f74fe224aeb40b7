//! UI verification flows
//!
//! Each flow drives one exclusively-owned page through navigation, consent
//! dismissal, readiness waits and element probes. Absent optional elements
//! become warning notes; only the assertions a flow is named after are fatal.

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use kinocheck_common::config::{SiteConfig, TimingConfig};
use kinocheck_common::{ProbeResult, SelectorStrategy};

use crate::browser::PageDriver;
use crate::consent::ConsentHandler;
use crate::error::{E2eError, E2eResult};
use crate::locator::{RequireFound, ResilientLocator};
use crate::report::{FlowOutcome, ReportSink};
use crate::selectors;
use crate::waiter::{Heuristic, PageStateWaiter};

/// Number of navigation links written to evidence
const NAV_LINKS_RECORDED: usize = 10;

/// Number of listing cards written to evidence
const LISTING_CARDS_RECORDED: usize = 3;

/// Characters of card text kept per listing card
const CARD_TEXT_CHARS: usize = 100;

/// A UI flow and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum UiFlow {
    HomePage,
    Search {
        query: String,
        /// Any of these in the results page source or title passes the flow
        terms: Vec<String>,
    },
    DetailPage {
        film_id: u64,
        #[serde(default)]
        keywords: Vec<String>,
        /// Release years accepted from the page text when no year element matches
        #[serde(default)]
        years: Vec<i64>,
    },
    Navigation,
    ListingPage {
        slug: String,
        link_text: String,
        title_keywords: Vec<String>,
        #[serde(default = "default_content_keywords")]
        content_keywords: Vec<String>,
    },
}

fn default_content_keywords() -> Vec<String> {
    ["фильм", "кино", "movie", "cinema", "режиссер", "актер"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

pub struct UiProbe<'a, D: PageDriver> {
    driver: &'a D,
    site: &'a SiteConfig,
    timing: &'a TimingConfig,
    sink: &'a dyn ReportSink,
    check: &'a str,
}

impl<'a, D: PageDriver> UiProbe<'a, D> {
    pub fn new(
        driver: &'a D,
        site: &'a SiteConfig,
        timing: &'a TimingConfig,
        sink: &'a dyn ReportSink,
        check: &'a str,
    ) -> Self {
        Self {
            driver,
            site,
            timing,
            sink,
            check,
        }
    }

    pub async fn run(&self, flow: &UiFlow, outcome: &mut FlowOutcome) -> E2eResult<()> {
        match flow {
            UiFlow::HomePage => self.home_page(outcome).await,
            UiFlow::Search { query, terms } => self.search(query, terms, outcome).await,
            UiFlow::DetailPage {
                film_id,
                keywords,
                years,
            } => self.detail_page(*film_id, keywords, years, outcome).await,
            UiFlow::Navigation => self.navigation(outcome).await,
            UiFlow::ListingPage {
                slug,
                link_text,
                title_keywords,
                content_keywords,
            } => {
                self.listing_page(slug, link_text, title_keywords, content_keywords, outcome)
                    .await
            }
        }
    }

    pub async fn home_page(&self, outcome: &mut FlowOutcome) -> E2eResult<()> {
        self.open(&self.site.base_url).await?;
        self.capture("main_page").await;
        self.dismiss_consent(outcome).await;

        let ready = self
            .waiter()
            .await_ready(
                &selectors::home_ready(),
                self.timing.page_ready_timeout(),
                &[Heuristic::TitleContainsIgnoreCase(self.site.title_marker.clone())],
            )
            .await?;
        note_readiness(outcome, &ready);

        let snapshot = self.driver.snapshot().await?;
        if !snapshot.title.contains(&self.site.title_marker) {
            self.capture("title_check_error").await;
            return Err(E2eError::AssertionFailed(format!(
                "page title '{}' does not contain '{}'",
                snapshot.title, self.site.title_marker
            )));
        }
        outcome.note(format!("page title: {}", snapshot.title));

        let locator = ResilientLocator::new(self.driver);

        let logo = selectors::logo();
        let found = locator.locate(&logo).await.require("logo", logo.len());
        if let Some(hit) = outcome.tolerate(found)? {
            outcome.note(format!("logo found ({})", strategy_label(&logo, hit.strategy_index)));
        }

        let inputs = selectors::search_inputs();
        let input = locator.locate(&inputs).await;
        if input.found {
            let label = strategy_label(&inputs, input.strategy_index);
            outcome.note(format!("search input found ({})", label));
        } else {
            let buttons = selectors::search_buttons();
            let found = locator
                .locate(&buttons)
                .await
                .require("search input or button", inputs.len() + buttons.len());
            if let Some(hit) = outcome.tolerate(found)? {
                let label = strategy_label(&buttons, hit.strategy_index);
                outcome.note(format!("search button found ({})", label));
            }
        }

        Ok(())
    }

    pub async fn search(
        &self,
        query: &str,
        terms: &[String],
        outcome: &mut FlowOutcome,
    ) -> E2eResult<()> {
        let locator = ResilientLocator::new(self.driver);

        self.open(&self.site.base_url).await?;
        self.dismiss_consent(outcome).await;

        match locator.locate_element(&selectors::search_buttons()).await {
            Some(button) => match self.driver.click(&button.element).await {
                Ok(()) => {
                    outcome.note("search button clicked");
                    sleep(self.timing.post_input_settle()).await;
                }
                Err(e) => outcome.warn(format!("search button click failed: {}", e)),
            },
            None => outcome.note("no search button, typing directly"),
        }

        let input = match locator.locate_element(&selectors::focused_search_inputs()).await {
            Some(hit) => Some(hit),
            None => locator.locate_element(&selectors::generic_inputs()).await,
        };

        match input {
            Some(hit) => {
                self.driver.replace_text(&hit.element, query).await?;
                sleep(self.timing.post_input_settle()).await;
                self.driver.press_enter(&hit.element).await?;
                outcome.note(format!("query '{}' submitted through the search input", query));
            }
            None => {
                let url = self.search_url(query)?;
                outcome.warn(format!("no search input, opening {} directly", url));
                self.driver.goto(&url).await?;
            }
        }

        let ready = self
            .waiter()
            .await_ready(
                &selectors::search_results_ready(),
                self.timing.page_ready_timeout(),
                &[
                    Heuristic::UrlContains("search".to_string()),
                    Heuristic::UrlContains("/s/".to_string()),
                    Heuristic::UrlContainsIgnoreCase(query.to_string()),
                ],
            )
            .await?;
        note_readiness(outcome, &ready);
        sleep(self.timing.post_navigation_settle()).await;
        self.capture("search_results").await;

        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let source = self.driver.page_source().await?;
        let source_lower = source.to_lowercase();

        if let Some(term) = terms.iter().find(|t| source_lower.contains(t.as_str())) {
            outcome.note(format!("results contain '{}'", term));
            return Ok(());
        }

        let title = self.driver.snapshot().await?.title.to_lowercase();
        if let Some(term) = terms.iter().find(|t| title.contains(t.as_str())) {
            outcome.note(format!("page title contains '{}'", term));
            return Ok(());
        }

        self.capture("search_results_content").await;
        self.sink.attach_html(self.check, "search_results_source", &source);
        Err(E2eError::AssertionFailed(format!(
            "none of [{}] found in the search results for '{}'",
            terms.join(", "),
            query
        )))
    }

    pub async fn detail_page(
        &self,
        film_id: u64,
        keywords: &[String],
        years: &[i64],
        outcome: &mut FlowOutcome,
    ) -> E2eResult<()> {
        let film_path = format!("/film/{}", film_id);

        self.open(&self.site_url(&format!("film/{}/", film_id))?).await?;
        self.dismiss_consent(outcome).await;

        let ready = self
            .waiter()
            .await_ready(
                &selectors::film_ready(),
                self.timing.page_ready_timeout(),
                &[Heuristic::UrlContains(film_path.clone())],
            )
            .await?;
        note_readiness(outcome, &ready);
        self.capture("film_page").await;

        let snapshot = self.driver.snapshot().await?;
        if !snapshot.url.contains(&film_path) {
            self.capture("film_url_error").await;
            return Err(E2eError::AssertionFailed(format!(
                "expected a {} page, landed on {}",
                film_path, snapshot.url
            )));
        }
        outcome.note(format!("film page opened: {}", snapshot.url));

        let locator = ResilientLocator::new(self.driver);
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        match locator.locate_element(&selectors::film_title()).await {
            Some(hit) => {
                outcome.note(format!("film title: {}", hit.text));
                let evidence = format!("Название фильма: {}", hit.text);
                self.sink.attach_text(self.check, "film_title", &evidence);

                let title = hit.text.to_lowercase();
                if keywords.is_empty() || keywords.iter().any(|k| title.contains(k.as_str())) {
                    outcome.note("title matches the expected film");
                } else {
                    let source = self.driver.page_source().await?.to_lowercase();
                    if keywords.iter().any(|k| source.contains(k.as_str())) {
                        outcome.note("expected film name found in the page text");
                    } else {
                        outcome.warn(format!(
                            "title '{}' matches none of [{}]",
                            hit.text,
                            keywords.join(", ")
                        ));
                    }
                }
            }
            None => {
                outcome.warn(format!(
                    "film title element not found; page title: {}",
                    snapshot.title
                ));
                let evidence = format!("Заголовок страницы: {}", snapshot.title);
                self.sink.attach_text(self.check, "page_title", &evidence);
            }
        }

        let year_hits = locator.collect_visible(&selectors::film_year(), usize::MAX).await;
        match year_hits.iter().find_map(|hit| extract_year(&hit.text)) {
            Some(year) => outcome.note(format!("release year: {}", year)),
            None => {
                let source = self.driver.page_source().await?;
                match find_any_year(&source, years) {
                    Some(year) => {
                        outcome.note(format!("release year found in the page text: {}", year))
                    }
                    None => outcome.warn("release year not found"),
                }
            }
        }

        let ratings = locator.collect_visible(&selectors::film_rating(), usize::MAX).await;
        match ratings.iter().find(|hit| looks_like_rating(&hit.text)) {
            Some(hit) => outcome.note(format!("rating: {}", hit.text)),
            None => outcome.warn("rating not found"),
        }

        Ok(())
    }

    pub async fn navigation(&self, outcome: &mut FlowOutcome) -> E2eResult<()> {
        let locator = ResilientLocator::new(self.driver);

        self.open(&self.site.base_url).await?;
        self.dismiss_consent(outcome).await;

        let mut links = Vec::new();
        for hit in locator
            .collect_visible(&selectors::nav_links(), NAV_LINKS_RECORDED)
            .await
        {
            let href = self.href(&hit.element).await;
            links.push(format!("{}: {}", hit.text, href));
        }

        if links.is_empty() {
            let host = self.site_root()?.host_str().map(str::to_string);
            for hit in locator.collect_visible(&selectors::any_links(), usize::MAX).await {
                let href = self.href(&hit.element).await;
                let same_site = host.as_deref().map_or(false, |h| href.contains(h));
                if href.starts_with('/') || same_site {
                    links.push(format!("{}: {}", hit.text, href));
                    if links.len() >= NAV_LINKS_RECORDED {
                        break;
                    }
                }
            }
        }

        if links.is_empty() {
            outcome.warn("no navigation links found");
        } else {
            outcome.note(format!("{} navigation links recorded", links.len()));
            self.sink
                .attach_text(self.check, "navigation_links", &links.join("\n"));
        }

        match locator.locate_element(&selectors::click_targets()).await {
            Some(hit) => {
                let before = self.driver.snapshot().await?.url;
                if let Err(e) = self.driver.click(&hit.element).await {
                    outcome.warn(format!("click on '{}' failed: {}", hit.text, e));
                    return Ok(());
                }
                sleep(self.timing.post_navigation_settle()).await;

                let after = self.driver.snapshot().await?.url;
                if after != before {
                    outcome.note(format!("link '{}' navigated to {}", hit.text, after));
                    self.driver.back().await?;
                    sleep(self.timing.post_navigation_settle()).await;
                } else {
                    outcome.warn(format!("clicking '{}' did not change the URL", hit.text));
                }
            }
            None => outcome.warn("no short link to click"),
        }

        Ok(())
    }

    pub async fn listing_page(
        &self,
        slug: &str,
        link_text: &str,
        title_keywords: &[String],
        content_keywords: &[String],
        outcome: &mut FlowOutcome,
    ) -> E2eResult<()> {
        let locator = ResilientLocator::new(self.driver);
        let direct_url = self.site_url(&format!("{}/", slug.trim_matches('/')))?;

        self.open(&self.site.base_url).await?;
        self.dismiss_consent(outcome).await;

        let clicked = match locator
            .locate_element(&selectors::listing_links(slug, link_text))
            .await
        {
            Some(hit) => match self.driver.click(&hit.element).await {
                Ok(()) => {
                    outcome.note(format!("followed the '{}' link", link_text));
                    true
                }
                Err(e) => {
                    outcome.warn(format!("listing link click failed: {}", e));
                    false
                }
            },
            None => {
                outcome.warn(format!(
                    "'{}' link not found, opening {} directly",
                    link_text, direct_url
                ));
                false
            }
        };
        if clicked {
            sleep(self.timing.post_navigation_settle()).await;
        } else {
            self.open(&direct_url).await?;
        }

        let mut heuristics = vec![Heuristic::UrlContains(selectors::slug_tail(slug).to_string())];
        heuristics.extend(
            title_keywords
                .iter()
                .map(|k| Heuristic::TitleContainsIgnoreCase(k.clone())),
        );
        let ready = self
            .waiter()
            .await_ready(&selectors::listing_ready(), self.timing.page_ready_timeout(), &heuristics)
            .await?;
        note_readiness(outcome, &ready);
        self.capture("listing_page").await;

        let snapshot = self.driver.snapshot().await?;
        let title = snapshot.title.to_lowercase();
        if title_keywords.iter().any(|k| title.contains(&k.to_lowercase())) {
            outcome.note(format!("page title: {}", snapshot.title));
        } else {
            outcome.warn(format!("page title '{}' does not look like a listing", snapshot.title));
        }

        let content = selectors::listing_content();
        let cards = locator.collect_visible(&content, LISTING_CARDS_RECORDED).await;
        if let Some(first) = cards.first() {
            let mut preview = Vec::new();
            for (i, card) in cards.iter().enumerate() {
                let text = self.driver.text(&card.element).await.unwrap_or_default();
                let text: String = text.trim().chars().take(CARD_TEXT_CHARS).collect();
                preview.push(format!("{}. {}", i + 1, text));
            }
            outcome.note(format!(
                "content cards found ({})",
                strategy_label(&content, Some(first.strategy_index))
            ));
            self.sink.attach_text(self.check, "listing_cards", &preview.join("\n"));
            return Ok(());
        }

        let source = self.driver.page_source().await?;
        let source_lower = source.to_lowercase();
        if let Some(keyword) = content_keywords
            .iter()
            .find(|k| source_lower.contains(&k.to_lowercase()))
        {
            outcome.warn(format!("no content cards; page text mentions '{}'", keyword));
            return Ok(());
        }

        let missing = E2eError::ElementNotFound {
            what: "listing content".to_string(),
            strategies: content.len(),
        };
        warn!("{}; treating the page as not loaded", missing);
        let evidence = self.sink.attach_html(self.check, "listing_source", &source);
        Err(E2eError::PageLoadFailure {
            url: snapshot.url,
            title: snapshot.title,
            evidence,
        })
    }

    fn waiter(&self) -> PageStateWaiter<'_, D> {
        PageStateWaiter::new(self.driver, self.sink, self.check, self.timing.poll_interval())
    }

    /// `site.base_url` as a directory URL
    fn site_root(&self) -> E2eResult<Url> {
        let base = &self.site.base_url;
        let mut root = Url::parse(base).map_err(|e| bad_site_url(base, e))?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(root)
    }

    fn site_url(&self, path: &str) -> E2eResult<String> {
        let url = self
            .site_root()?
            .join(path.trim_start_matches('/'))
            .map_err(|e| bad_site_url(path, e))?;
        Ok(url.to_string())
    }

    /// `<root>/s/<query>/` with the query as one percent-encoded segment
    fn search_url(&self, query: &str) -> E2eResult<String> {
        let mut url = self.site_root()?;
        url.path_segments_mut()
            .map_err(|()| bad_site_url(&self.site.base_url, "cannot be a base"))?
            .pop_if_empty()
            .extend(["s", query, ""]);
        Ok(url.to_string())
    }

    /// Navigate and let the page settle
    async fn open(&self, url: &str) -> E2eResult<()> {
        info!("Opening {}", url);
        self.driver.goto(url).await?;
        sleep(self.timing.post_navigation_settle()).await;
        Ok(())
    }

    async fn dismiss_consent(&self, outcome: &mut FlowOutcome) {
        if ConsentHandler::new(self.driver, self.timing).try_dismiss().await {
            outcome.note("consent dialog dismissed");
        } else {
            outcome.note("consent dialog not shown");
        }
    }

    /// Screenshot into the sink; failures are logged only
    async fn capture(&self, name: &str) {
        match self.driver.screenshot().await {
            Ok(png) => {
                self.sink.attach_png(self.check, name, &png);
            }
            Err(e) => warn!("Screenshot '{}' failed: {}", name, e),
        }
    }

    async fn href(&self, element: &D::Element) -> String {
        self.driver
            .attribute(element, "href")
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

fn note_readiness(outcome: &mut FlowOutcome, ready: &ProbeResult) {
    if ready.degraded {
        outcome.warn(ready.diagnostic.clone().unwrap_or_else(|| "ready by heuristic".to_string()));
    }
}

fn strategy_label(chain: &[SelectorStrategy], index: Option<usize>) -> String {
    index
        .and_then(|i| chain.get(i))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// First plausible release year in `text`
fn extract_year(text: &str) -> Option<String> {
    let re = Regex::new(r"\b(19\d{2}|20\d{2})\b").ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Digits with optional dots, or a decimal comma
fn looks_like_rating(text: &str) -> bool {
    let text = text.trim();
    let digits = text.replace('.', "");
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())) || text.contains(',')
}

/// First of `years` mentioned as a whole word in `text`
fn find_any_year(text: &str, years: &[i64]) -> Option<i64> {
    if years.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    let re = Regex::new(&format!(r"\b({})\b", alternatives.join("|"))).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn bad_site_url(url: &str, reason: impl std::fmt::Display) -> E2eError {
    E2eError::Config(kinocheck_common::Error::InvalidConfig(format!(
        "bad site url '{}': {}",
        url, reason
    )))
}
