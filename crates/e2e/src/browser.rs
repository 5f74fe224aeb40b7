//! Browser sessions
//!
//! The verification layer talks to a page only through [`PageDriver`], and
//! obtains pages only through a [`SessionProvider`]. The Chrome
//! implementation below drives a local Chrome/Chromium over the DevTools
//! protocol; each UI flow gets a fresh browser process.

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kinocheck_common::config::BrowserSettings;

use crate::error::{E2eError, E2eResult};

/// URL and title of the current page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
}

/// Minimal page surface used by the locator, waiter and flows
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Send + Sync;

    /// Navigate and wait for the load event
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// All elements matching a CSS selector, in document order
    async fn find_all(&self, css: &str) -> E2eResult<Vec<Self::Element>>;

    async fn is_displayed(&self, element: &Self::Element) -> E2eResult<bool>;

    async fn is_enabled(&self, element: &Self::Element) -> E2eResult<bool>;

    async fn text(&self, element: &Self::Element) -> E2eResult<String>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> E2eResult<Option<String>>;

    async fn click(&self, element: &Self::Element) -> E2eResult<()>;

    /// Clear an input and type `text` into it
    async fn replace_text(&self, element: &Self::Element, text: &str) -> E2eResult<()>;

    async fn press_enter(&self, element: &Self::Element) -> E2eResult<()>;

    async fn snapshot(&self) -> E2eResult<PageSnapshot>;

    async fn page_source(&self) -> E2eResult<String>;

    /// PNG of the current viewport
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    async fn back(&self) -> E2eResult<()>;
}

/// Hands out one exclusively-owned page per flow.
///
/// Callers must pass every acquired session back to `release`, on success and
/// on failure alike. Sessions also clean up on drop for the panic and
/// cancellation paths.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: PageDriver;

    async fn acquire(&self) -> E2eResult<Self::Session>;

    async fn release(&self, session: Self::Session);
}

impl From<CdpError> for E2eError {
    fn from(e: CdpError) -> Self {
        E2eError::Browser(e.to_string())
    }
}

const JS_IS_DISPLAYED: &str = r#"function() {
    const style = window.getComputedStyle(this);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return false;
    }
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

const JS_IS_ENABLED: &str = "function() { return !this.disabled; }";

const JS_CLEAR_INPUT: &str = r#"function() {
    this.focus();
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Launches a local Chrome per session
pub struct ChromeProvider {
    settings: BrowserSettings,
}

impl ChromeProvider {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> E2eResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.window_width, self.settings.window_height)
            .args(self.settings.extra_args.iter().cloned());

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(E2eError::Browser)
    }
}

#[async_trait]
impl SessionProvider for ChromeProvider {
    type Session = ChromeSession;

    async fn acquire(&self) -> E2eResult<ChromeSession> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let mut session = ChromeSession {
            browser,
            page: None,
            handler,
        };

        match session.browser.new_page("about:blank").await {
            Ok(page) => {
                session.page = Some(page);
                info!("Browser session started");
                Ok(session)
            }
            Err(e) => {
                session.close().await;
                Err(e.into())
            }
        }
    }

    async fn release(&self, session: ChromeSession) {
        session.close().await;
        info!("Browser session released");
    }
}

/// One browser process with a single tab
pub struct ChromeSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    fn page(&self) -> E2eResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| E2eError::Browser("session has no open page".to_string()))
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
    }

    async fn call_bool(&self, element: &Element, function: &str) -> E2eResult<bool> {
        let returns = element.call_js_fn(function, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // The Browser's own drop kills the child process if it is still alive
        self.handler.abort();
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    type Element = Element;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn find_all(&self, css: &str) -> E2eResult<Vec<Element>> {
        Ok(self.page()?.find_elements(css).await?)
    }

    async fn is_displayed(&self, element: &Element) -> E2eResult<bool> {
        self.call_bool(element, JS_IS_DISPLAYED).await
    }

    async fn is_enabled(&self, element: &Element) -> E2eResult<bool> {
        self.call_bool(element, JS_IS_ENABLED).await
    }

    async fn text(&self, element: &Element) -> E2eResult<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> E2eResult<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn click(&self, element: &Element) -> E2eResult<()> {
        element.click().await?;
        Ok(())
    }

    async fn replace_text(&self, element: &Element, text: &str) -> E2eResult<()> {
        element.call_js_fn(JS_CLEAR_INPUT, false).await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, element: &Element) -> E2eResult<()> {
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn snapshot(&self) -> E2eResult<PageSnapshot> {
        let page = self.page()?;
        Ok(PageSnapshot {
            url: page.url().await?.unwrap_or_default(),
            title: page.get_title().await?.unwrap_or_default(),
        })
    }

    async fn page_source(&self) -> E2eResult<String> {
        Ok(self.page()?.content().await?)
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(false).build();
        Ok(self.page()?.screenshot(params).await?)
    }

    async fn back(&self) -> E2eResult<()> {
        self.page()?.evaluate("window.history.back()").await?;
        Ok(())
    }
}
