//! Cookie/consent dialog dismissal

use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use kinocheck_common::config::TimingConfig;

use crate::browser::PageDriver;
use crate::error::E2eResult;
use crate::locator::ResilientLocator;
use crate::selectors;

pub struct ConsentHandler<'a, D: PageDriver> {
    driver: &'a D,
    timing: &'a TimingConfig,
}

impl<'a, D: PageDriver> ConsentHandler<'a, D> {
    pub fn new(driver: &'a D, timing: &'a TimingConfig) -> Self {
        Self { driver, timing }
    }

    /// Click the consent button if one shows up within the consent timeout.
    ///
    /// Never fails: `false` means no dialog was dismissed.
    pub async fn try_dismiss(&self) -> bool {
        match timeout(self.timing.consent_timeout(), self.click_when_clickable()).await {
            Ok(Ok(())) => {
                sleep(self.timing.post_consent_settle()).await;
                info!("Consent dialog dismissed");
                true
            }
            Ok(Err(e)) => {
                warn!("Consent button could not be clicked: {}", e);
                false
            }
            Err(_) => {
                warn!("Consent dialog did not appear");
                false
            }
        }
    }

    async fn click_when_clickable(&self) -> E2eResult<()> {
        let locator = ResilientLocator::new(self.driver);
        let chain = selectors::consent_buttons();

        loop {
            if let Some(hit) = locator.locate_element(&chain).await {
                if self.driver.is_enabled(&hit.element).await.unwrap_or(false) {
                    return self.driver.click(&hit.element).await;
                }
            }
            sleep(self.timing.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDom, FakeElement, FakePage};
    use std::time::Duration;
    use tokio::time::Instant;

    const URL: &str = "https://site.test/";

    #[tokio::test(start_paused = true)]
    async fn test_dismisses_visible_dialog() {
        let driver = FakePage::new()
            .page(
                URL,
                FakeDom::titled("Кинопоиск")
                    .with("button", FakeElement::visible("Настроить"))
                    .with("button", FakeElement::visible("Принять все").after(2)),
            )
            .at(URL);
        let timing = TimingConfig::default();

        assert!(ConsentHandler::new(&driver, &timing).try_dismiss().await);
        assert_eq!(driver.actions(), vec!["click Принять все"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_dialog_returns_false_after_timeout() {
        let driver = FakePage::new().page(URL, FakeDom::titled("Кинопоиск")).at(URL);
        let timing = TimingConfig::default();

        let start = Instant::now();
        assert!(!ConsentHandler::new(&driver, &timing).try_dismiss().await);
        assert_eq!(start.elapsed(), Duration::from_millis(timing.consent_timeout_ms));
        assert!(driver.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_button_is_not_clicked() {
        let driver = FakePage::new()
            .page(
                URL,
                FakeDom::titled("x").with("button", FakeElement::visible("Accept").disabled()),
            )
            .at(URL);
        let timing = TimingConfig::default();

        assert!(!ConsentHandler::new(&driver, &timing).try_dismiss().await);
        assert!(driver.actions().is_empty());
    }
}
