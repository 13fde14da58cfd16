use crate::scrapers::traits::{PageSession, SessionFactory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "ar-SA,ar;q=0.9,en;q=0.8";

/// Chrome is killed after this long without DevTools traffic
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Time the gallery gets to render the map link after a click
const CLICK_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub stealth: bool,
    /// Navigation and element lookup timeout
    pub timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            stealth: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Opens tabs on a launched Chrome instance, relaunching it once it has died
pub struct ChromeSessionFactory {
    browser: Mutex<Browser>,
    options: BrowserOptions,
}

fn launch_browser(options: &BrowserOptions) -> Result<Browser> {
    let launch_options = LaunchOptions::default_builder()
        .headless(options.headless)
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .build()
        .context("Failed to build launch options")?;

    Browser::new(launch_options).context("Failed to launch Chrome browser")
}

impl ChromeSessionFactory {
    /// Launch Chrome
    pub fn launch(options: BrowserOptions) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", options.headless);
        let browser = launch_browser(&options)?;

        Ok(Self {
            browser: Mutex::new(browser),
            options,
        })
    }

    /// New tab on the current browser. A crashed or idled-out Chrome is
    /// replaced and the tab is opened on the fresh instance.
    fn new_tab(&self) -> Result<Arc<Tab>> {
        let mut browser = self.browser.lock().unwrap_or_else(PoisonError::into_inner);

        match browser.new_tab() {
            Ok(tab) => Ok(tab),
            Err(e) => {
                warn!("Failed to open tab, relaunching Chrome: {:#}", e);
                *browser = launch_browser(&self.options)?;
                browser.new_tab().context("Failed to open tab after relaunch")
            }
        }
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn open(&self) -> Result<Box<dyn PageSession>> {
        let tab = self.new_tab()?;
        tab.set_default_timeout(self.options.timeout);

        if self.options.stealth {
            tab.enable_stealth_mode()
                .context("Failed to enable stealth mode")?;
            tab.set_user_agent(USER_AGENT, Some(ACCEPT_LANGUAGE), None)
                .context("Failed to set user agent")?;
        }

        Ok(Box::new(ChromeSession { tab }))
    }
}

/// One Chrome tab
pub struct ChromeSession {
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// headless_chrome blocks on every DevTools round trip, so calls run on
    /// the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .context("Browser task panicked")?
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.run(move |tab| {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.run(|tab| {
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)?;
            Ok(())
        })
        .await
    }

    async fn click(&mut self, selector: &str) -> Result<bool> {
        let selector = selector.to_string();
        self.run(move |tab| match tab.find_element(&selector) {
            Ok(element) => {
                element.click()?;
                thread::sleep(CLICK_SETTLE);
                Ok(true)
            }
            Err(e) => {
                debug!("Nothing to click for {}: {}", selector, e);
                Ok(false)
            }
        })
        .await
    }

    async fn html(&mut self) -> Result<String> {
        self.run(|tab| {
            let result = tab.evaluate("document.documentElement.outerHTML", false)?;
            result
                .value
                .and_then(|value| value.as_str().map(str::to_string))
                .context("Could not get HTML from page")
        })
        .await
    }

    fn close(self: Box<Self>) {
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close tab: {}", e);
        }
    }
}
