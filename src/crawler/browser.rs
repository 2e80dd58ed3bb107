//! Headless Chromium sessions
//!
//! One browser process per run; each product gets its own tab with the
//! identity set through the DevTools protocol. Interactions go through small
//! injected scripts so they behave the same on any rendered page.

use crate::crawler::fetcher::BlockDetector;
use crate::crawler::session::{Navigation, PageSession, SessionError, SessionFactory};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens Chromium tabs on a shared browser
pub struct ChromiumSessionFactory {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    detector: BlockDetector,
    navigation_timeout: Duration,
}

impl ChromiumSessionFactory {
    /// Launches a headless browser
    pub async fn launch(
        detector: BlockDetector,
        navigation_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let config = BrowserConfig::builder()
            .window_size(3840, 2160)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .build()
            .map_err(SessionError::Open)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Open(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Launched headless browser");

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            detector,
            navigation_timeout,
        })
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open(&self, user_agent: &str) -> Result<Box<dyn PageSession>, SessionError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Open(e.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| SessionError::Open(e.to_string()))?;

        Ok(Box::new(ChromiumSession {
            page: Some(page),
            detector: self.detector.clone(),
            navigation_timeout: self.navigation_timeout,
        }))
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        let _ = browser.wait().await;
        self.handler_task.abort();
    }
}

/// One rendered tab
pub struct ChromiumSession {
    page: Option<Page>,
    detector: BlockDetector,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    async fn eval_bool(&self, script: String) -> Result<bool, SessionError> {
        let value = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Interaction(e.to_string()))?;
        value
            .into_value::<bool>()
            .map_err(|e| SessionError::Interaction(e.to_string()))
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn goto(&mut self, url: &Url) -> Navigation {
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => {
                return Navigation::Failed {
                    error: e.to_string(),
                }
            }
        };

        match tokio::time::timeout(self.navigation_timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Navigation::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                return Navigation::Failed {
                    error: format!("navigation to {} timed out", url),
                }
            }
        }

        match page.content().await {
            Ok(body) => match self.detector.detect(&body) {
                Some(marker) => Navigation::Blocked {
                    marker: marker.to_string(),
                },
                None => Navigation::Loaded,
            },
            Err(e) => Navigation::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let deadline = Instant::now() + timeout;

        loop {
            if let Ok(true) = self.eval_bool(script.clone()).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        let page = self.page()?;
        if let Ok(value) = page.evaluate("document.documentElement.outerHTML").await {
            if let Ok(html) = value.into_value::<String>() {
                if !html.is_empty() {
                    return Ok(html);
                }
            }
        }
        page.content()
            .await
            .map_err(|e| SessionError::Interaction(e.to_string()))
    }

    async fn click_within(
        &mut self,
        block: &str,
        index: usize,
        target: &str,
    ) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const b = document.querySelectorAll({})[{}]; \
             const t = b && b.querySelector({}); \
             if (!t) return false; t.click(); return true; }})()",
            js_string(block),
            index,
            js_string(target)
        );
        if self.eval_bool(script).await? {
            Ok(())
        } else {
            Err(SessionError::Interaction(format!(
                "no {} inside {}[{}]",
                target, block, index
            )))
        }
    }

    async fn remove(&mut self, selector: &str) -> Result<bool, SessionError> {
        let script = format!(
            "(() => {{ const n = document.querySelectorAll({}); \
             n.forEach(e => e.remove()); return n.length > 0; }})()",
            js_string(selector)
        );
        self.eval_bool(script).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| SessionError::Interaction(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Quotes a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
