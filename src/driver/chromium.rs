//! Chromium-backed page automation driver
//!
//! Thin wrapper around chromiumoxide: one shared browser process, one
//! incognito browser context per opened session so concurrent fetches never
//! share cookies or storage.

use crate::driver::{DriverError, PageDriver, PageElement, PageSession};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// How often `wait_for_marker` re-checks the selector
const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Driver wrapping one Chromium process
pub struct ChromiumDriver {
    browser: Arc<Browser>,
    handler_task: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launches a browser process and starts its event handler task
    pub async fn launch(headless: bool) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // The handler stream must be polled for the browser connection to
        // make progress; it ends when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
        })
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn open_session(&self) -> Result<Box<dyn PageSession>, DriverError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| DriverError::SessionOpen(e.to_string()))?
            .result
            .browser_context_id;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(DriverError::SessionOpen)?;

        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| DriverError::SessionOpen(e.to_string()))?;

        Ok(Box::new(ChromiumSession {
            browser: Arc::clone(&self.browser),
            page,
            context_id,
        }))
    }
}

/// One open page in its own incognito context
struct ChromiumSession {
    browser: Arc<Browser>,
    page: Page,
    context_id: BrowserContextId,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DriverError::NavigationTimeout {
                url: url.to_string(),
            }),
        }
    }

    async fn wait_for_marker(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let wait = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(MARKER_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| DriverError::WaitTimeout {
                selector: selector.to_string(),
            })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;

        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;

        element
            .click()
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;
        element
            .type_str(text)
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;

        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;

        element
            .click()
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;

        Ok(())
    }

    async fn wait_settled(&self) -> Result<(), DriverError> {
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| DriverError::Protocol(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(|e| DriverError::Protocol(e.to_string()))?
            .ok_or_else(|| DriverError::Protocol("session has no current URL".to_string()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        // The context must be disposed even when the page close fails,
        // otherwise the incognito partition outlives its session.
        let page_closed = self
            .page
            .clone()
            .close()
            .await
            .map_err(|e| DriverError::Protocol(e.to_string()));

        let context_disposed = self
            .browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Protocol(e.to_string()));

        page_closed.and(context_disposed)
    }
}

/// Handle to one DOM element
struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn text(&self) -> Result<Option<String>, DriverError> {
        self.element
            .inner_text()
            .await
            .map_err(|e| DriverError::Element(e.to_string()))
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.element
            .attribute(name)
            .await
            .map_err(|e| DriverError::Element(e.to_string()))
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.element
            .click()
            .await
            .map_err(|e| DriverError::Element(e.to_string()))?;
        Ok(())
    }
}
