//! Chromium binding through the DevTools protocol

use super::{BrowserInstance, BrowserPage, RenderError, RenderingEngine};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Launches local headless Chromium processes
#[derive(Debug, Default, Clone)]
pub struct ChromiumEngine;

#[async_trait]
impl RenderingEngine for ChromiumEngine {
    async fn launch(&self, args: &[String]) -> Result<Arc<dyn BrowserInstance>, RenderError> {
        let config = BrowserConfig::builder()
            .args(args.iter().map(String::as_str))
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Arc::new(ChromiumInstance {
            browser: Mutex::new(browser),
            handler_task,
        }))
    }
}

/// A running Chromium; connected while its protocol handler is alive
struct ChromiumInstance {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserInstance for ChromiumInstance {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(Box::new(ChromiumPage { page: Some(page) }))
    }

    fn is_connected(&self) -> bool {
        !self.handler_task.is_finished()
    }

    async fn close(&self) -> Result<(), RenderError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ());
        let _ = browser.wait().await;
        self.handler_task.abort();
        closed.map_err(|e| RenderError::Page(e.to_string()))
    }
}

struct ChromiumPage {
    page: Option<Page>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Page("tab already closed".to_string()))
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        let page = self.page()?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout(url.to_string())),
        }
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.page()?
            .content()
            .await
            .map_err(|e| RenderError::Page(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        match self.page.take() {
            Some(page) => page.close().await.map_err(|e| RenderError::Page(e.to_string())),
            None => Ok(()),
        }
    }
}
