use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BrowserConfig;
use crate::error::AppError;
use crate::loader::RevealControl;
use crate::Result;

/// The narrow capability set the harvest pipeline needs from a browser
/// session. Keeping it a trait lets the loader and pipeline run against a
/// scripted session in tests, without a Chrome install.
///
/// The session is single-consumer and non-reentrant: callers issue one
/// operation at a time, and the underlying tab is released when the session
/// is dropped.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates to `url` and waits for the navigation to finish.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of elements currently matching `selector`.
    async fn count_rows(&self, selector: &str) -> Result<usize>;

    /// Finds the first *visible* element matching `control` and clicks it.
    /// Returns `false` when no visible control matches. Locating and
    /// clicking are one operation here: element handles cannot cross this
    /// trait boundary without tying callers to the engine's lifetimes.
    async fn click_visible(&self, control: &RevealControl) -> Result<bool>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Sleeps for a fixed settle interval, giving asynchronous rendering a
    /// chance to catch up.
    async fn settle(&self, duration: Duration);

    /// Outer HTML of every element matching `selector`, in document order.
    async fn row_html(&self, selector: &str) -> Result<Vec<String>>;
}

/// Production session on a headless Chrome tab.
pub struct ChromeSession {
    // Held so the browser process outlives the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.page_load_timeout));

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn evaluate(&self, expression: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| AppError::Browser(format!("Script evaluation failed: {}", e)))?;
        Ok(result.value)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|_| AppError::Timeout {
                selector: selector.to_string(),
                timeout_secs: timeout.as_secs(),
            })?;
        Ok(())
    }

    async fn count_rows(&self, selector: &str) -> Result<usize> {
        let value = self.evaluate(&count_rows_expression(selector)?)?;
        Ok(value.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }

    async fn click_visible(&self, control: &RevealControl) -> Result<bool> {
        let value = self.evaluate(&click_visible_expression(control)?)?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)")?;
        Ok(())
    }

    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn row_html(&self, selector: &str) -> Result<Vec<String>> {
        let content = self
            .tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))?;

        let document = Html::parse_document(&content);
        let row_selector = Selector::parse(selector).map_err(|e| AppError::Parse {
            message: format!("Invalid row selector '{}': {:?}", selector, e),
        })?;

        Ok(document
            .select(&row_selector)
            .map(|element| element.html())
            .collect())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // The tab must be released on every exit path; the browser process
        // itself is cleaned up by headless_chrome when dropped.
        let _ = self.tab.close(true);
    }
}

fn count_rows_expression(selector: &str) -> Result<String> {
    Ok(format!(
        "document.querySelectorAll({}).length",
        serde_json::to_string(selector)?
    ))
}

fn click_visible_expression(control: &RevealControl) -> Result<String> {
    let selector = serde_json::to_string(control.selector)?;
    let needle = match control.text {
        Some(text) => serde_json::to_string(text)?,
        None => "null".to_string(),
    };

    Ok(format!(
        r#"(function() {{
    const needle = {needle};
    for (const node of document.querySelectorAll({selector})) {{
        if (node.offsetParent === null) continue;
        if (needle !== null && !node.textContent.includes(needle)) continue;
        node.click();
        return true;
    }}
    return false;
}})()"#
    ))
}
