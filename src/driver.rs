use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::Path;
use std::sync::Arc;

use crate::config::BrowserConfig;
use crate::utils::error::{AppError, Result};
use crate::utils::retry::{PollPolicy, poll_until};

/// Browser automation primitives the search flow is written against.
///
/// Selectors are CSS. Actions target the first matching element.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;
    async fn select_dropdown(&self, selector: &str, value: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    /// Click the first element matching `selector` whose trimmed text equals `text`.
    async fn click_text(&self, selector: &str, text: &str) -> Result<()>;
    async fn read_text(&self, selector: &str) -> Result<String>;
    async fn read_all_text(&self, selector: &str) -> Result<Vec<String>>;
    async fn is_present(&self, selector: &str) -> Result<bool>;
    /// Current page HTML.
    async fn content(&self) -> Result<String>;
    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn wait_for(&self, selector: &str, policy: PollPolicy) -> Result<()> {
        let step = format!("'{}'", selector);
        poll_until(&step, policy, move || async move {
            Ok(self.is_present(selector).await?.then_some(()))
        })
        .await
    }

    /// Type into an autocomplete field and accept the first suggestion.
    async fn type_into_autocomplete(
        &self,
        field: &str,
        text: &str,
        suggestions: &str,
        policy: PollPolicy,
    ) -> Result<()> {
        self.type_text(field, text).await?;
        self.wait_for(suggestions, policy).await?;
        self.click(suggestions).await
    }
}

/// [`UiDriver`] backed by a single headless Chrome tab.
pub struct ChromeDriver {
    // Keeps the Chrome process alive for as long as the tab is used.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((config.window_width, config.window_height)))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::driver(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::driver(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::driver(format!("Failed to create tab: {}", e)))?;

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| AppError::driver(format!("Failed to set user agent: {}", e)))?;
        }

        tracing::info!("Browser session started");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn evaluate(&self, js: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(js, false)
            .map_err(|e| AppError::driver(format!("Script evaluation failed: {}", e)))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn element_found(&self, selector: &str, found: serde_json::Value) -> Result<()> {
        if found.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(AppError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }
}

#[async_trait]
impl UiDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::driver(format!("Navigation to {} failed: {}", url, e)))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| AppError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element
            .click()
            .and_then(|element| element.type_into(text))
            .map_err(|e| AppError::driver(format!("Typing into {} failed: {}", selector, e)))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let found = self.evaluate(&fill_script(selector, value, &["input", "change"]))?;
        self.element_found(selector, found)
    }

    async fn select_dropdown(&self, selector: &str, value: &str) -> Result<()> {
        let found = self.evaluate(&fill_script(selector, value, &["change"]))?;
        self.element_found(selector, found)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| AppError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element
            .click()
            .map_err(|e| AppError::driver(format!("Click on {} failed: {}", selector, e)))?;
        Ok(())
    }

    async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
        let not_found = || AppError::ElementNotFound {
            selector: format!("{} with text '{}'", selector, text),
        };
        let index = self
            .evaluate(&text_index_script(selector, text))?
            .as_u64()
            .ok_or_else(not_found)?;

        // Real mouse events: some widgets only listen for mousedown.
        let elements = self
            .tab
            .find_elements(selector)
            .map_err(|e| AppError::driver(format!("Finding {} failed: {}", selector, e)))?;
        let element = usize::try_from(index)
            .ok()
            .and_then(|i| elements.get(i))
            .ok_or_else(not_found)?;
        element
            .click()
            .map_err(|e| AppError::driver(format!("Click on {} '{}' failed: {}", selector, text, e)))?;
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        self.read_all_text(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn read_all_text(&self, selector: &str) -> Result<Vec<String>> {
        let value = self.evaluate(&format!(
            "JSON.stringify(Array.from(document.querySelectorAll({})).map(e => e.innerText.trim()))",
            js_string(selector)
        ))?;
        let encoded = value.as_str().unwrap_or("[]");
        Ok(serde_json::from_str(encoded)?)
    }

    async fn is_present(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate(&format!("document.querySelector({}) !== null", js_string(selector)))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| AppError::driver(format!("Failed to get page content: {}", e)))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let data = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| AppError::driver(format!("Screenshot capture failed: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn fill_script(selector: &str, value: &str, events: &[&str]) -> String {
    let dispatch: String = events
        .iter()
        .map(|event| format!("el.dispatchEvent(new Event({}, {{ bubbles: true }}));", js_string(event)))
        .collect();
    format!(
        "(function() {{ const el = document.querySelector({}); if (!el) return false; el.value = {}; {} return true; }})()",
        js_string(selector),
        js_string(value),
        dispatch
    )
}

/// Index of the first match of `selector` whose trimmed text equals `text`, or null.
fn text_index_script(selector: &str, text: &str) -> String {
    format!(
        "(function() {{ const i = Array.from(document.querySelectorAll({})).findIndex(e => e.innerText.trim() === {}); return i < 0 ? null : i; }})()",
        js_string(selector),
        js_string(text)
    )
}
