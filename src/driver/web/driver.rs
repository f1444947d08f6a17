//! Web backend using Playwright
//!
//! Maps [`Locator`]s onto Playwright selector strings and forwards the facade
//! calls to a single browser page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::driver::traits::{keycode, Actor, TouchAction};
use crate::locator::query::css_escape;
use crate::locator::{xpath, Locator};

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" | "safari" => Ok(Self::Webkit),
            other => anyhow::bail!("Unknown browser: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    /// Prefix for relative paths given to `open`
    pub base_url: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound for implicit element waits, in milliseconds
    pub action_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            browser_type: BrowserType::Chromium,
            headless: true,
            base_url: None,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 10_000,
        }
    }
}

pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

impl WebDriver {
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => launch_chromium_browser(&playwright.chromium(), &config).await?,
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        log::info!(
            "Web backend ready ({:?}, headless: {})",
            config.browser_type,
            config.headless
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(ref base) = self.config.base_url {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        } else {
            url.to_string()
        }
    }

    /// First candidate selector that currently matches an element
    async fn first_match(&self, candidates: &[String]) -> Result<Option<String>> {
        let page = self.page.lock().await;
        for sel in candidates {
            if page.query_selector(sel).await?.is_some() {
                return Ok(Some(sel.clone()));
            }
        }
        Ok(None)
    }

    /// Resolve a locator to a selector, waiting up to the action timeout for
    /// one of its candidates to appear
    async fn resolve(&self, candidates: Vec<String>, locator: &Locator) -> Result<String> {
        let deadline = std::time::Instant::now() + Duration::from_millis(self.config.action_timeout_ms);
        loop {
            if let Some(sel) = self.first_match(&candidates).await? {
                return Ok(sel);
            }
            if std::time::Instant::now() >= deadline {
                anyhow::bail!("Element not found: {}", locator);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.keyboard.down(key).await?;
        page.keyboard.up(key).await?;
        Ok(())
    }
}

/// Playwright selector for a locator. Semantic locators resolve to visible text.
pub fn locator_to_playwright(locator: &Locator) -> String {
    match locator {
        Locator::Semantic(text) => format!("text=\"{}\"", css_escape(text)),
        Locator::Css(css) => css.clone(),
        Locator::XPath(x) => format!("xpath={}", x),
        Locator::Id(id) => format!("[id=\"{}\"]", css_escape(id)),
        Locator::AccessibilityId(id) => format!("[aria-label=\"{}\"]", css_escape(id)),
        Locator::Query(q) => q
            .to_css()
            .unwrap_or_else(|| format!("xpath={}", q.to_xpath())),
    }
}

/// Candidate selectors for a form field, tried in order
fn field_candidates(locator: &Locator) -> Vec<String> {
    match locator {
        Locator::Semantic(label) => {
            let quoted = css_escape(label);
            let lit = xpath::literal(label);
            vec![
                format!("[placeholder=\"{}\"]", quoted),
                format!(
                    "xpath=//*[@id=//label[normalize-space(.)={}]/@for]",
                    lit
                ),
                format!("xpath=//label[normalize-space(.)={}]//*[self::input or self::textarea or self::select]", lit),
                format!("[name=\"{}\"]", quoted),
                format!("[aria-label=\"{}\"]", quoted),
            ]
        }
        other => vec![locator_to_playwright(other)],
    }
}

/// Candidate selectors for a checkbox or radio option
fn option_candidates(locator: &Locator) -> Vec<String> {
    match locator {
        Locator::Semantic(label) => {
            let lit = xpath::literal(label);
            vec![
                format!("xpath=//label[normalize-space(.)={}]//input", lit),
                format!("xpath=//*[@id=//label[normalize-space(.)={}]/@for]", lit),
                format!("[aria-label=\"{}\"]", css_escape(label)),
                locator_to_playwright(locator),
            ]
        }
        other => vec![locator_to_playwright(other)],
    }
}

fn scoped(selector: String, context: Option<&Locator>) -> String {
    match context {
        Some(ctx) => format!("{} >> {}", locator_to_playwright(ctx), selector),
        None => selector,
    }
}

#[async_trait]
impl Actor for WebDriver {
    fn backend_name(&self) -> &str {
        "web"
    }

    async fn open(&self, url: &str) -> Result<()> {
        let full_url = self.full_url(url);
        log::debug!("Navigating to {}", full_url);
        let page = self.page.lock().await;
        page.goto_builder(&full_url)
            .goto()
            .await
            .context("Failed to navigate to URL")?;
        Ok(())
    }

    async fn fill_field(&self, locator: &Locator, value: &str) -> Result<()> {
        let sel = self.resolve(field_candidates(locator), locator).await?;
        let page = self.page.lock().await;
        let el = page
            .query_selector(&sel)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Element not found: {}", locator))?;
        el.fill_builder(value).fill().await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, context: Option<&Locator>) -> Result<()> {
        let sel = scoped(locator_to_playwright(locator), context);
        let page = self.page.lock().await;
        page.click_builder(&sel)
            .timeout(self.config.action_timeout_ms as f64)
            .click()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to click: {}. Error: {:?}", sel, e))?;
        Ok(())
    }

    async fn check_option(&self, locator: &Locator) -> Result<()> {
        let sel = self.resolve(option_candidates(locator), locator).await?;
        let page = self.page.lock().await;
        page.check_builder(&sel).check().await?;
        Ok(())
    }

    async fn see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        let sel = scoped(format!("text=\"{}\"", css_escape(text)), context);
        let page = self.page.lock().await;
        page.wait_for_selector_builder(&sel)
            .timeout(self.config.action_timeout_ms as f64)
            .wait_for_selector()
            .await
            .map_err(|_| anyhow::anyhow!("Text \"{}\" is not visible", text))?;
        Ok(())
    }

    async fn dont_see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        let sel = scoped(format!("text=\"{}\"", css_escape(text)), context);
        let page = self.page.lock().await;
        for el in page.query_selector_all(&sel).await? {
            if el.is_visible().await? {
                anyhow::bail!("Text \"{}\" is visible but should not be", text);
            }
        }
        Ok(())
    }

    async fn wait_for_element(&self, locator: &Locator, seconds: u64) -> Result<()> {
        let sel = locator_to_playwright(locator);
        let page = self.page.lock().await;
        page.wait_for_selector_builder(&sel)
            .timeout((seconds * 1000) as f64)
            .wait_for_selector()
            .await
            .map_err(|_| anyhow::anyhow!("Element {} not found after {} sec", locator, seconds))?;
        Ok(())
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        Ok(())
    }

    async fn tap(&self, locator: &Locator) -> Result<()> {
        self.click(locator, None).await
    }

    async fn touch_perform(&self, actions: &[TouchAction]) -> Result<()> {
        let page = self.page.lock().await;
        for action in actions {
            match *action {
                TouchAction::Press { x, y } => {
                    page.mouse.r#move(x as f64, y as f64, None).await?;
                    page.mouse.down(None, None).await?;
                }
                TouchAction::MoveTo { x, y } => {
                    page.mouse.r#move(x as f64, y as f64, Some(10)).await?;
                }
                TouchAction::Wait { ms } => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                TouchAction::Release => {
                    page.mouse.up(None, None).await?;
                }
                TouchAction::Tap { x, y } => {
                    page.mouse.r#move(x as f64, y as f64, None).await?;
                    page.mouse.down(None, None).await?;
                    page.mouse.up(None, None).await?;
                }
            }
        }
        Ok(())
    }

    async fn send_device_key_event(&self, code: u32) -> Result<()> {
        match code {
            keycode::ENTER => self.press_key("Enter").await,
            keycode::BACK => {
                let page = self.page.lock().await;
                page.evaluate::<_, ()>("() => history.back()", ()).await?;
                Ok(())
            }
            other => anyhow::bail!("Key code {} has no browser equivalent", other),
        }
    }

    async fn grab_number_of_visible_elements(&self, locator: &Locator) -> Result<usize> {
        let sel = locator_to_playwright(locator);
        let page = self.page.lock().await;
        let mut count = 0;
        for el in page.query_selector_all(&sel).await? {
            if el.is_visible().await? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn grab_text_from_all(&self, locator: &Locator) -> Result<Vec<String>> {
        let sel = locator_to_playwright(locator);
        let page = self.page.lock().await;
        let mut texts = Vec::new();
        for el in page.query_selector_all(&sel).await? {
            texts.push(el.inner_text().await?);
        }
        Ok(texts)
    }

    async fn report(&self, message: &str) -> Result<()> {
        println!("    {} {}", "ℹ".blue(), message);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Launch Chromium, preferring an explicit or system-installed browser
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let browser_path =
        browser_executable(std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH").ok());
    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut launcher = chromium.launcher().headless(config.headless).args(&args);
    match browser_path {
        Some(ref path) => {
            println!("{} Using browser: {}", "🌐".blue(), path.display());
            launcher = launcher.executable(path);
        }
        None => log::debug!("No browser executable found, using the Playwright default"),
    }

    Ok(launcher.launch().await?)
}

/// An explicit executable path wins over a system install
fn browser_executable(explicit: Option<String>) -> Option<std::path::PathBuf> {
    explicit
        .filter(|p| !p.trim().is_empty())
        .map(std::path::PathBuf::from)
        .or_else(find_system_browser)
}

fn find_system_browser() -> Option<std::path::PathBuf> {
    let common_paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    common_paths
        .iter()
        .map(std::path::Path::new)
        .find(|p| p.exists())
        .map(|p| p.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Query;

    #[test]
    fn test_locator_to_playwright() {
        assert_eq!(
            locator_to_playwright(&Locator::semantic("Save")),
            "text=\"Save\""
        );
        assert_eq!(locator_to_playwright(&Locator::id("main")), "[id=\"main\"]");
        assert_eq!(
            locator_to_playwright(&Locator::xpath("//span")),
            "xpath=//span"
        );

        let css_able: Locator = Query::by_tag("textarea")
            .with_attr("placeholder", "Notes")
            .into();
        assert_eq!(
            locator_to_playwright(&css_able),
            "textarea[placeholder=\"Notes\"]"
        );

        let positioned: Locator = Query::by_tag("input")
            .with_attr("placeholder", "Email")
            .at(2)
            .into();
        assert_eq!(
            locator_to_playwright(&positioned),
            "xpath=(//input[@placeholder=\"Email\"])[2]"
        );
    }

    #[test]
    fn test_semantic_field_tries_placeholder_first() {
        let candidates = field_candidates(&Locator::semantic("Email"));
        assert_eq!(candidates[0], "[placeholder=\"Email\"]");
        assert!(candidates.iter().any(|c| c == "[name=\"Email\"]"));
    }

    #[test]
    fn test_scoped_selector() {
        let ctx = Locator::css(".sidebar");
        assert_eq!(
            scoped("text=\"Home\"".to_string(), Some(&ctx)),
            ".sidebar >> text=\"Home\""
        );
    }

    #[test]
    fn test_browser_type_from_str() {
        assert_eq!("Firefox".parse::<BrowserType>().unwrap(), BrowserType::Firefox);
        assert!("lynx".parse::<BrowserType>().is_err());
    }

    #[test]
    fn test_explicit_browser_path_wins() {
        assert_eq!(
            browser_executable(Some("/opt/chrome/chrome".to_string())),
            Some(std::path::PathBuf::from("/opt/chrome/chrome"))
        );
        assert_eq!(browser_executable(Some("  ".to_string())), find_system_browser());
        assert_eq!(browser_executable(None), find_system_browser());
    }
}
