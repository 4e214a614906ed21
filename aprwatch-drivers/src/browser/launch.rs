use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use webdriver::capabilities::Capabilities;

/// Chromedriver's default listen address.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// How the browser session is started.
pub struct LaunchOptions {
    /// WebDriver endpoint to connect to.
    pub webdriver_url: String,
    /// Run without a visible window.
    pub headless: bool,
    /// Initial window size in CSS pixels.
    pub window: (u32, u32),
    /// Overrides the browser's user agent when set.
    pub user_agent: Option<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            window: (1920, 1080),
            user_agent: None,
        }
    }
}

/// Construct Chrome command-line arguments for the given options.
pub fn build_chrome_arguments(options: &LaunchOptions) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        format!("--window-size={},{}", options.window.0, options.window.1),
    ];
    if let Some(ua) = &options.user_agent {
        args.push(format!("--user-agent={ua}"));
    }
    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// WebDriver capabilities requesting a Chrome session with [`build_chrome_arguments`].
pub fn chrome_capabilities(options: &LaunchOptions) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), Value::from("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": build_chrome_arguments(options) }),
    );
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_adds_headless_flags() {
        let args = build_chrome_arguments(&LaunchOptions::default());
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1920,1080"));
    }

    #[test]
    fn visible_mode_omits_headless() {
        let options = LaunchOptions {
            headless: false,
            user_agent: Some("aprwatch-test".into()),
            ..LaunchOptions::default()
        };
        let args = build_chrome_arguments(&options);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.iter().any(|a| a == "--user-agent=aprwatch-test"));
    }

    #[test]
    fn capabilities_carry_chrome_args() {
        let caps = chrome_capabilities(&LaunchOptions::default());
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--no-sandbox"));
    }
}
