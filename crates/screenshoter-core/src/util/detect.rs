//! Driver environment detection
//!
//! Builds a [`DriverInfo`] from the capabilities a driver session reports and
//! from the browser user agent. Capability keys are accepted both plain and
//! with the `appium:` vendor prefix.
//!
//! # Examples
//!
//! ```
//! use screenshoter_core::util::detect::parse_capabilities;
//!
//! let info = parse_capabilities(&serde_json::json!({
//!     "platformName": "iOS",
//!     "appium:deviceName": "iPhone SE",
//!     "appium:app": "/apps/Demo.app",
//!     "pixelRatio": 2.0,
//!     "statBarHeight": 40
//! }));
//!
//! assert!(info.is_native && info.is_ios);
//! assert_eq!(info.status_bar_height, 40);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::model::{DriverInfo, Orientation};

const MAJOR_MINOR: &str = r"(\d+)(?:[_.](\d+))?";

/// Ordered platform patterns; the first match wins
static PLATFORM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!("(?:(Windows NT) {MAJOR_MINOR})"),
        "(?:(Windows XP))".to_string(),
        "(?:(Windows 2000))".to_string(),
        "(?:(Windows NT))".to_string(),
        "(?:(Windows))".to_string(),
        format!("(?:(Mac OS X) {MAJOR_MINOR})"),
        format!("(?:(Android) {MAJOR_MINOR})"),
        format!("(?:(CPU(?: i[a-zA-Z]+)? OS) {MAJOR_MINOR})"),
        "(?:(Mac OS X))".to_string(),
        "(?:(Mac_PowerPC))".to_string(),
        "(?:(Linux))".to_string(),
        "(?:(CrOS))".to_string(),
        "(?:(SymbOS))".to_string(),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Ordered browser patterns; the first match wins
static BROWSER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["Opera", "Edg", "Edge", "Chrome", "Safari", "Firefox"]
        .iter()
        .map(|name| format!("(?:({name})/{MAJOR_MINOR})"))
        .chain(std::iter::once(format!("(?:MS(IE) {MAJOR_MINOR})")))
        .filter_map(|pattern| Regex::new(&pattern).ok())
        .collect()
});

static HIDDEN_IE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!(r"(?:rv:{MAJOR_MINOR}\) like Gecko)")).ok());

static BROWSER_VERSION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!("(?:Version/{MAJOR_MINOR})")).ok());

/// Platform and browser facts extracted from a user agent string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    /// Normalized OS name (`Windows`, `Mac OS X`, `iOS`, `Android`, ...)
    pub platform_name:    String,
    /// OS major version
    pub platform_version: Option<String>,
    /// Normalized browser name
    pub browser_name:     String,
    /// Browser major version
    pub browser_version:  Option<String>,
}

/// Parses a browser user agent
///
/// Unrecognized platforms and browsers are reported as `Unknown`.
///
/// # Examples
///
/// ```
/// use screenshoter_core::util::detect::parse_user_agent;
///
/// let info = parse_user_agent(
///     "Mozilla/5.0 (iPhone; CPU iPhone OS 14_4 like Mac OS X) AppleWebKit/605.1.15 \
///      (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1",
/// );
/// assert_eq!(info.platform_name, "iOS");
/// assert_eq!(info.platform_version.as_deref(), Some("14"));
/// assert_eq!(info.browser_name, "Safari");
/// assert_eq!(info.browser_version.as_deref(), Some("14"));
/// ```
pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let user_agent = user_agent.trim();
    let (platform_name, platform_version) = parse_platform(user_agent);
    let (browser_name, browser_version) = parse_browser(user_agent);
    UserAgentInfo {
        platform_name,
        platform_version,
        browser_name,
        browser_version,
    }
}

fn parse_platform(user_agent: &str) -> (String, Option<String>) {
    let Some(captures) = PLATFORM_PATTERNS.iter().find_map(|re| re.captures(user_agent)) else {
        return ("Unknown".to_string(), None);
    };

    let name = captures.get(1).map_or("", |m| m.as_str());
    let major = captures.get(2).map(|m| m.as_str().to_string());
    let minor = captures.get(3).map(|m| m.as_str());

    match name {
        n if n.starts_with("CPU") => ("iOS".to_string(), major),
        "Windows 2000" | "Windows XP" => ("Windows".to_string(), Some("5".to_string())),
        "Windows NT" => {
            let version = match (major.as_deref(), minor) {
                (None, _) => "4".to_string(),
                (Some("6"), Some("1")) => "7".to_string(),
                (Some("6"), Some("2" | "3")) => "8".to_string(),
                (Some(major), _) => major.to_string(),
            };
            ("Windows".to_string(), Some(version))
        }
        "Mac_PowerPC" => ("Macintosh".to_string(), major),
        "CrOS" => ("Chrome OS".to_string(), major),
        other => (other.to_string(), major),
    }
}

fn parse_browser(user_agent: &str) -> (String, Option<String>) {
    let Some(captures) = BROWSER_PATTERNS.iter().find_map(|re| re.captures(user_agent)) else {
        if let Some(captures) = HIDDEN_IE.as_ref().and_then(|re| re.captures(user_agent)) {
            return ("IE".to_string(), captures.get(1).map(|m| m.as_str().to_string()));
        }
        return ("Unknown".to_string(), None);
    };

    let name = match captures.get(1).map_or("", |m| m.as_str()) {
        "Edg" => "Edge",
        other => other,
    };
    let version = BROWSER_VERSION
        .as_ref()
        .and_then(|re| re.captures(user_agent))
        .and_then(|c| c.get(1))
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string());

    (name.to_string(), version)
}

/// Looks up a capability, falling back to its `appium:` prefixed form
fn capability<'a>(capabilities: &'a Value, key: &str) -> Option<&'a Value> {
    capabilities
        .get(key)
        .or_else(|| capabilities.get(format!("appium:{key}")))
        .filter(|value| !value.is_null())
}

fn capability_str<'a>(capabilities: &'a Value, key: &str) -> Option<&'a str> {
    capability(capabilities, key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn capability_string(capabilities: &Value, key: &str) -> Option<String> {
    match capability(capabilities, key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn is_appium(capabilities: &Value) -> bool {
    ["automationName", "deviceName", "appiumVersion"]
        .iter()
        .any(|key| capabilities.get(key).is_some())
        || capabilities
            .as_object()
            .is_some_and(|map| map.keys().any(|key| key.starts_with("appium:")))
}

/// Builds driver facts from session capabilities
///
/// A session is native when it is mobile and reports no browser name, which
/// is the case whenever an `app`, `bundleId` or `appPackage` capability is
/// present. Pixel ratio and status bar height are only trusted for native
/// sessions; web sessions measure them through the page instead.
pub fn parse_capabilities(capabilities: &Value) -> DriverInfo {
    let has_app = ["app", "bundleId", "appPackage"]
        .iter()
        .any(|key| capability(capabilities, key).is_some());

    let raw_browser = capability_str(capabilities, "browserName");
    let browser_name = if has_app {
        None
    } else {
        raw_browser.map(str::to_string)
    };
    let platform_name = capability_string(capabilities, "platformName")
        .or_else(|| capability_string(capabilities, "platform"));
    let device_name = capability_string(capabilities, "deviceName");

    let is_mobile = capabilities.get("browserName").and_then(Value::as_str) == Some("")
        || raw_browser.is_some_and(|name| {
            ["ipad", "iphone", "android"].contains(&name.to_lowercase().as_str())
        })
        || is_appium(capabilities);

    let mut info = DriverInfo {
        browser_version: capability_string(capabilities, "browserVersion")
            .or_else(|| capability_string(capabilities, "version")),
        platform_version: capability_string(capabilities, "platformVersion"),
        is_mobile,
        ..DriverInfo::default()
    };

    if is_mobile {
        let platform = platform_name.as_deref().unwrap_or("").to_lowercase();
        let device = device_name.as_deref().unwrap_or("").to_lowercase();
        info.is_native = browser_name.is_none();
        info.is_ios = platform.contains("ios") || device.contains("iphone") || device.contains("ipad");
        info.is_android = platform.contains("android")
            || raw_browser.is_some_and(|name| name.to_lowercase().contains("android"));
        info.device_name = device_name;
        info.orientation = match capability_str(capabilities, "orientation") {
            Some(value) if value.eq_ignore_ascii_case("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        };
    }

    if info.is_native {
        if let Some(ratio) = capability(capabilities, "pixelRatio").and_then(Value::as_f64) {
            info.pixel_ratio = ratio;
        }
        info.status_bar_height = capability(capabilities, "statBarHeight")
            .and_then(Value::as_u64)
            .map_or(0, |height| height as u32);
    }

    info.browser_name = browser_name;
    info.platform_name = platform_name;

    tracing::debug!(
        "Parsed capabilities: native={} mobile={} ios={} android={} ratio={}",
        info.is_native,
        info.is_mobile,
        info.is_ios,
        info.is_android,
        info.pixel_ratio
    );
    info
}

impl DriverInfo {
    /// Fills browser and platform fields left empty by the capabilities
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        let parsed = parse_user_agent(user_agent);
        let known = |value: String| (value != "Unknown").then_some(value);

        if self.browser_name.is_none() {
            self.browser_name = known(parsed.browser_name);
            self.browser_version = self.browser_version.or(parsed.browser_version);
        }
        if self.platform_name.is_none() {
            self.platform_name = known(parsed.platform_name);
            self.platform_version = self.platform_version.or(parsed.platform_version);
        }
        let platform = self.platform_name.as_deref().unwrap_or("");
        self.is_ios |= platform == "iOS";
        self.is_android |= platform == "Android";
        self.is_mobile |= self.is_ios || self.is_android;
        self.user_agent = Some(user_agent.to_string());
        self
    }
}
