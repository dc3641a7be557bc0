//! User-agent classification via ordered substring rules
//!
//! Pure and total: every input maps to exactly one label per dimension.
//! Rule order is significant. Chromium-derived browsers all carry a
//! `chrome/` token, so Edge and Opera must match before Chrome and the
//! Chrome rule excludes their markers.

/// Categorical labels derived from a raw user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UaClassification {
    pub device_type: &'static str,
    pub browser_name: &'static str,
    pub os_name: &'static str,
}

struct UaRule {
    label: &'static str,
    /// Matches when any of these substrings is present...
    any: &'static [&'static str],
    /// ...and none of these are.
    none: &'static [&'static str],
}

impl UaRule {
    fn matches(&self, ua: &str) -> bool {
        self.any.iter().any(|needle| ua.contains(needle))
            && !self.none.iter().any(|needle| ua.contains(needle))
    }
}

const DEVICE_RULES: &[UaRule] = &[
    UaRule {
        label: "bot",
        any: &["bot", "spider", "crawler"],
        none: &[],
    },
    UaRule {
        label: "mobile",
        any: &["android", "iphone", "ipad", "ipod", "mobile"],
        none: &[],
    },
];

const OS_RULES: &[UaRule] = &[
    UaRule {
        label: "windows",
        any: &["windows"],
        none: &[],
    },
    UaRule {
        label: "macos",
        // iPhone/iPad agents carry "like Mac OS X"; they are not macOS.
        any: &["mac os x", "macintosh"],
        none: &["iphone", "ipad", "ipod"],
    },
    UaRule {
        label: "android",
        any: &["android"],
        none: &[],
    },
    UaRule {
        label: "ios",
        any: &["iphone", "ipad", "ipod"],
        none: &[],
    },
    UaRule {
        label: "linux",
        any: &["linux"],
        none: &[],
    },
];

const BROWSER_RULES: &[UaRule] = &[
    UaRule {
        label: "edge",
        any: &["edg/"],
        none: &[],
    },
    UaRule {
        label: "chrome",
        any: &["chrome/"],
        none: &["edg/", "opr/"],
    },
    UaRule {
        label: "safari",
        any: &["safari/"],
        none: &["chrome/", "chromium/"],
    },
    UaRule {
        label: "firefox",
        any: &["firefox/"],
        none: &[],
    },
    UaRule {
        label: "opera",
        any: &["opr/", "opera/"],
        none: &[],
    },
];

fn first_match(rules: &[UaRule], ua: &str, fallback: &'static str) -> &'static str {
    rules
        .iter()
        .find(|rule| rule.matches(ua))
        .map(|rule| rule.label)
        .unwrap_or(fallback)
}

/// Classify a raw user-agent string. Empty input yields `unknown` for every
/// dimension; non-empty but unrecognized input falls through to each
/// dimension's fallback (`desktop` / `other` / `other`).
pub fn classify_user_agent(user_agent: &str) -> UaClassification {
    let ua = user_agent.to_lowercase();

    if ua.is_empty() {
        return UaClassification {
            device_type: "unknown",
            browser_name: "unknown",
            os_name: "unknown",
        };
    }

    UaClassification {
        device_type: first_match(DEVICE_RULES, &ua, "desktop"),
        browser_name: first_match(BROWSER_RULES, &ua, "other"),
        os_name: first_match(OS_RULES, &ua, "other"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const OPERA_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_empty_is_unknown() {
        let ua = classify_user_agent("");
        assert_eq!(ua.device_type, "unknown");
        assert_eq!(ua.browser_name, "unknown");
        assert_eq!(ua.os_name, "unknown");
    }

    #[test]
    fn test_chrome_on_windows() {
        let ua = classify_user_agent(CHROME_WINDOWS);
        assert_eq!(ua.device_type, "desktop");
        assert_eq!(ua.browser_name, "chrome");
        assert_eq!(ua.os_name, "windows");
    }

    #[test]
    fn test_edge_wins_over_chrome() {
        // Edge user agents also carry a chrome/ token; rule order decides.
        let ua = classify_user_agent(EDGE_WINDOWS);
        assert_eq!(ua.browser_name, "edge");
    }

    #[test]
    fn test_opera_not_classified_as_chrome() {
        let ua = classify_user_agent(OPERA_MAC);
        assert_eq!(ua.browser_name, "opera");
        assert_eq!(ua.os_name, "macos");
    }

    #[test]
    fn test_safari_excludes_chrome() {
        // Chrome carries safari/ too; the safari rule must not claim it.
        assert_eq!(classify_user_agent(CHROME_WINDOWS).browser_name, "chrome");

        let ua = classify_user_agent(SAFARI_IPHONE);
        assert_eq!(ua.browser_name, "safari");
        assert_eq!(ua.device_type, "mobile");
        assert_eq!(ua.os_name, "ios");
    }

    #[test]
    fn test_iphone_is_ios_despite_mac_os_x_token() {
        assert_eq!(classify_user_agent(SAFARI_IPHONE).os_name, "ios");

        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
        assert_eq!(classify_user_agent(ipad).os_name, "ios");
    }

    #[test]
    fn test_firefox_on_linux() {
        let ua = classify_user_agent(FIREFOX_LINUX);
        assert_eq!(ua.browser_name, "firefox");
        assert_eq!(ua.os_name, "linux");
        assert_eq!(ua.device_type, "desktop");
    }

    #[test]
    fn test_bot_wins_over_device() {
        let ua = classify_user_agent(GOOGLEBOT);
        assert_eq!(ua.device_type, "bot");
    }

    #[test]
    fn test_total_on_unrecognized_input() {
        let ua = classify_user_agent("curl/8.4.0");
        assert_eq!(ua.device_type, "desktop");
        assert_eq!(ua.browser_name, "other");
        assert_eq!(ua.os_name, "other");
    }

    #[test]
    fn test_case_insensitive() {
        let ua = classify_user_agent("MOZILLA/5.0 (WINDOWS NT 10.0) CHROME/120.0 SAFARI/537.36");
        assert_eq!(ua.browser_name, "chrome");
        assert_eq!(ua.os_name, "windows");
    }
}
