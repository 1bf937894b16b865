//! Cookie helpers for the session and login-transaction cookies.

use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE: &str = "appSession";
pub const TRANSACTION_COOKIE: &str = "__txn";

/// Both cookies must survive the top-level redirect back from the provider
const SAME_SITE: &str = "Lax";

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: &'static str,
    pub secure: bool,
    pub path: &'static str,
    pub max_age_secs: Option<u64>,
}

impl CookieConfig {
    pub fn new(name: &'static str, secure: bool, max_age_secs: u64) -> Self {
        Self {
            name,
            secure,
            path: "/",
            max_age_secs: Some(max_age_secs),
        }
    }

    /// `Set-Cookie` value; always HttpOnly
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut cookie = format!("{}={}; HttpOnly", self.name, value);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}; Path={}", SAME_SITE, self.path));
        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        cookie
    }

    pub fn build_delete_cookie(&self) -> String {
        let mut cookie = format!("{}=; HttpOnly", self.name);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}; Path={}; Max-Age=0", SAME_SITE, self.path));
        cookie
    }
}

/// First cookie called `name` across all `Cookie` headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn builds_session_cookie() {
        let cookie = CookieConfig::new(SESSION_COOKIE, true, 3600).build_set_cookie("abc");
        assert!(cookie.starts_with("appSession=abc; HttpOnly"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn delete_cookie_expires_immediately() {
        let cookie = CookieConfig::new(TRANSACTION_COOKIE, false, 600).build_delete_cookie();
        assert!(cookie.starts_with("__txn=;"));
        assert!(cookie.ends_with("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn extracts_cookie_from_any_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("foo=bar; appSession=1234; other=x"));

        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), Some("1234".to_string()));
        assert_eq!(extract_cookie(&headers, "theme"), Some("dark".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("appSession="));
        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), None);
    }
}
