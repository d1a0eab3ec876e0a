//! Browser cookie types used by the session handoff
//!
//! Cookies are carried in the shape browser extensions export them
//! (`name`, `value`, `domain`, `path`, `secure`, `httpOnly`, `sameSite`,
//! `expirationDate`). The client never inspects values; the backend is
//! the only judge of whether a set represents a live session.

use serde::{Deserialize, Serialize};

/// Cookie names the marketplace uses for the logged-in username
const USERNAME_COOKIES: &[&str] = &["un", "username"];

/// A single browser cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    /// Seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            secure: None,
            http_only: None,
            same_site: None,
            expiration_date: None,
        }
    }

    /// Returns true if this cookie is scoped to `domain` or one of its subdomains
    ///
    /// Leading dots (`.poshmark.com`) are ignored, matching browser behavior.
    pub fn matches_domain(&self, domain: &str) -> bool {
        let own = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let target = domain.trim_start_matches('.').to_ascii_lowercase();
        if own.is_empty() || target.is_empty() {
            return false;
        }
        own == target || own.ends_with(&format!(".{target}"))
    }
}

/// Ordered collection of cookies forwarded as one handoff payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet(Vec<Cookie>);

impl CookieSet {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self(cookies)
    }

    /// Keeps only the cookies scoped to `domain`, preserving order
    pub fn for_domain(cookies: impl IntoIterator<Item = Cookie>, domain: &str) -> Self {
        Self(
            cookies
                .into_iter()
                .filter(|c| c.matches_domain(domain))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Cookie] {
        &self.0
    }

    /// Marketplace username carried in the session cookies, if any
    pub fn username(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|c| USERNAME_COOKIES.contains(&c.name.as_str()))
            .map(|c| c.value.as_str())
            .filter(|v| !v.is_empty())
    }
}

impl From<Vec<Cookie>> for CookieSet {
    fn from(cookies: Vec<Cookie>) -> Self {
        Self(cookies)
    }
}

impl IntoIterator for CookieSet {
    type Item = Cookie;
    type IntoIter = std::vec::IntoIter<Cookie>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_format_deserialization() {
        let json = r#"[{
            "name": "_session",
            "value": "abc",
            "domain": ".poshmark.com",
            "path": "/",
            "secure": true,
            "httpOnly": true,
            "sameSite": "lax",
            "expirationDate": 1767225600.5
        }, {
            "name": "un",
            "value": "closet_queen"
        }]"#;

        let set: CookieSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        let first = &set.as_slice()[0];
        assert_eq!(first.http_only, Some(true));
        assert_eq!(first.same_site.as_deref(), Some("lax"));
        assert_eq!(set.as_slice()[1].path, "/");
    }

    #[test]
    fn test_serialization_skips_absent_optionals() {
        let cookie = Cookie::new("jwt", "t", "poshmark.com");
        let value = serde_json::to_value(&cookie).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "jwt", "value": "t", "domain": "poshmark.com", "path": "/"})
        );
    }

    #[test]
    fn test_matches_domain() {
        assert!(Cookie::new("a", "1", ".poshmark.com").matches_domain("poshmark.com"));
        assert!(Cookie::new("a", "1", "www.poshmark.com").matches_domain("poshmark.com"));
        assert!(Cookie::new("a", "1", "POSHMARK.com").matches_domain("poshmark.com"));
        assert!(!Cookie::new("a", "1", "notposhmark.com").matches_domain("poshmark.com"));
        assert!(!Cookie::new("a", "1", "ebay.com").matches_domain("poshmark.com"));
        assert!(!Cookie::new("a", "1", "").matches_domain("poshmark.com"));
    }

    #[test]
    fn test_for_domain_preserves_order() {
        let set = CookieSet::for_domain(
            vec![
                Cookie::new("z", "1", ".poshmark.com"),
                Cookie::new("tracker", "1", ".doubleclick.net"),
                Cookie::new("a", "2", "poshmark.com"),
            ],
            "poshmark.com",
        );
        let names: Vec<_> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn test_username_lookup() {
        let set = CookieSet::new(vec![
            Cookie::new("_session", "x", "poshmark.com"),
            Cookie::new("username", "closet_queen", "poshmark.com"),
        ]);
        assert_eq!(set.username(), Some("closet_queen"));

        let empty = CookieSet::new(vec![Cookie::new("un", "", "poshmark.com")]);
        assert_eq!(empty.username(), None);
    }
}
