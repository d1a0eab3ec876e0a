//! Cookie export file as a browser surface
//!
//! Reads the JSON array browser extensions produce when exporting
//! cookies (`[{name, value, domain, path, ...}]`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use relist_core::{domain::Cookie, ports::IBrowserSurface};

pub struct CookieFileSurface {
    path: PathBuf,
}

impl CookieFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl IBrowserSurface for CookieFileSurface {
    async fn cookies_for_domain(&self, domain: &str) -> Result<Vec<Cookie>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let cookies: Vec<Cookie> = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a cookie export", self.path.display()))?;
        Ok(cookies
            .into_iter()
            .filter(|c| c.matches_domain(domain))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_extension_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "un", "value": "closet_queen", "domain": ".poshmark.com", "httpOnly": true},
                {"name": "jwt", "value": "abc", "domain": "poshmark.com", "path": "/", "secure": true},
                {"name": "NID", "value": "x", "domain": ".google.com"}
            ]"#,
        )
        .unwrap();

        let cookies = CookieFileSurface::new(&path)
            .cookies_for_domain("poshmark.com")
            .await
            .unwrap();

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].http_only, Some(true));
        assert_eq!(cookies[1].path, "/");
    }

    #[tokio::test]
    async fn test_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "name=value").unwrap();

        let err = CookieFileSurface::new(&path)
            .cookies_for_domain("poshmark.com")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not a cookie export"));
    }
}
