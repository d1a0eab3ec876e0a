//! Browser surface port (driving side of the cookie handoff)
//!
//! An embedded web view, an external browser extension, or a cookie
//! export file: anything that can hand over the cookies it holds for a
//! domain. How those cookies were obtained is out of scope.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because failures are adapter-specific and the
//!   handoff bridge only needs to report them, not classify them.

use crate::domain::cookie::Cookie;

/// Port trait for reading cookies from a browser context
#[async_trait::async_trait]
pub trait IBrowserSurface: Send + Sync {
    /// Returns every cookie the surface holds for `domain` (and its subdomains)
    async fn cookies_for_domain(&self, domain: &str) -> anyhow::Result<Vec<Cookie>>;
}
