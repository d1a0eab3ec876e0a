//! Cookie handoff bridge - moves a logged-in browser session to the backend
//!
//! The user logs into the marketplace in a browser context the client
//! can read cookies from. The bridge watches navigations, decides when
//! the login has completed, extracts the marketplace cookies, and posts
//! them once, either against a pairing code or to the authenticated
//! direct connect endpoint.
//!
//! ## Flow
//!
//! ```text
//! navigation ──→ LoginDetector ──→ extract cookies ──→ forward ──→ handled
//!                                        │
//!                              too few? skip (auto) / error (manual)
//! ```
//!
//! Cookie values are never inspected; the backend decides whether a set
//! is a live session.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use relist_core::{
    config::HandoffConfig,
    domain::{cookie::CookieSet, errors::ApiError, newtypes::PairingCode},
    ports::{IBrowserSurface, IMarketplaceConnector, IPairingService},
};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Login detection
// ============================================================================

/// Decides from a navigated URL whether the user finished logging in
pub trait LoginDetector: Send + Sync {
    fn is_logged_in(&self, url: &str) -> bool;
}

/// Default detector: marketplace host, allow-listed post-login path, and
/// no login segment anywhere in the URL
#[derive(Debug, Clone)]
pub struct UrlAllowListDetector {
    domain: String,
    post_login_paths: Vec<String>,
    login_markers: Vec<String>,
}

impl UrlAllowListDetector {
    pub fn new(
        domain: impl Into<String>,
        post_login_paths: Vec<String>,
        login_markers: Vec<String>,
    ) -> Self {
        Self {
            domain: domain.into().trim_start_matches('.').to_ascii_lowercase(),
            post_login_paths,
            login_markers,
        }
    }

    pub fn from_config(config: &HandoffConfig) -> Self {
        Self::new(
            config.marketplace_domain.clone(),
            config.post_login_paths.clone(),
            config.login_markers.clone(),
        )
    }

    fn host_matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }
}

impl LoginDetector for UrlAllowListDetector {
    fn is_logged_in(&self, raw: &str) -> bool {
        let url = match url::Url::parse(raw) {
            Ok(url) => url,
            Err(_) => return false,
        };
        let host_ok = url.host_str().is_some_and(|h| self.host_matches(h));
        let path_ok = self
            .post_login_paths
            .iter()
            .any(|prefix| url.path().starts_with(prefix.as_str()));
        let on_login = self
            .login_markers
            .iter()
            .any(|marker| raw.contains(marker.as_str()));

        host_ok && path_ok && !on_login
    }
}

// ============================================================================
// Errors and outcomes
// ============================================================================

/// Failure of a handoff attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// The cookies never reached the backend
    #[error("Network error: {0}")]
    Network(String),

    /// The backend refused the cookies or the pairing code
    #[error("Rejected: {0}")]
    Rejected(String),

    /// No usable Relist login for a direct connect
    #[error("Not logged in to Relist: {0}")]
    Unauthorized(String),

    /// Too few marketplace cookies; the user is probably not logged in
    #[error("Found {found} cookies, need at least {required}. Please log in first.")]
    InsufficientCookies { found: usize, required: usize },

    /// The browser surface could not be read
    #[error("Could not read browser cookies: {0}")]
    Browser(String),
}

impl From<ApiError> for HandoffError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => HandoffError::Network(msg),
            ApiError::Auth(msg) => HandoffError::Unauthorized(msg),
            other => HandoffError::Rejected(other.message()),
        }
    }
}

/// Why an attempt ended without contacting the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The URL is not a post-login page
    NotLoggedIn,
    /// A previous handoff succeeded and the bridge was not reset
    AlreadyHandled,
    /// Another extraction is running
    InFlight,
    /// Automatic trigger with too few cookies
    InsufficientCookies { found: usize },
}

/// Result of a handoff attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffOutcome {
    Delivered {
        cookies: usize,
        username: Option<String>,
    },
    Skipped(SkipReason),
}

/// Where extracted cookies are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffDestination {
    /// Anonymous sync against a pairing code
    Pairing {
        code: PairingCode,
        /// Overrides the username found in the cookies
        username: Option<String>,
    },
    /// Authenticated direct connect
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Automatic,
    Manual,
}

/// Clears the in-flight flag when an extraction ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// CookieHandoffBridge
// ============================================================================

/// Extracts marketplace cookies from a browser surface and forwards them
pub struct CookieHandoffBridge {
    browser: Arc<dyn IBrowserSurface>,
    pairing: Arc<dyn IPairingService>,
    marketplace: Arc<dyn IMarketplaceConnector>,
    detector: Box<dyn LoginDetector>,
    destination: HandoffDestination,
    domain: String,
    min_cookies: usize,
    in_flight: AtomicBool,
    handled: AtomicBool,
}

impl CookieHandoffBridge {
    /// Creates a bridge using the [`UrlAllowListDetector`] from `config`
    pub fn new(
        config: &HandoffConfig,
        browser: Arc<dyn IBrowserSurface>,
        pairing: Arc<dyn IPairingService>,
        marketplace: Arc<dyn IMarketplaceConnector>,
        destination: HandoffDestination,
    ) -> Self {
        Self {
            browser,
            pairing,
            marketplace,
            detector: Box::new(UrlAllowListDetector::from_config(config)),
            destination,
            domain: config.marketplace_domain.clone(),
            min_cookies: config.min_cookies,
            in_flight: AtomicBool::new(false),
            handled: AtomicBool::new(false),
        }
    }

    /// Replaces the login predicate
    pub fn with_detector(mut self, detector: Box<dyn LoginDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn destination(&self) -> &HandoffDestination {
        &self.destination
    }

    /// Whether a handoff already succeeded since creation or the last reset
    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Re-arms automatic detection
    pub fn reset(&self) {
        debug!("Handoff bridge reset");
        self.handled.store(false, Ordering::Release);
    }

    /// Reacts to a navigation in the browser surface
    ///
    /// Extracts and forwards at most once per detected login. Too few
    /// cookies is a silent skip here, not an error.
    pub async fn on_navigation(&self, url: &str) -> Result<HandoffOutcome, HandoffError> {
        if self.is_handled() {
            return Ok(HandoffOutcome::Skipped(SkipReason::AlreadyHandled));
        }
        if !self.detector.is_logged_in(url) {
            return Ok(HandoffOutcome::Skipped(SkipReason::NotLoggedIn));
        }
        debug!(url, "Post-login navigation detected");
        self.extract_and_forward(Trigger::Automatic).await
    }

    /// User-initiated save; always available
    ///
    /// # Errors
    /// `HandoffError::InsufficientCookies` when fewer than the configured
    /// minimum are present, plus the network and rejection failures.
    pub async fn save(&self) -> Result<HandoffOutcome, HandoffError> {
        self.extract_and_forward(Trigger::Manual).await
    }

    async fn extract_and_forward(&self, trigger: Trigger) -> Result<HandoffOutcome, HandoffError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(?trigger, "Extraction already in flight, dropping attempt");
            return Ok(HandoffOutcome::Skipped(SkipReason::InFlight));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let all = self
            .browser
            .cookies_for_domain(&self.domain)
            .await
            .map_err(|e| HandoffError::Browser(format!("{e:#}")))?;
        let cookies = CookieSet::for_domain(all, &self.domain);

        if cookies.len() < self.min_cookies {
            return match trigger {
                Trigger::Automatic => {
                    debug!(found = cookies.len(), "Too few cookies, skipping automatic handoff");
                    Ok(HandoffOutcome::Skipped(SkipReason::InsufficientCookies {
                        found: cookies.len(),
                    }))
                }
                Trigger::Manual => Err(HandoffError::InsufficientCookies {
                    found: cookies.len(),
                    required: self.min_cookies,
                }),
            };
        }

        let username = match &self.destination {
            HandoffDestination::Pairing { code, username } => {
                let username = username
                    .clone()
                    .or_else(|| cookies.username().map(str::to_string));
                let receipt = self
                    .pairing
                    .sync_extension(code, &cookies, username.as_deref())
                    .await
                    .map_err(|e| {
                        warn!(code = %code, error = %e, "Pairing sync failed");
                        e
                    })?;
                receipt.username.or(username)
            }
            HandoffDestination::Direct => {
                let receipt = self
                    .marketplace
                    .connect_with_cookies(&cookies)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Direct cookie connect failed");
                        e
                    })?;
                receipt.username
            }
        };

        self.handled.store(true, Ordering::Release);
        info!(cookies = cookies.len(), username = ?username, "Session handed off");
        Ok(HandoffOutcome::Delivered {
            cookies: cookies.len(),
            username,
        })
    }
}
