//! Relist API - HTTP client for the Relist backend
//!
//! Provides async access to:
//! - Long-running jobs (inventory fetch, Poshmark publish) and their progress
//! - Pairing codes and the anonymous extension cookie sync
//! - Marketplace connections and the synchronous eBay publish
//! - Keyring-backed credential storage
//!
//! ## Modules
//!
//! - [`auth`] - Bearer token storage in the system keyring
//! - [`client`] - Base HTTP client and error normalization
//! - [`jobs`] - Job start and progress endpoints
//! - [`pairing`] - Pairing code endpoints
//! - [`marketplace`] - Marketplace account endpoints
//! - [`provider`] - Port implementations used by the engine

pub mod auth;
pub mod client;
pub mod jobs;
pub mod marketplace;
pub mod pairing;
pub mod provider;

pub use client::ApiClient;
pub use provider::BackendProvider;
