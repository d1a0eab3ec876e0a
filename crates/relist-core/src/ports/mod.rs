//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IJobStore`] - Start backend jobs and read their progress
//! - [`IPairingService`] - Pairing codes and extension cookie sync
//! - [`IMarketplaceConnector`] - Marketplace sessions and one-shot publish
//! - [`IBrowserSurface`] - Cookie source for the session handoff

pub mod browser;
pub mod job_store;
pub mod marketplace;
pub mod pairing_service;

pub use browser::IBrowserSurface;
pub use job_store::{IJobStore, JobHandle, JobRequest};
pub use marketplace::{ConnectReceipt, ConnectionStatus, IMarketplaceConnector, PublishReceipt};
pub use pairing_service::{ExtensionSyncReceipt, IPairingService};
