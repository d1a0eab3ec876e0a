//! Relist Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Job`, `PairingSession`, `CookieSet`, `Operation`
//! - **Port definitions** - Traits for adapters: `IJobStore`, `IPairingService`,
//!   `IMarketplaceConnector`, `IBrowserSurface`
//! - **State machines** - operation lifecycle and client-side pairing phases
//! - **Configuration** - YAML config with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement; the engine
//! crate drives them.

pub mod config;
pub mod domain;
pub mod ports;
