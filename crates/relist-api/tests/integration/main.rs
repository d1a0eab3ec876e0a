//! Integration tests for relist-api
//!
//! Uses wiremock to simulate the Relist backend and verifies end-to-end
//! behavior of job, pairing and marketplace calls, including how each
//! failure is normalized.

mod common;

mod test_jobs;
mod test_marketplace;
mod test_pairing;
