pub mod auth;
pub mod completions;
pub mod config;
pub mod connect;
pub mod inventory;
pub mod publish;
