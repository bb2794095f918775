//! Command implementations, one module per area.
//!
//! Commands report through `tracing::info!` so output honours `RUST_LOG`
//! and reaches Sentry as breadcrumbs.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
