//! KeyLab Core - Shared types library.
//!
//! This crate provides common types used across all KeyLab components:
//! - `storefront` - Local cache, backend clients, and storefront services
//! - `cli` - Command-line front end for browsing, cart, checkout, and admin
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, order
//!   numbers, statuses, and the cart totals arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
