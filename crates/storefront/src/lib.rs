//! KeyLab storefront library.
//!
//! Offline-first catalog, cart, and checkout for the KeyLab keyboard shop.
//! The product catalog, cart, orders, users, and addresses live in a local
//! SQLite cache; the hosted backend (REST, auth, storage) is the source of
//! truth for products and accounts.
//!
//! Entry point is [`state::AppState`], which the services in [`services`]
//! borrow.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
