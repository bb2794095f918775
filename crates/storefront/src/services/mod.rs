//! Business logic services for the storefront.
//!
//! Every service borrows the shared [`AppState`](crate::state::AppState) and
//! is cheap to construct per call.
//!
//! # Services
//!
//! - `auth` - Registration, remote/offline/identity-provider login, session
//! - `catalog` - Product browsing over the cache and backend sync
//! - `cart` - Local cart mutations and the live cart summary
//! - `checkout` - Simulated payment and atomic order placement
//! - `orders` - Order history and receipts for the signed-in user
//! - `addresses` - Shipping address book
//! - `admin` - Product CRUD and image uploads for admin accounts

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

pub use addresses::AddressService;
pub use admin::AdminService;
pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::{CheckoutService, PaymentDecision, authorize_payment};
pub use orders::OrderService;
