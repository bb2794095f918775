//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the SQLite row types in
//! [`crate::db`] and the backend wire types in [`crate::backend::types`].

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use address::{Address, NewAddress};
pub use cart::{CartItem, CartSummary};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderReceipt};
pub use product::{Product, ProductDraft};
pub use session::Session;
pub use user::{NewUser, User};
