//! Core types for KeyLab.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod outcome;
pub mod password;
pub mod price;
pub mod status;

pub use email::{Email, EmailError, is_valid_email};
pub use id::*;
pub use order_number::{OrderNumber, OrderNumberError};
pub use outcome::Outcome;
pub use password::{MIN_PASSWORD_LENGTH, PasswordError, is_valid_password, validate_password};
pub use price::{CartTotals, FREE_SHIPPING_THRESHOLD, Price, SHIPPING_FLAT_FEE};
pub use status::OrderStatus;
