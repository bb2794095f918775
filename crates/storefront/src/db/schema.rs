//! DDL for the local cache.
//!
//! Prices are stored as decimal TEXT and timestamps as epoch milliseconds.

/// Bump whenever any statement below changes.
pub const SCHEMA_VERSION: i64 = 3;

pub const DROP_TABLES: &str = r"
DROP TABLE IF EXISTS order_items;
DROP TABLE IF EXISTS orders;
DROP TABLE IF EXISTS addresses;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS cart_items;
DROP TABLE IF EXISTS products;
DROP TABLE IF EXISTS session;
";

pub const CREATE_TABLES: &str = r"
CREATE TABLE products (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    price       TEXT NOT NULL,
    category    TEXT NOT NULL,
    subcategory TEXT,
    description TEXT,
    stock       INTEGER NOT NULL DEFAULT 0,
    image_url   TEXT,
    created_at  TEXT,
    updated_at  TEXT
);
CREATE INDEX idx_products_category ON products (category);

CREATE TABLE cart_items (
    product_id INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    price      TEXT NOT NULL,
    category   TEXT NOT NULL,
    image_url  TEXT,
    quantity   INTEGER NOT NULL CHECK (quantity >= 1),
    added_at   INTEGER NOT NULL
);

CREATE TABLE users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT,
    registered_at INTEGER NOT NULL,
    avatar_url    TEXT
);

CREATE TABLE orders (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,
    user_email   TEXT,
    user_name    TEXT,
    order_number TEXT NOT NULL UNIQUE,
    subtotal     TEXT NOT NULL,
    shipping     TEXT NOT NULL,
    total        TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    status       TEXT NOT NULL DEFAULT 'completed'
);
CREATE INDEX idx_orders_user ON orders (user_id, created_at);

CREATE TABLE order_items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id     INTEGER NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
    product_name TEXT NOT NULL,
    quantity     INTEGER NOT NULL,
    unit_price   TEXT NOT NULL,
    subtotal     TEXT NOT NULL
);
CREATE INDEX idx_order_items_order ON order_items (order_id);

CREATE TABLE addresses (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    alias     TEXT NOT NULL,
    street    TEXT NOT NULL,
    number    TEXT NOT NULL,
    apartment TEXT,
    commune   TEXT NOT NULL,
    region    TEXT NOT NULL DEFAULT 'Región Metropolitana',
    phone     TEXT NOT NULL
);

CREATE TABLE session (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";
