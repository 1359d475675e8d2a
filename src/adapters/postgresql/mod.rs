//! PostgreSQL/PostGIS integration
//!
//! This module provides the pooled client, the positioned export connection
//! and the value conversions (including EWKB geometry decoding) used to read
//! a 3D city database.

pub mod client;
pub mod connection;
pub mod ewkb;
pub mod values;

pub use client::PostgreSQLClient;
pub use connection::PostgreSQLConnection;
