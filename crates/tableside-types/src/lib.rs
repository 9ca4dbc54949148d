//! Common types module for the tableside ordering system.
//!
//! This crate defines the data types shared by every other crate: the order
//! and menu model mirrored from the remote data service, the HTTP error
//! envelope, and the configuration-schema framework used by pluggable
//! gateway implementations.

/// API types for HTTP endpoints and error responses.
pub mod api;
/// Menu item types.
pub mod menu;
/// Order, order line and order request types.
pub mod order;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use menu::*;
pub use order::*;
pub use registry::*;
pub use validation::*;
