//! Shared types for the SnackBar POS
//!
//! Menu catalog, cart model, order/refund data model, the unified error
//! system and the pure reporting functions. Used by the server and by
//! anything that needs to build orders or reports without a database.

pub mod cart;
pub mod error;
pub mod models;
pub mod money;
pub mod report;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
