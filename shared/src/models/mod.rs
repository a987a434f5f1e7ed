//! Data models
//!
//! Shared between the server and the browser client (via API).
//! Wire names are camelCase; IDs are snowflake `i64`; timestamps are Unix millis.

pub mod menu;
pub mod order;
pub mod refund;

// Re-exports
pub use menu::*;
pub use order::*;
pub use refund::*;
