//! Unified error system
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! | Range | Domain |
//! |-------|--------|
//! | 0xxx  | General |
//! | 1xxx  | Authentication |
//! | 2xxx  | Permission |
//! | 4xxx  | Order |
//! | 5xxx  | Refund |
//! | 9xxx  | System |
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::OrderNotConfirmed)
//!     .with_detail("operation", "deliver");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(4004));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
