//! 退款模块

pub mod service;

pub use service::{RefundService, plan_refunds};
