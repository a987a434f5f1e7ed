//! 订单模块
//!
//! - [`validation`] - 输入校验
//! - [`service`] - 订单生命周期 (创建 / 编辑 / 确认 / 出餐)

pub mod service;
pub mod validation;

pub use service::OrderService;
