//! 工具模块
//!
//! - [`logger`] - 日志初始化、`security_log!` 宏
//! - [`time`] - 业务时区日期工具

pub mod logger;
pub mod time;
