//! 启动 / 运行期错误
//!
//! HTTP 处理器使用 [`shared::AppError`]；这里只覆盖服务器自身的生命周期。

use thiserror::Error;

use crate::db::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 服务器生命周期的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
