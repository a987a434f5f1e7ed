//! 数据库层 - 嵌入式 redb 存储

pub mod storage;

pub use storage::{Storage, StorageError, StorageResult, StorageStats};

use shared::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::database(err.to_string())
    }
}
