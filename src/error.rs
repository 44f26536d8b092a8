//! 错误处理模块
//!
//! 提供统一的错误类型定义和中文错误信息

use thiserror::Error;

/// PanelDB 统一错误类型
#[derive(Error, Debug)]
pub enum PanelDbError {
    /// 数据库连接错误（连接池耗尽、网络或认证失败，可由调用方重试）
    #[error("数据库连接失败: {message}")]
    ConnectionError { message: String },

    /// 非法标识符错误（表名或列名不符合安全规则，绝不重试）
    #[error("非法标识符: {name}")]
    InvalidIdentifierError { name: String },

    /// 表不存在错误
    #[error("表或集合不存在: {table}")]
    TableNotFoundError { table: String },

    /// 数据验证错误（空的插入/更新载荷等）
    #[error("数据验证失败: {message}")]
    ValidationError { message: String },

    /// 查询执行错误（驱动层执行失败，保留原始错误信息）
    #[error("查询执行失败: {message}")]
    QueryExecutionError { message: String },

    /// 配置错误（连接字符串解析失败、不支持的操作等）
    #[error("配置错误: {message}")]
    ConfigError { message: String },

    /// JSON 序列化错误
    #[error("JSON 处理失败: {0}")]
    JsonError(#[from] serde_json::Error),

    /// 通用错误
    #[error("操作失败: {0}")]
    Other(#[from] anyhow::Error),
}

/// PanelDB 结果类型别名
pub type PanelDbResult<T> = Result<T, PanelDbError>;

/// 错误构建器 - 提供便捷的错误创建方法
pub struct ErrorBuilder;

impl ErrorBuilder {
    /// 创建连接错误
    pub fn connection_error(message: impl Into<String>) -> PanelDbError {
        PanelDbError::ConnectionError {
            message: message.into(),
        }
    }

    /// 创建非法标识符错误
    pub fn invalid_identifier(name: impl Into<String>) -> PanelDbError {
        PanelDbError::InvalidIdentifierError { name: name.into() }
    }

    /// 创建表不存在错误
    pub fn table_not_found(table: impl Into<String>) -> PanelDbError {
        PanelDbError::TableNotFoundError {
            table: table.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> PanelDbError {
        PanelDbError::ValidationError {
            message: message.into(),
        }
    }

    /// 创建查询执行错误
    pub fn query_error(message: impl Into<String>) -> PanelDbError {
        PanelDbError::QueryExecutionError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config_error(message: impl Into<String>) -> PanelDbError {
        PanelDbError::ConfigError {
            message: message.into(),
        }
    }
}

/// 便捷宏 - 快速创建错误
#[macro_export]
macro_rules! panel_error {
    (connection, $msg:expr) => {
        $crate::error::ErrorBuilder::connection_error($msg)
    };
    (identifier, $name:expr) => {
        $crate::error::ErrorBuilder::invalid_identifier($name)
    };
    (table_not_found, $table:expr) => {
        $crate::error::ErrorBuilder::table_not_found($table)
    };
    (validation, $msg:expr) => {
        $crate::error::ErrorBuilder::validation_error($msg)
    };
    (query, $msg:expr) => {
        $crate::error::ErrorBuilder::query_error($msg)
    };
    (config, $msg:expr) => {
        $crate::error::ErrorBuilder::config_error($msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ErrorBuilder::connection_error("测试连接失败");
        assert!(matches!(err, PanelDbError::ConnectionError { .. }));
        assert_eq!(err.to_string(), "数据库连接失败: 测试连接失败");
    }

    #[test]
    fn test_error_macro() {
        let err = panel_error!(identifier, "users; DROP TABLE");
        assert!(matches!(err, PanelDbError::InvalidIdentifierError { .. }));

        let err = panel_error!(table_not_found, "missing_table");
        assert_eq!(err.to_string(), "表或集合不存在: missing_table");
    }
}
