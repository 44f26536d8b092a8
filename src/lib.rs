//! paneldb - 多方言数据库适配层
//!
//! 为模式驱动的管理面板生成器提供统一的数据库访问接口，
//! 支持PostgreSQL、MySQL、SQL Server和MongoDB
//! 通过实时模式内省和方言正确的查询编译实现数据后端无关性

// 导出所有公共模块
pub mod adapter;
pub mod error;
pub mod ident;
pub mod registry;
pub mod schema;
pub mod typemap;
pub mod types;

// 重新导出常用类型和函数
pub use adapter::{create_adapter, CompiledQuery, DatabaseAdapter};
pub use error::{ErrorBuilder, PanelDbError, PanelDbResult};
pub use ident::{escape_identifier, placeholder, validate_identifier};
pub use registry::{resolve_database_type, AdapterRegistry};
pub use schema::{ColumnSchema, TableSchema};
pub use typemap::FieldType;
pub use types::*;

use rat_logger::handler::term::TermConfig;
use rat_logger::{info, LoggerBuilder};

/// 初始化paneldb库
///
/// 这个函数会初始化日志系统
pub fn init() {
    let _ = LoggerBuilder::new()
        .add_terminal_with_config(TermConfig::default())
        .init();
    info!("paneldb库已初始化");
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_info() {
        assert!(get_info().contains(NAME));
    }
}
