//! 适配器注册中心
//!
//! 按连接字符串缓存已建立的适配器，同一连接串复用同一个
//! 连接池。注册中心是显式构造的实例，不提供全局单例，
//! 多租户场景各自持有独立实例

use crate::adapter::{create_adapter, DatabaseAdapter};
use crate::error::PanelDbResult;
use crate::types::{AdapterConfig, DatabaseType};
use dashmap::DashMap;
use rat_logger::{info, warn};
use std::sync::Arc;

/// 从连接字符串推断数据库类型
///
/// 按 URL scheme 前缀识别；ADO 风格（含 server=）视为 SQL Server；
/// 无法识别时回退到 PostgreSQL 并记录警告
pub fn resolve_database_type(connection_string: &str) -> DatabaseType {
    let lowered = connection_string.to_lowercase();
    if lowered.starts_with("postgresql://") || lowered.starts_with("postgres://") {
        DatabaseType::PostgreSQL
    } else if lowered.starts_with("mysql://") || lowered.starts_with("mariadb://") {
        DatabaseType::MySQL
    } else if lowered.starts_with("mongodb://") || lowered.starts_with("mongodb+srv://") {
        DatabaseType::MongoDB
    } else if lowered.starts_with("mssql://")
        || lowered.starts_with("sqlserver://")
        || lowered.contains("server=")
    {
        DatabaseType::SqlServer
    } else {
        warn!("无法从连接字符串识别数据库类型，回退到 PostgreSQL");
        DatabaseType::PostgreSQL
    }
}

/// 适配器注册中心
pub struct AdapterRegistry {
    /// 连接字符串到适配器的映射（键为完全相同的连接串）
    adapters: DashMap<String, Arc<dyn DatabaseAdapter>>,
    config: AdapterConfig,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// 创建注册中心（默认连接池配置）
    pub fn new() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    /// 创建注册中心并指定连接池配置
    pub fn with_config(config: AdapterConfig) -> Self {
        Self {
            adapters: DashMap::new(),
            config,
        }
    }

    /// 获取或创建适配器
    ///
    /// 并发首次请求同一连接串时可能各自建池，先入缓存者胜出，
    /// 多建的池被关闭丢弃
    pub async fn get_adapter(
        &self,
        connection_string: &str,
    ) -> PanelDbResult<Arc<dyn DatabaseAdapter>> {
        if let Some(adapter) = self.adapters.get(connection_string) {
            return Ok(adapter.clone());
        }

        let db_type = resolve_database_type(connection_string);
        let adapter = create_adapter(db_type, connection_string, &self.config).await?;

        let cached = match self.adapters.entry(connection_string.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Some(entry.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(adapter.clone());
                None
            }
        };
        if let Some(existing) = cached {
            adapter.disconnect().await?;
            return Ok(existing);
        }

        info!("已缓存 {} 适配器，当前 {} 个", db_type.as_str(), self.adapters.len());
        Ok(adapter)
    }

    /// 关闭并移除指定连接的适配器，幂等
    pub async fn close_adapter(&self, connection_string: &str) -> PanelDbResult<()> {
        if let Some((_, adapter)) = self.adapters.remove(connection_string) {
            adapter.disconnect().await?;
        }
        Ok(())
    }

    /// 关闭全部适配器
    pub async fn close_all(&self) -> PanelDbResult<()> {
        let keys: Vec<String> = self.adapters.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.close_adapter(&key).await?;
        }
        Ok(())
    }

    /// 当前缓存的适配器数量
    pub fn cached_count(&self) -> usize {
        self.adapters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_postgres_schemes() {
        assert_eq!(
            resolve_database_type("postgresql://u:p@localhost/db"),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            resolve_database_type("postgres://u:p@localhost/db"),
            DatabaseType::PostgreSQL
        );
    }

    #[test]
    fn test_resolve_mysql_schemes() {
        assert_eq!(
            resolve_database_type("mysql://u:p@localhost/db"),
            DatabaseType::MySQL
        );
        assert_eq!(
            resolve_database_type("mariadb://u:p@localhost/db"),
            DatabaseType::MySQL
        );
    }

    #[test]
    fn test_resolve_mongodb_schemes() {
        assert_eq!(
            resolve_database_type("mongodb://localhost/db"),
            DatabaseType::MongoDB
        );
        assert_eq!(
            resolve_database_type("mongodb+srv://cluster.example.com/db"),
            DatabaseType::MongoDB
        );
    }

    #[test]
    fn test_resolve_sqlserver_forms() {
        assert_eq!(
            resolve_database_type("mssql://sa:p@localhost/db"),
            DatabaseType::SqlServer
        );
        assert_eq!(
            resolve_database_type("sqlserver://sa:p@localhost/db"),
            DatabaseType::SqlServer
        );
        // ADO 风格连接字符串
        assert_eq!(
            resolve_database_type("Server=tcp:localhost,1433;Database=db"),
            DatabaseType::SqlServer
        );
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_postgres() {
        assert_eq!(
            resolve_database_type("jdbc:oracle:thin:@localhost"),
            DatabaseType::PostgreSQL
        );
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = AdapterRegistry::new();
        assert_eq!(registry.cached_count(), 0);
    }

    #[test]
    fn test_close_unknown_adapter_is_noop() {
        let registry = AdapterRegistry::new();
        // 关闭未缓存的连接是幂等空操作
        tokio_test::block_on(registry.close_adapter("postgresql://u:p@localhost/db")).unwrap();
        assert_eq!(registry.cached_count(), 0);
    }

    #[test]
    fn test_close_all_on_empty_registry() {
        let registry = AdapterRegistry::new();
        tokio_test::block_on(registry.close_all()).unwrap();
        assert_eq!(registry.cached_count(), 0);
    }
}
